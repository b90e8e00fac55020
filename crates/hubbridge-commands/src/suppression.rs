//! Echo suppression and debouncing.
//!
//! Two short-lived token mechanisms reconcile locally issued changes with
//! externally reported state:
//! - [`IgnoreWindows`]: after a local command on a slow-to-confirm device,
//!   external updates for that accessory are discarded for a fixed window so
//!   a stale cloud echo cannot overwrite the value just set.
//! - [`Debouncer`]: continuous controls (brightness, hue, colour temperature)
//!   only transmit the newest request once its delay has elapsed.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::accessory::DeviceId;

/// Default length of an ignore window.
pub const DEFAULT_IGNORE_WINDOW: Duration = Duration::from_secs(60);

/// Opaque token identifying one update request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateToken(String);

impl UpdateToken {
    /// Generate a fresh token.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UpdateToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UpdateToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-accessory ignore windows.
pub struct IgnoreWindows {
    window: Duration,
    entries: DashMap<DeviceId, (UpdateToken, Instant)>,
}

impl IgnoreWindows {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: DashMap::new(),
        }
    }

    /// Open (or restart) the window for an accessory.
    pub fn begin(&self, device_id: &str) -> UpdateToken {
        let token = UpdateToken::new();
        let expires_at = Instant::now() + self.window;
        self.entries
            .insert(device_id.to_string(), (token.clone(), expires_at));
        tracing::debug!(device = %device_id, window = ?self.window, "Ignoring external updates");
        token
    }

    /// Whether external updates for the accessory should be discarded now.
    pub fn is_ignoring(&self, device_id: &str) -> bool {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(device_id) {
            if now < entry.1 {
                return true;
            }
        }
        self.entries
            .remove_if(device_id, |_, (_, expires_at)| *expires_at <= now);
        false
    }

    /// Close the window early, but only if `token` is still the current one.
    pub fn end(&self, device_id: &str, token: &UpdateToken) -> bool {
        self.entries
            .remove_if(device_id, |_, (current, _)| current == token)
            .is_some()
    }

    /// The configured window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for IgnoreWindows {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_WINDOW)
    }
}

/// Continuous controls subject to debouncing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Brightness,
    Hue,
    ColorTemperature,
}

/// Debounce delays in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebounceConfig {
    pub brightness_ms: u64,
    pub hue_ms: u64,
    pub color_temperature_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            brightness_ms: 400,
            hue_ms: 300,
            color_temperature_ms: 300,
        }
    }
}

impl DebounceConfig {
    /// Delay for a control.
    pub fn delay(&self, control: Control) -> Duration {
        let ms = match control {
            Control::Brightness => self.brightness_ms,
            Control::Hue => self.hue_ms,
            Control::ColorTemperature => self.color_temperature_ms,
        };
        Duration::from_millis(ms)
    }
}

type DebounceKey = (DeviceId, Control);

/// Keeps only the newest request per accessory and control.
pub struct Debouncer {
    config: DebounceConfig,
    pending: DashMap<DebounceKey, Vec<UpdateToken>>,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            pending: DashMap::new(),
        }
    }

    /// Register a request and wait out the control's delay.
    ///
    /// Returns `true` only when no newer request for the same accessory and
    /// control is still pending; superseded requests get `false` and must
    /// not transmit. A request dropped while waiting withdraws its token, so
    /// the newest surviving request still goes out.
    pub async fn settle(&self, device_id: &str, control: Control) -> bool {
        let pending = PendingRequest::register(&self.pending, (device_id.to_string(), control));

        tokio::time::sleep(self.config.delay(control)).await;

        let won = pending.is_newest();
        if !won {
            tracing::trace!(device = %device_id, ?control, "Superseded update dropped");
        }
        won
    }

    /// Run `send` only if this request survives its debounce delay.
    pub async fn debounce<F, T>(&self, device_id: &str, control: Control, send: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if self.settle(device_id, control).await {
            Some(send.await)
        } else {
            None
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}

/// A waiting debounce request; its token is withdrawn on drop.
struct PendingRequest<'a> {
    pending: &'a DashMap<DebounceKey, Vec<UpdateToken>>,
    key: DebounceKey,
    token: UpdateToken,
}

impl<'a> PendingRequest<'a> {
    fn register(pending: &'a DashMap<DebounceKey, Vec<UpdateToken>>, key: DebounceKey) -> Self {
        let token = UpdateToken::new();
        pending.entry(key.clone()).or_default().push(token.clone());
        Self {
            pending,
            key,
            token,
        }
    }

    fn is_newest(&self) -> bool {
        self.pending
            .get(&self.key)
            .is_some_and(|tokens| tokens.last() == Some(&self.token))
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if let Some(mut tokens) = self.pending.get_mut(&self.key) {
            tokens.retain(|t| *t != self.token);
        }
        self.pending.remove_if(&self.key, |_, tokens| tokens.is_empty());
    }
}
