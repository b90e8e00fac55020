//! Accessory identity and per-transport capabilities.
//!
//! Capabilities are resolved once during device initialization by the
//! caller and only read here.

use serde::{Deserialize, Serialize};

use hubbridge_protocol::TransportKind;

/// Device identifier.
pub type DeviceId = String;

/// State of one transport link for an accessory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// The device cannot use this transport at all.
    #[default]
    Unsupported,
    /// Physically capable, but disabled or disconnected.
    Inactive,
    /// Capable, enabled and connected.
    Active,
}

impl LinkState {
    /// Resolve a `has` / `use` flag pair.
    pub fn from_flags(has: bool, enabled: bool) -> Self {
        match (has, enabled) {
            (false, _) => LinkState::Unsupported,
            (true, false) => LinkState::Inactive,
            (true, true) => LinkState::Active,
        }
    }

    /// Physically capable ("has").
    pub fn is_supported(&self) -> bool {
        !matches!(self, LinkState::Unsupported)
    }

    /// Currently usable ("use").
    pub fn is_active(&self) -> bool {
        matches!(self, LinkState::Active)
    }
}

/// Transport capabilities of one accessory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub lan: LinkState,
    pub cloud: LinkState,
    pub ble: LinkState,
}

impl Capabilities {
    /// Build from the `has`/`use` flag vocabulary.
    pub fn from_flags(
        (has_lan, use_lan): (bool, bool),
        (has_cloud, use_cloud): (bool, bool),
        (has_ble, use_ble): (bool, bool),
    ) -> Self {
        Self {
            lan: LinkState::from_flags(has_lan, use_lan),
            cloud: LinkState::from_flags(has_cloud, use_cloud),
            ble: LinkState::from_flags(has_ble, use_ble),
        }
    }

    /// Link state for a transport.
    pub fn link(&self, kind: TransportKind) -> LinkState {
        match kind {
            TransportKind::Lan => self.lan,
            TransportKind::Cloud => self.cloud,
            TransportKind::Ble => self.ble,
        }
    }

    /// Mark a supported link as connected or disconnected.
    ///
    /// Unsupported links stay unsupported.
    pub fn set_active(&mut self, kind: TransportKind, active: bool) {
        let link = match kind {
            TransportKind::Lan => &mut self.lan,
            TransportKind::Cloud => &mut self.cloud,
            TransportKind::Ble => &mut self.ble,
        };
        if link.is_supported() {
            *link = LinkState::from_flags(true, active);
        }
    }

    pub fn has_lan(&self) -> bool {
        self.lan.is_supported()
    }

    pub fn use_lan(&self) -> bool {
        self.lan.is_active()
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_supported()
    }

    pub fn use_cloud(&self) -> bool {
        self.cloud.is_active()
    }

    pub fn has_ble(&self) -> bool {
        self.ble.is_supported()
    }

    pub fn use_ble(&self) -> bool {
        self.ble.is_active()
    }
}

/// An accessory as seen by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Accessory {
    /// Device ID (vendor identifier)
    pub device_id: DeviceId,
    /// Display name used in logs
    pub name: String,
    /// Vendor model code (e.g. "H6199")
    pub model: Option<String>,
    /// Transport capabilities
    pub capabilities: Capabilities,
}

impl Accessory {
    /// Create a new accessory with no usable transports.
    pub fn new(device_id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            model: None,
            capabilities: Capabilities::default(),
        }
    }

    /// Set the model code.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}
