//! Bridge configuration.
//!
//! Defaults, JSON parsing and environment variable overrides for the
//! command core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::QueueConfig;
use crate::suppression::DebounceConfig;

/// Raw control interval values below this are seconds, the rest milliseconds.
pub const INTERVAL_MS_THRESHOLD: u64 = 500;

/// Accepted debounce delay range in milliseconds.
pub const DEBOUNCE_RANGE_MS: std::ops::RangeInclusive<u64> = 50..=2000;

/// Default values.
pub mod defaults {
    pub const BLE_CONTROL_INTERVAL: u64 = 5;
    pub const QUEUE_TIMEOUT_SECS: u64 = 10;
    pub const IGNORE_WINDOW_SECS: u64 = 60;
    pub const INBOUND_CAPACITY: usize = 256;
    pub const QUEUE_CAPACITY: usize = 1000;
}

/// Environment variable names.
pub mod env_vars {
    pub const BLE_CONTROL_INTERVAL: &str = "HUBBRIDGE_BLE_CONTROL_INTERVAL";
    pub const QUEUE_TIMEOUT_SECS: &str = "HUBBRIDGE_QUEUE_TIMEOUT_SECS";
    pub const IGNORE_WINDOW_SECS: &str = "HUBBRIDGE_IGNORE_WINDOW_SECS";
    pub const INBOUND_CAPACITY: &str = "HUBBRIDGE_INBOUND_CAPACITY";
    pub const LOG_JSON: &str = "HUBBRIDGE_LOG_JSON";
}

/// Convert a raw control interval setting into a duration.
///
/// Older configurations stored seconds, newer ones milliseconds; values
/// below [`INTERVAL_MS_THRESHOLD`] are taken as seconds.
pub fn control_interval(raw: u64) -> Duration {
    if raw < INTERVAL_MS_THRESHOLD {
        Duration::from_secs(raw)
    } else {
        Duration::from_millis(raw)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Command core configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Spacing between BLE writes (seconds below 500, else milliseconds)
    pub ble_control_interval: u64,
    /// Time budget of one BLE write
    pub queue_timeout_secs: u64,
    /// Echo suppression window after local commands
    pub ignore_window_secs: u64,
    /// Debounce delays for continuous controls
    pub debounce: DebounceConfig,
    /// Capacity of the inbound event channel
    pub inbound_capacity: usize,
    /// Maximum number of waiting BLE writes
    pub queue_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ble_control_interval: defaults::BLE_CONTROL_INTERVAL,
            queue_timeout_secs: defaults::QUEUE_TIMEOUT_SECS,
            ignore_window_secs: defaults::IGNORE_WINDOW_SECS,
            debounce: DebounceConfig::default(),
            inbound_capacity: defaults::INBOUND_CAPACITY,
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup. Unparseable values are
    /// ignored with a warning.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            match value.trim().parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    tracing::warn!("Ignoring invalid value {:?} for {}", value, name);
                    None
                }
            }
        }

        if let Some(v) = parse(
            env_vars::BLE_CONTROL_INTERVAL,
            lookup(env_vars::BLE_CONTROL_INTERVAL),
        ) {
            self.ble_control_interval = v;
        }
        if let Some(v) = parse(
            env_vars::QUEUE_TIMEOUT_SECS,
            lookup(env_vars::QUEUE_TIMEOUT_SECS),
        ) {
            self.queue_timeout_secs = v;
        }
        if let Some(v) = parse(
            env_vars::IGNORE_WINDOW_SECS,
            lookup(env_vars::IGNORE_WINDOW_SECS),
        ) {
            self.ignore_window_secs = v;
        }
        if let Some(v) = parse(env_vars::INBOUND_CAPACITY, lookup(env_vars::INBOUND_CAPACITY)) {
            self.inbound_capacity = v;
        }
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ble_control_interval == 0 {
            return Err(ConfigError::Invalid(
                "ble_control_interval must be greater than zero".to_string(),
            ));
        }
        if self.queue_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "queue_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.inbound_capacity == 0 || self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel capacities must be greater than zero".to_string(),
            ));
        }
        for (name, ms) in [
            ("brightness_ms", self.debounce.brightness_ms),
            ("hue_ms", self.debounce.hue_ms),
            ("color_temperature_ms", self.debounce.color_temperature_ms),
        ] {
            if !DEBOUNCE_RANGE_MS.contains(&ms) {
                return Err(ConfigError::Invalid(format!(
                    "debounce.{} = {} outside {:?}",
                    name, ms, DEBOUNCE_RANGE_MS
                )));
            }
        }
        Ok(())
    }

    /// Spacing between BLE writes.
    pub fn control_interval(&self) -> Duration {
        control_interval(self.ble_control_interval)
    }

    /// Echo suppression window.
    pub fn ignore_window(&self) -> Duration {
        Duration::from_secs(self.ignore_window_secs)
    }

    /// Configuration for the BLE command queue.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            interval: self.control_interval(),
            task_timeout: Duration::from_secs(self.queue_timeout_secs),
            capacity: self.queue_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_control_interval_units() {
        assert_eq!(control_interval(5), Duration::from_secs(5));
        assert_eq!(control_interval(499), Duration::from_secs(499));
        assert_eq!(control_interval(500), Duration::from_millis(500));
        assert_eq!(control_interval(1500), Duration::from_millis(1500));
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control_interval(), Duration::from_secs(5));
        assert_eq!(config.ignore_window(), Duration::from_secs(60));
        assert_eq!(config.queue_config().task_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_json_partial() {
        let config = BridgeConfig::from_json(r#"{"ble_control_interval": 2000}"#).unwrap();
        assert_eq!(config.control_interval(), Duration::from_secs(2));
        assert_eq!(config.queue_timeout_secs, 10);
        assert_eq!(config.debounce, DebounceConfig::default());
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            BridgeConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{"debounce": {"brightness_ms": 5}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{"ble_control_interval": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (env_vars::BLE_CONTROL_INTERVAL, "750"),
            (env_vars::IGNORE_WINDOW_SECS, "not-a-number"),
            (env_vars::INBOUND_CAPACITY, " 32 "),
        ]
        .into_iter()
        .collect();

        let config =
            BridgeConfig::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.control_interval(), Duration::from_millis(750));
        assert_eq!(config.ignore_window_secs, 60);
        assert_eq!(config.inbound_capacity, 32);
    }
}
