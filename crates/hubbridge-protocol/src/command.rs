//! Abstract device commands.
//!
//! Transport-agnostic description of a device operation and its value. The
//! serialized form is the loose `{"cmd": ..., "value": ...}` shape device
//! handlers build.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::encoder::EncodeError;

/// On/off value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn is_on(self) -> bool {
        matches!(self, Power::On)
    }

    /// Numeric form used by the cloud and LAN protocols.
    pub fn as_flag(self) -> u8 {
        u8::from(self.is_on())
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on {
            Power::On
        } else {
            Power::Off
        }
    }
}

/// A device operation requested by a device handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", content = "value")]
pub enum AbstractCommand {
    /// Generic on/off.
    #[serde(rename = "state")]
    State(Power),
    /// Brightness in percent (0-100).
    #[serde(rename = "brightness")]
    Brightness(u8),
    /// Solid colour.
    #[serde(rename = "color")]
    Color(Rgb),
    /// White colour temperature in kelvin.
    #[serde(rename = "colorTem")]
    ColorTemperature(u16),
    /// Pre-encoded base64 frame passed through untouched.
    #[serde(rename = "ptReal")]
    Raw(String),
    /// Fan / purifier speed level.
    #[serde(rename = "speed")]
    Speed(u8),
    /// Dual outlet switch; the value is the outlet bitmask.
    #[serde(rename = "stateDual")]
    DualOutletState(u8),
    /// Humidifier on/off.
    #[serde(rename = "stateHumi")]
    HumidifierState(Power),
    /// Purifier on/off.
    #[serde(rename = "statePuri")]
    PurifierState(Power),
    /// Heater on/off.
    #[serde(rename = "stateHeat")]
    HeaterState(Power),
}

impl AbstractCommand {
    /// Build a command from a command name and a JSON value.
    pub fn from_parts(cmd: &str, value: serde_json::Value) -> Result<Self, EncodeError> {
        serde_json::from_value(serde_json::json!({ "cmd": cmd, "value": value }))
            .map_err(|e| EncodeError::InvalidCommand(format!("{}: {}", cmd, e)))
    }

    /// The wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            AbstractCommand::State(_) => "state",
            AbstractCommand::Brightness(_) => "brightness",
            AbstractCommand::Color(_) => "color",
            AbstractCommand::ColorTemperature(_) => "colorTem",
            AbstractCommand::Raw(_) => "ptReal",
            AbstractCommand::Speed(_) => "speed",
            AbstractCommand::DualOutletState(_) => "stateDual",
            AbstractCommand::HumidifierState(_) => "stateHumi",
            AbstractCommand::PurifierState(_) => "statePuri",
            AbstractCommand::HeaterState(_) => "stateHeat",
        }
    }
}

impl std::fmt::Display for AbstractCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
