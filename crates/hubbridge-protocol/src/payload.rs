//! Transport-specific payload shapes produced by the encoder.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::codec::{build_frame, FRAME_LEN, MARKER_ACTION, PAYLOAD_LEN};

/// The three wire protocols, in dispatch priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Local-network JSON protocol
    Lan,
    /// Cloud publish/subscribe channel
    Cloud,
    /// Bluetooth Low Energy
    Ble,
}

impl TransportKind {
    /// All transports in the fixed attempt order.
    pub const PRIORITY: [TransportKind; 3] =
        [TransportKind::Lan, TransportKind::Cloud, TransportKind::Ble];

    pub fn type_name(&self) -> &'static str {
        match self {
            TransportKind::Lan => "lan",
            TransportKind::Cloud => "cloud",
            TransportKind::Ble => "ble",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// `{cmd, data}` payload shared by the cloud and LAN protocols.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonPayload {
    pub cmd: String,
    pub data: serde_json::Value,
}

impl JsonPayload {
    pub fn new(cmd: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            cmd: cmd.into(),
            data,
        }
    }
}

/// BLE payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlePayload {
    /// Single command byte plus data, wrapped in an action frame on write.
    Command { cmd: u8, data: Vec<u8> },
    /// Complete pre-built frame.
    Frame { bytes: Vec<u8> },
}

impl BlePayload {
    /// Raw 20-byte frame ready for the radio.
    pub fn to_frame(&self) -> [u8; FRAME_LEN] {
        match self {
            BlePayload::Command { cmd, data } => {
                let mut bytes = Vec::with_capacity(PAYLOAD_LEN);
                bytes.push(MARKER_ACTION);
                bytes.push(*cmd);
                bytes.extend_from_slice(data);
                build_frame(&bytes)
            }
            BlePayload::Frame { bytes } => {
                let mut frame = [0u8; FRAME_LEN];
                let len = bytes.len().min(FRAME_LEN);
                frame[..len].copy_from_slice(&bytes[..len]);
                frame
            }
        }
    }

    /// Base64 text form used at the dispatch boundary.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_frame())
    }
}

/// One payload bound to its transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "transport", content = "payload", rename_all = "lowercase")]
pub enum TransportPayload {
    Lan(JsonPayload),
    Cloud(JsonPayload),
    Ble(BlePayload),
}

impl TransportPayload {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportPayload::Lan(_) => TransportKind::Lan,
            TransportPayload::Cloud(_) => TransportKind::Cloud,
            TransportPayload::Ble(_) => TransportKind::Ble,
        }
    }
}

/// Encoder output: at most one payload per transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PayloadSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lan: Option<JsonPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<JsonPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ble: Option<BlePayload>,
}

impl PayloadSet {
    /// Payload variant for a transport, if the command has one.
    pub fn get(&self, kind: TransportKind) -> Option<TransportPayload> {
        match kind {
            TransportKind::Lan => self.lan.clone().map(TransportPayload::Lan),
            TransportKind::Cloud => self.cloud.clone().map(TransportPayload::Cloud),
            TransportKind::Ble => self.ble.clone().map(TransportPayload::Ble),
        }
    }

    pub fn has(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::Lan => self.lan.is_some(),
            TransportKind::Cloud => self.cloud.is_some(),
            TransportKind::Ble => self.ble.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lan.is_none() && self.cloud.is_none() && self.ble.is_none()
    }

    /// Transports with a payload, in priority order.
    pub fn transports(&self) -> Vec<TransportKind> {
        TransportKind::PRIORITY
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }
}
