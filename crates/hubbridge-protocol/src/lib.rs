//! Wire protocol layer for the HubBridge device bridge.
//!
//! Provides:
//! - The 20-byte BLE frame codec (checksum, base64/hex conversion)
//! - Abstract device commands
//! - The per-transport command encoder (cloud, LAN, BLE payloads)
//! - Colour temperature to RGB approximation for BLE-only devices

pub mod codec;
pub mod color;
pub mod command;
pub mod encoder;
pub mod payload;

// Re-exports
pub use codec::{
    base64_to_hex, build_frame, checksum, decode_frame, encode_frame, frame_bytes_from_base64,
    hex_to_base64, hex_to_two_items, is_valid_checksum, status_to_action_code, CodecError,
    FRAME_LEN, MARKER_ACTION, MARKER_QUERY, MARKER_STATUS, PAYLOAD_LEN,
};

pub use color::{kelvin_to_rgb, Rgb, KELVIN_MAX, KELVIN_MIN};

pub use command::{AbstractCommand, Power};

pub use encoder::{
    encode, EncodeError, BLE_CMD_BRIGHTNESS, BLE_CMD_COLOR, BLE_CMD_POWER, BLE_COLOR_MODE_MANUAL,
};

pub use payload::{BlePayload, JsonPayload, PayloadSet, TransportKind, TransportPayload};
