//! BLE frame codec.
//!
//! A frame is exactly 20 bytes: a command-class marker, 18 payload bytes
//! (zero padded) and an XOR checksum over the first 19 bytes. Frames travel
//! as base64 text everywhere except the final radio write.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Total frame length in bytes.
pub const FRAME_LEN: usize = 20;

/// Number of bytes covered by the checksum (marker + payload).
pub const PAYLOAD_LEN: usize = FRAME_LEN - 1;

/// Command-class marker of an action frame.
pub const MARKER_ACTION: u8 = 0x33;

/// Command-class marker of a status frame.
pub const MARKER_STATUS: u8 = 0xAA;

/// Command-class marker of a query-response frame on newer firmware.
pub const MARKER_QUERY: u8 = 0x3A;

/// Errors returned by the fallible conversion helpers.
///
/// [`decode_frame`] never returns these; it degrades to an empty result.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid frame length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// XOR of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Build the raw 20-byte frame for up to 19 meaningful bytes.
///
/// Longer input is a caller error: debug builds assert, release builds keep
/// the first 19 bytes.
pub fn build_frame(bytes: &[u8]) -> [u8; FRAME_LEN] {
    debug_assert!(
        bytes.len() <= PAYLOAD_LEN,
        "frame payload is {} bytes, at most {} allowed",
        bytes.len(),
        PAYLOAD_LEN
    );

    let mut frame = [0u8; FRAME_LEN];
    let len = bytes.len().min(PAYLOAD_LEN);
    frame[..len].copy_from_slice(&bytes[..len]);
    frame[PAYLOAD_LEN] = checksum(&frame[..PAYLOAD_LEN]);
    frame
}

/// Zero-pad `bytes` to 19, append the checksum and base64 encode the frame.
pub fn encode_frame(bytes: &[u8]) -> String {
    BASE64.encode(build_frame(bytes))
}

/// Decode a base64 frame into lowercase two-character hex strings.
///
/// Malformed input yields an empty vector. Frames come from firmware we do
/// not fully model, so decoding must never fail.
pub fn decode_frame(frame: &str) -> Vec<String> {
    match BASE64.decode(frame.trim()) {
        Ok(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        Err(_) => Vec::new(),
    }
}

/// Split a hex string into two-character items.
///
/// Odd-length input yields an empty vector.
pub fn hex_to_two_items(hex: &str) -> Vec<String> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Vec::new();
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).to_lowercase())
        .collect()
}

/// Convert base64 text to a lowercase hex string.
pub fn base64_to_hex(value: &str) -> Result<String, CodecError> {
    let bytes = BASE64
        .decode(value.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Convert a hex string to base64 text.
pub fn hex_to_base64(value: &str) -> Result<String, CodecError> {
    let bytes = hex::decode(value.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
    Ok(BASE64.encode(bytes))
}

/// Decode a base64 frame into its raw 20 bytes.
pub fn frame_bytes_from_base64(frame: &str) -> Result<[u8; FRAME_LEN], CodecError> {
    let bytes = BASE64
        .decode(frame.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
    <[u8; FRAME_LEN]>::try_from(bytes.as_slice()).map_err(|_| CodecError::InvalidLength {
        expected: FRAME_LEN,
        actual: bytes.len(),
    })
}

/// Check that a raw frame is 20 bytes long and carries a matching checksum.
pub fn is_valid_checksum(frame: &[u8]) -> bool {
    frame.len() == FRAME_LEN && checksum(&frame[..PAYLOAD_LEN]) == frame[PAYLOAD_LEN]
}

/// Reinterpret an observed status frame as the equivalent action frame.
///
/// The payload bytes are kept, the marker becomes `0x33` and the checksum is
/// recomputed. Returns `None` for anything that is not a 20-byte frame with a
/// status or query marker.
pub fn status_to_action_code(frame: &str) -> Option<String> {
    let bytes = frame_bytes_from_base64(frame).ok()?;
    if bytes[0] != MARKER_STATUS && bytes[0] != MARKER_QUERY {
        return None;
    }

    let mut action = [0u8; PAYLOAD_LEN];
    action[0] = MARKER_ACTION;
    action[1..].copy_from_slice(&bytes[1..PAYLOAD_LEN]);
    Some(encode_frame(&action))
}
