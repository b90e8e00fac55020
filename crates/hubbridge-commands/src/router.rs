//! Inbound frame router.
//!
//! Walks a list of base64 status frames, extracts each frame's function code
//! and calls the matching handler from a caller-owned [`HandlerTable`]. One
//! router serves every device category; only the table differs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use hubbridge_protocol::{decode_frame, FRAME_LEN, MARKER_STATUS};

/// Four lowercase hex characters identifying what a frame reports.
pub type FunctionCode = String;

/// A decoded status frame handed to handlers.
///
/// Always holds a complete 20-byte frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFrame {
    bytes: Vec<String>,
    raw: String,
}

impl StatusFrame {
    /// Decode a base64 frame. Returns `None` unless it is exactly 20 bytes.
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = decode_frame(raw);
        if bytes.len() != FRAME_LEN {
            return None;
        }
        Some(Self {
            bytes,
            raw: raw.to_string(),
        })
    }

    /// Function code from the second and third bytes.
    pub fn code(&self) -> FunctionCode {
        format!("{}{}", self.bytes[1], self.bytes[2])
    }

    /// Command-class marker, as lowercase hex.
    pub fn marker(&self) -> &str {
        &self.bytes[0]
    }

    /// Two-character lowercase hex bytes.
    pub fn bytes(&self) -> &[String] {
        &self.bytes
    }

    /// The frame as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Byte at `index` as a number.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes
            .get(index)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
    }

    /// Hex string of the whole frame.
    pub fn hex(&self) -> String {
        self.bytes.concat()
    }
}

type Handler<T> = Box<dyn Fn(&mut T, &StatusFrame) + Send + Sync>;

/// Function code to handler mapping for one device category.
///
/// `T` is the device state the handlers update.
pub struct HandlerTable<T> {
    markers: Vec<String>,
    handlers: HashMap<FunctionCode, Handler<T>>,
}

impl<T> HandlerTable<T> {
    /// Create an empty table accepting `0xAA` status frames.
    pub fn new() -> Self {
        Self {
            markers: vec![format!("{:02x}", MARKER_STATUS)],
            handlers: HashMap::new(),
        }
    }

    /// Also accept frames starting with `marker`.
    pub fn with_marker(mut self, marker: u8) -> Self {
        let marker = format!("{:02x}", marker);
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    /// Register a handler for a function code.
    pub fn on<F>(mut self, code: &str, handler: F) -> Self
    where
        F: Fn(&mut T, &StatusFrame) + Send + Sync + 'static,
    {
        self.insert(code, handler);
        self
    }

    /// Register a handler for a function code, replacing any previous one.
    pub fn insert<F>(&mut self, code: &str, handler: F)
    where
        F: Fn(&mut T, &StatusFrame) + Send + Sync + 'static,
    {
        self.handlers
            .insert(code.to_ascii_lowercase(), Box::new(handler));
    }

    pub fn contains(&self, code: &str) -> bool {
        self.handlers.contains_key(&code.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn accepts(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }
}

impl<T> Default for HandlerTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to a batch of frames.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteSummary {
    /// Frames passed to a table handler
    pub handled: usize,
    /// Frames passed to the default handler
    pub defaulted: usize,
    /// Frames discarded (wrong marker, malformed, truncated)
    pub skipped: usize,
}

/// Decode `frames` and dispatch each to `table`, or to `default` when the
/// function code has no handler.
///
/// Frames that are not exactly 20 bytes or lack a recognised status marker
/// are discarded silently.
pub fn process_frames<T, S, D>(
    ctx: &mut T,
    frames: &[S],
    table: &HandlerTable<T>,
    mut default: D,
) -> RouteSummary
where
    S: AsRef<str>,
    D: FnMut(&mut T, &StatusFrame),
{
    let mut summary = RouteSummary::default();

    for raw in frames {
        let raw = raw.as_ref();
        let Some(frame) = StatusFrame::parse(raw).filter(|f| table.accepts(f.marker())) else {
            tracing::trace!(frame = %raw, "Skipping non-status frame");
            summary.skipped += 1;
            continue;
        };

        let code = frame.code();
        match table.handlers.get(&code) {
            Some(handler) => {
                handler(ctx, &frame);
                summary.handled += 1;
            }
            None => {
                default(ctx, &frame);
                summary.defaulted += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubbridge_protocol::encode_frame;

    #[derive(Default)]
    struct Lamp {
        brightness: Option<u8>,
        unknown: Vec<String>,
    }

    fn table() -> HandlerTable<Lamp> {
        HandlerTable::new().on("0401", |lamp: &mut Lamp, frame: &StatusFrame| {
            lamp.brightness = frame.byte(3);
        })
    }

    #[test]
    fn test_handler_updates_context() {
        let mut lamp = Lamp::default();
        let frames = [encode_frame(&[0xaa, 0x04, 0x01, 0x40])];
        let summary = process_frames(&mut lamp, &frames, &table(), |_, _| {});

        assert_eq!(lamp.brightness, Some(0x40));
        assert_eq!(summary.handled, 1);
    }

    #[test]
    fn test_unknown_code_goes_to_default() {
        let mut lamp = Lamp::default();
        let frames = [encode_frame(&[0xaa, 0x11, 0x22])];
        let summary = process_frames(&mut lamp, &frames, &table(), |lamp, frame| {
            lamp.unknown.push(frame.code());
        });

        assert_eq!(lamp.unknown, vec!["1122"]);
        assert_eq!(summary.defaulted, 1);
    }

    #[test]
    fn test_truncated_and_garbage_frames_are_skipped() {
        let mut lamp = Lamp::default();
        // aa 04 01 40: a status header cut short after four bytes
        let frames = ["qgQBQA==", "qgU=", "%%%", ""];
        let summary = process_frames(&mut lamp, &frames, &table(), |_, _| {
            panic!("default must not run");
        });
        assert_eq!(summary.skipped, 4);
        assert_eq!(lamp.brightness, None);
    }

    #[test]
    fn test_extra_marker() {
        let mut lamp = Lamp::default();
        let frames = [encode_frame(&[0x3a, 0x04, 0x01, 0x10])];

        process_frames(&mut lamp, &frames, &table(), |_, _| {});
        assert_eq!(lamp.brightness, None);

        let table = table().with_marker(0x3a);
        process_frames(&mut lamp, &frames, &table, |_, _| {});
        assert_eq!(lamp.brightness, Some(0x10));
    }

    #[test]
    fn test_status_frame_accessors() {
        let raw = encode_frame(&[0xaa, 0x05, 0x01, 0xff]);
        let frame = StatusFrame::parse(&raw).unwrap();
        assert_eq!(frame.code(), "0501");
        assert_eq!(frame.marker(), "aa");
        assert_eq!(frame.bytes().len(), 20);
        assert_eq!(frame.raw(), raw);
        assert_eq!(frame.byte(3), Some(255));
        assert_eq!(frame.byte(40), None);
        assert!(frame.hex().starts_with("aa0501ff"));
    }

    #[test]
    fn test_parse_rejects_partial_frames() {
        assert!(StatusFrame::parse("qgUBAw==").is_none());
        assert!(StatusFrame::parse("qgU=").is_none());
        assert!(StatusFrame::parse("not base64").is_none());
    }

    #[test]
    fn test_codes_are_case_insensitive() {
        let table: HandlerTable<Lamp> = HandlerTable::new().on("AB01", |_, _| {});
        assert!(table.contains("ab01"));
        assert_eq!(table.len(), 1);
    }
}
