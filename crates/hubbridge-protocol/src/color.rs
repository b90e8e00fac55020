//! RGB colour values and the kelvin approximation used for BLE devices.

use serde::{Deserialize, Serialize};

/// Lowest colour temperature accepted by the encoder.
pub const KELVIN_MIN: u16 = 2000;

/// Highest colour temperature accepted by the encoder.
pub const KELVIN_MAX: u16 = 9000;

/// An RGB triple as carried in cloud and LAN `colorwc` payloads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Bytes in wire order.
    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Approximate the RGB colour of a black body at `kelvin`.
///
/// BLE firmware has no colour temperature primitive, so white tones are sent
/// as plain colours. The curve fit is deterministic.
pub fn kelvin_to_rgb(kelvin: u16) -> Rgb {
    let temp = f64::from(kelvin.clamp(KELVIN_MIN, KELVIN_MAX)) / 100.0;

    let red = if temp <= 66.0 {
        255.0
    } else {
        329.698_727_446 * (temp - 60.0).powf(-0.133_204_759_2)
    };

    let green = if temp <= 66.0 {
        99.470_802_586_1 * temp.ln() - 161.119_568_166_1
    } else {
        288.122_169_528_3 * (temp - 60.0).powf(-0.075_514_849_2)
    };

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.517_731_223_1 * (temp - 10.0).ln() - 305.044_792_730_7
    };

    Rgb {
        r: channel(red),
        g: channel(green),
        b: channel(blue),
    }
}

fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daylight_is_white() {
        assert_eq!(kelvin_to_rgb(6600), Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_warm_white_is_orange() {
        let rgb = kelvin_to_rgb(2000);
        assert_eq!(rgb.r, 255);
        assert!(rgb.g < rgb.r);
        assert!(rgb.b < rgb.g);
    }

    #[test]
    fn test_cool_white_is_blue_tinted() {
        let rgb = kelvin_to_rgb(9000);
        assert_eq!(rgb.b, 255);
        assert!(rgb.r < 255);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(kelvin_to_rgb(100), kelvin_to_rgb(KELVIN_MIN));
        assert_eq!(kelvin_to_rgb(u16::MAX), kelvin_to_rgb(KELVIN_MAX));
    }

    #[test]
    fn test_rgb_serde_shape() {
        let json = serde_json::to_value(Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(json, serde_json::json!({"r": 1, "g": 2, "b": 3}));
    }
}
