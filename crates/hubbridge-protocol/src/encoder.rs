//! Command encoder.
//!
//! Pure, table-driven mapping from an [`AbstractCommand`] to the payload
//! variants each transport understands. A command kind may have no variant
//! for a given transport (raw passthrough has no LAN form, the appliance
//! on/off variants are cloud only).

use serde_json::json;

use crate::codec::{encode_frame, frame_bytes_from_base64, MARKER_ACTION};
use crate::color::{kelvin_to_rgb, Rgb, KELVIN_MAX, KELVIN_MIN};
use crate::command::{AbstractCommand, Power};
use crate::payload::{BlePayload, JsonPayload, PayloadSet};

/// BLE command byte for power.
pub const BLE_CMD_POWER: u8 = 0x01;
/// BLE command byte for brightness.
pub const BLE_CMD_BRIGHTNESS: u8 = 0x04;
/// BLE command byte for colour.
pub const BLE_CMD_COLOR: u8 = 0x05;
/// Colour mode selector following [`BLE_CMD_COLOR`].
pub const BLE_COLOR_MODE_MANUAL: u8 = 0x02;

/// Encoder error types.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Encode a command into its transport payloads.
pub fn encode(command: &AbstractCommand) -> Result<PayloadSet, EncodeError> {
    let set = match command {
        AbstractCommand::State(power) => encode_state(*power),
        AbstractCommand::Brightness(percent) => encode_brightness(*percent)?,
        AbstractCommand::Color(rgb) => encode_color(*rgb, 0, *rgb),
        AbstractCommand::ColorTemperature(kelvin) => {
            if !(KELVIN_MIN..=KELVIN_MAX).contains(kelvin) {
                return Err(EncodeError::InvalidCommand(format!(
                    "colour temperature {}K outside {}K-{}K",
                    kelvin, KELVIN_MIN, KELVIN_MAX
                )));
            }
            let approx = kelvin_to_rgb(*kelvin);
            encode_color(approx, *kelvin, approx)
        }
        AbstractCommand::Raw(frame) => encode_raw(frame)?,
        AbstractCommand::Speed(level) => {
            let frame = encode_frame(&[MARKER_ACTION, 0x05, 0x01, *level]);
            encode_raw(&frame)?
        }
        AbstractCommand::DualOutletState(mask) => cloud_only("turn", json!({ "val": mask })),
        AbstractCommand::HumidifierState(power) | AbstractCommand::PurifierState(power) => {
            cloud_only("turn", json!({ "val": power.as_flag() }))
        }
        AbstractCommand::HeaterState(power) => {
            let frame = encode_frame(&[MARKER_ACTION, BLE_CMD_POWER, power.as_flag()]);
            cloud_only("ptReal", json!({ "command": [frame] }))
        }
    };
    Ok(set)
}

fn encode_state(power: Power) -> PayloadSet {
    PayloadSet {
        cloud: Some(JsonPayload::new("turn", json!({ "val": power.as_flag() }))),
        ble: Some(BlePayload::Command {
            cmd: BLE_CMD_POWER,
            data: vec![power.as_flag()],
        }),
        lan: Some(JsonPayload::new("turn", json!({ "value": power.as_flag() }))),
    }
}

fn encode_brightness(percent: u8) -> Result<PayloadSet, EncodeError> {
    if percent > 100 {
        return Err(EncodeError::InvalidCommand(format!(
            "brightness {}% above 100%",
            percent
        )));
    }
    let percent = u32::from(percent);

    // Cloud tops out at 254, BLE at 255.
    let cloud_value = (percent * 254 + 50) / 100;
    let ble_value = (percent * 255 / 100) as u8;

    Ok(PayloadSet {
        cloud: Some(JsonPayload::new("brightness", json!({ "val": cloud_value }))),
        ble: Some(BlePayload::Command {
            cmd: BLE_CMD_BRIGHTNESS,
            data: vec![ble_value],
        }),
        lan: Some(JsonPayload::new("brightness", json!({ "value": percent }))),
    })
}

fn encode_color(color: Rgb, kelvin: u16, ble_color: Rgb) -> PayloadSet {
    let data = json!({ "color": color, "colorTemInKelvin": kelvin });
    let [r, g, b] = ble_color.to_bytes();
    PayloadSet {
        cloud: Some(JsonPayload::new("colorwc", data.clone())),
        ble: Some(BlePayload::Command {
            cmd: BLE_CMD_COLOR,
            data: vec![BLE_COLOR_MODE_MANUAL, r, g, b],
        }),
        lan: Some(JsonPayload::new("colorwc", data)),
    }
}

fn encode_raw(frame: &str) -> Result<PayloadSet, EncodeError> {
    let bytes = frame_bytes_from_base64(frame)
        .map_err(|e| EncodeError::InvalidCommand(format!("raw frame {:?}: {}", frame, e)))?;
    Ok(PayloadSet {
        cloud: Some(JsonPayload::new("ptReal", json!({ "command": [frame] }))),
        ble: Some(BlePayload::Frame {
            bytes: bytes.to_vec(),
        }),
        lan: None,
    })
}

fn cloud_only(cmd: &str, data: serde_json::Value) -> PayloadSet {
    PayloadSet {
        cloud: Some(JsonPayload::new(cmd, data)),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::TransportKind;

    #[test]
    fn test_state_on() {
        let set = encode(&AbstractCommand::State(Power::On)).unwrap();
        let cloud = set.cloud.unwrap();
        assert_eq!(cloud.cmd, "turn");
        assert_eq!(cloud.data, json!({"val": 1}));
        let lan = set.lan.unwrap();
        assert_eq!(lan.data, json!({"value": 1}));
        assert_eq!(
            set.ble.unwrap(),
            BlePayload::Command {
                cmd: 0x01,
                data: vec![0x01]
            }
        );
    }

    #[test]
    fn test_state_off() {
        let set = encode(&AbstractCommand::State(Power::Off)).unwrap();
        assert_eq!(set.cloud.unwrap().data, json!({"val": 0}));
        assert_eq!(
            set.ble.unwrap(),
            BlePayload::Command {
                cmd: 0x01,
                data: vec![0x00]
            }
        );
    }

    #[test]
    fn test_brightness_scaling() {
        let full = encode(&AbstractCommand::Brightness(100)).unwrap();
        assert_eq!(full.cloud.unwrap().data, json!({"val": 254}));
        assert_eq!(
            full.ble.unwrap(),
            BlePayload::Command {
                cmd: 0x04,
                data: vec![0xff]
            }
        );
        assert_eq!(full.lan.unwrap().data, json!({"value": 100}));

        let half = encode(&AbstractCommand::Brightness(50)).unwrap();
        assert_eq!(half.cloud.unwrap().data, json!({"val": 127}));
        assert_eq!(
            half.ble.unwrap(),
            BlePayload::Command {
                cmd: 0x04,
                data: vec![127]
            }
        );
    }

    #[test]
    fn test_brightness_out_of_range() {
        assert!(matches!(
            encode(&AbstractCommand::Brightness(101)),
            Err(EncodeError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_color() {
        let set = encode(&AbstractCommand::Color(Rgb::new(255, 0, 16))).unwrap();
        let expected = json!({"color": {"r": 255, "g": 0, "b": 16}, "colorTemInKelvin": 0});
        assert_eq!(set.cloud.as_ref().unwrap().cmd, "colorwc");
        assert_eq!(set.cloud.unwrap().data, expected);
        assert_eq!(set.lan.unwrap().data, expected);
        assert_eq!(
            set.ble.unwrap(),
            BlePayload::Command {
                cmd: 0x05,
                data: vec![0x02, 255, 0, 16]
            }
        );
    }

    #[test]
    fn test_color_temperature_carries_kelvin_and_approximation() {
        let set = encode(&AbstractCommand::ColorTemperature(6600)).unwrap();
        let cloud = set.cloud.unwrap();
        assert_eq!(cloud.data["colorTemInKelvin"], 6600);
        assert_eq!(cloud.data["color"], json!({"r": 255, "g": 255, "b": 255}));
        assert_eq!(
            set.ble.unwrap(),
            BlePayload::Command {
                cmd: 0x05,
                data: vec![0x02, 255, 255, 255]
            }
        );
    }

    #[test]
    fn test_color_temperature_out_of_range() {
        assert!(encode(&AbstractCommand::ColorTemperature(1000)).is_err());
        assert!(encode(&AbstractCommand::ColorTemperature(12000)).is_err());
    }

    #[test]
    fn test_raw_has_no_lan_form() {
        let frame = encode_frame(&[0x33, 0x05, 0x04, 0x01]);
        let set = encode(&AbstractCommand::Raw(frame.clone())).unwrap();
        assert!(set.lan.is_none());
        assert_eq!(set.cloud.unwrap().data, json!({"command": [frame.clone()]}));
        assert_eq!(set.ble.unwrap().to_base64(), frame);
    }

    #[test]
    fn test_raw_rejects_invalid_frame() {
        assert!(matches!(
            encode(&AbstractCommand::Raw("MwEB".to_string())),
            Err(EncodeError::InvalidCommand(_))
        ));
        assert!(encode(&AbstractCommand::Raw("%%%".to_string())).is_err());
    }

    #[test]
    fn test_speed_is_raw_frame() {
        let set = encode(&AbstractCommand::Speed(3)).unwrap();
        let expected = encode_frame(&[0x33, 0x05, 0x01, 0x03]);
        assert_eq!(set.cloud.unwrap().data, json!({"command": [expected.clone()]}));
        assert_eq!(set.ble.unwrap().to_base64(), expected);
    }

    #[test]
    fn test_appliance_variants_are_cloud_only() {
        for command in [
            AbstractCommand::DualOutletState(2),
            AbstractCommand::HumidifierState(Power::On),
            AbstractCommand::PurifierState(Power::Off),
            AbstractCommand::HeaterState(Power::On),
        ] {
            let set = encode(&command).unwrap();
            assert_eq!(set.transports(), vec![TransportKind::Cloud], "{}", command);
        }

        let dual = encode(&AbstractCommand::DualOutletState(2)).unwrap();
        assert_eq!(dual.cloud.unwrap().data, json!({"val": 2}));

        let heater = encode(&AbstractCommand::HeaterState(Power::On)).unwrap();
        assert_eq!(
            heater.cloud.unwrap().data,
            json!({"command": ["MwEBAAAAAAAAAAAAAAAAAAAAADM="]})
        );
    }

    #[test]
    fn test_encoder_is_deterministic() {
        let command = AbstractCommand::ColorTemperature(4200);
        assert_eq!(encode(&command).unwrap(), encode(&command).unwrap());
    }
}
