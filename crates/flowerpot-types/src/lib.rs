//! Platform-agnostic types for the smart flowerpot BLE sensor.
//!
//! This crate holds everything about the flowerpot that does not need a
//! Bluetooth stack: the notification wire format, the soil calibration, the
//! light command encoding and the UUID constants. `flowerpot-core` builds the
//! BLE layer on top of it.
//!
//! # Features
//!
//! - Decoding the 12-byte readings notification into a [`SensorReading`]
//! - Two-point soil calibration ([`SoilCalibration`]) for the fertility percentage
//! - Encoding the 2-byte light command ([`encode_light`])
//! - UUID constants for BLE services and characteristics
//!
//! # Example
//!
//! ```
//! use flowerpot_types::{SensorReading, encode_light};
//!
//! let payload = [
//!     0x00, 0x00, 0xB0, 0x41, // 22.0 °C
//!     0x00, 0x00, 0x70, 0x42, // 60.0 %
//!     0x96, 0x00,             // 150 lux
//!     0xD0, 0x07,             // soil raw 2000
//! ];
//! let reading = SensorReading::from_bytes(&payload).unwrap();
//! assert_eq!(reading.fertility, 68);
//!
//! assert_eq!(encode_light(true), [0xFF, 0x00]);
//! ```

pub mod command;
pub mod error;
pub mod types;
pub mod uuid;

pub use command::{LightState, encode_light};
pub use error::{ParseError, ParseResult};
pub use types::{
    DEFAULT_SOIL_IN_AIR, DEFAULT_SOIL_IN_WATER, PAYLOAD_LEN, RawPayload, SensorReading,
    SoilCalibration, round_half_up,
};
pub use uuid as uuids;

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(temperature: f32, humidity: f32, luminosity: i16, soil_raw: i16) -> [u8; 12] {
        RawPayload {
            temperature,
            humidity,
            luminosity,
            soil_raw,
        }
        .to_bytes()
    }

    // --- SensorReading decoding tests ---

    #[test]
    fn test_decode_reference_payload() {
        let bytes: [u8; 12] = [
            0x00, 0x00, 0xB0, 0x41, // temperature = 22.0
            0x00, 0x00, 0x70, 0x42, // humidity = 60.0
            0x96, 0x00, // luminosity = 150
            0xD0, 0x07, // soil raw = 2000
        ];

        let reading = SensorReading::from_bytes(&bytes).unwrap();

        assert_eq!(reading.temperature, 22);
        assert_eq!(reading.humidity, 60);
        assert_eq!(reading.luminosity, 150);
        assert_eq!(reading.soil_raw, 2000);
        assert_eq!(reading.fertility, 68);
        assert_eq!(reading.captured_at, None);
    }

    #[test]
    fn test_decode_insufficient_bytes() {
        let bytes = [0u8; 11];

        let err = SensorReading::from_bytes(&bytes).unwrap_err();

        assert_eq!(
            err,
            ParseError::InvalidPayload {
                expected: 12,
                actual: 11
            }
        );
        assert!(err.to_string().contains("requires 12 bytes, got 11"));
    }

    #[test]
    fn test_decode_empty_payload() {
        let result = SensorReading::from_bytes(&[]);
        assert!(matches!(
            result,
            Err(ParseError::InvalidPayload { actual: 0, .. })
        ));
    }

    #[test]
    fn test_decode_extra_bytes_ignored() {
        let mut bytes = payload(22.0, 60.0, 150, 2000).to_vec();
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let reading = SensorReading::from_bytes(&bytes).unwrap();
        assert_eq!(reading.temperature, 22);
        assert_eq!(reading.soil_raw, 2000);
    }

    #[test]
    fn test_decode_all_zeros() {
        let reading = SensorReading::from_bytes(&[0u8; 12]).unwrap();

        assert_eq!(reading.temperature, 0);
        assert_eq!(reading.humidity, 0);
        assert_eq!(reading.luminosity, 0);
        // A zero count is far wetter than the in-water reference
        assert_eq!(reading.fertility, 100);
    }

    #[test]
    fn test_decode_rounds_half_up() {
        let reading = SensorReading::from_bytes(&payload(22.5, 60.4, 0, 3400)).unwrap();
        assert_eq!(reading.temperature, 23);
        assert_eq!(reading.humidity, 60);

        let reading = SensorReading::from_bytes(&payload(21.49, 60.5, 0, 3400)).unwrap();
        assert_eq!(reading.temperature, 21);
        assert_eq!(reading.humidity, 61);
    }

    #[test]
    fn test_decode_negative_temperature_rounding() {
        let reading = SensorReading::from_bytes(&payload(-2.5, 50.0, 0, 3400)).unwrap();
        assert_eq!(reading.temperature, -2);

        let reading = SensorReading::from_bytes(&payload(-2.6, 50.0, 0, 3400)).unwrap();
        assert_eq!(reading.temperature, -3);
    }

    #[test]
    fn test_decode_negative_luminosity_passthrough() {
        let reading = SensorReading::from_bytes(&payload(20.0, 50.0, -1, 2000)).unwrap();
        assert_eq!(reading.luminosity, -1);
    }

    #[test]
    fn test_decode_nan_temperature() {
        let result = SensorReading::from_bytes(&payload(f32::NAN, 60.0, 150, 2000));
        assert_eq!(
            result,
            Err(ParseError::NonFiniteValue {
                field: "temperature"
            })
        );
    }

    #[test]
    fn test_decode_infinite_humidity() {
        let result = SensorReading::from_bytes(&payload(22.0, f32::INFINITY, 150, 2000));
        assert_eq!(
            result,
            Err(ParseError::NonFiniteValue { field: "humidity" })
        );
    }

    #[test]
    fn test_decode_with_custom_calibration() {
        let cal = SoilCalibration::new(3000, 1000).unwrap();
        let bytes = payload(22.0, 60.0, 150, 2000);

        let reading = SensorReading::from_bytes_with_calibration(&bytes, &cal).unwrap();
        assert_eq!(reading.fertility, 50);
    }

    #[test]
    fn test_with_captured_at() {
        let now = time::OffsetDateTime::UNIX_EPOCH;
        let reading = SensorReading::default().with_captured_at(now);
        assert_eq!(reading.captured_at, Some(now));
    }

    // --- RawPayload tests ---

    #[test]
    fn test_raw_payload_to_bytes_layout() {
        let bytes = payload(22.0, 60.0, 150, 2000);
        assert_eq!(
            bytes,
            [
                0x00, 0x00, 0xB0, 0x41, 0x00, 0x00, 0x70, 0x42, 0x96, 0x00, 0xD0, 0x07
            ]
        );
    }

    #[test]
    fn test_raw_payload_keeps_unrounded_values() {
        let raw = RawPayload::from_bytes(&payload(22.25, 59.75, 10, 20)).unwrap();
        assert_eq!(raw.temperature, 22.25);
        assert_eq!(raw.humidity, 59.75);
    }

    // --- SoilCalibration tests ---

    #[test]
    fn test_fertility_dry_bound() {
        let cal = SoilCalibration::default();
        assert_eq!(cal.fertility(3400), 0);
        assert_eq!(cal.fertility(4095), 0);
        assert_eq!(cal.fertility(i16::MAX), 0);
    }

    #[test]
    fn test_fertility_wet_bound() {
        let cal = SoilCalibration::default();
        assert_eq!(cal.fertility(1350), 100);
        assert_eq!(cal.fertility(0), 100);
        assert_eq!(cal.fertility(i16::MIN), 100);
    }

    #[test]
    fn test_fertility_midpoint() {
        let cal = SoilCalibration::default();
        assert_eq!(cal.fertility(2375), 50);
    }

    #[test]
    fn test_fertility_rounds_half_up() {
        let cal = SoilCalibration::new(200, 0).unwrap();
        // 100 * 1 / 200 = 0.5
        assert_eq!(cal.fertility(199), 1);
        // 100 * 199 / 200 = 99.5
        assert_eq!(cal.fertility(1), 100);
    }

    #[test]
    fn test_calibration_rejects_unordered_points() {
        assert_eq!(
            SoilCalibration::new(1350, 3400),
            Err(ParseError::InvalidCalibration {
                in_air: 1350,
                in_water: 3400
            })
        );
        assert!(SoilCalibration::new(2000, 2000).is_err());
    }

    #[test]
    fn test_calibration_default() {
        let cal = SoilCalibration::default();
        assert_eq!(cal.in_air, DEFAULT_SOIL_IN_AIR);
        assert_eq!(cal.in_water, DEFAULT_SOIL_IN_WATER);
        assert!(cal.validate().is_ok());
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(0.5), 1.0);
        assert_eq!(round_half_up(1.49), 1.0);
        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(-1.5), -1.0);
        assert_eq!(round_half_up(-1.51), -2.0);
    }

    // --- Serialization tests ---

    #[cfg(feature = "serde")]
    #[test]
    fn test_sensor_reading_serialization() {
        let reading = SensorReading::from_bytes(&payload(22.0, 60.0, 150, 2000)).unwrap();

        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"temperature\":22"));
        assert!(json.contains("\"fertility\":68"));
        assert!(!json.contains("captured_at"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_sensor_reading_deserialization() {
        let json = r#"{"temperature":22,"humidity":60,"luminosity":150,"soil_raw":2000,"fertility":68}"#;

        let reading: SensorReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.fertility, 68);
        assert_eq!(reading.captured_at, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_calibration_deserialization() {
        let cal: SoilCalibration = serde_json::from_str(r#"{"in_air":3000,"in_water":1200}"#).unwrap();
        assert_eq!(cal, SoilCalibration::new(3000, 1200).unwrap());
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::InvalidCalibration {
            in_air: 10,
            in_water: 20,
        };
        assert!(err.to_string().contains("in-air value 10"));
    }
}
