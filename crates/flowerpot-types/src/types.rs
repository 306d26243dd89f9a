//! Core types for flowerpot sensor data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Exact number of bytes in a sensor notification.
pub const PAYLOAD_LEN: usize = 12;

/// Default raw soil count with the probe held in air (bone dry).
pub const DEFAULT_SOIL_IN_AIR: i16 = 3400;

/// Default raw soil count with the probe submerged in water.
pub const DEFAULT_SOIL_IN_WATER: i16 = 1350;

/// Round to the nearest integer, with halves rounding towards positive infinity.
///
/// This differs from [`f64::round`] for negative halves: `-2.5` becomes `-2`.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// The 12-byte notification exactly as the firmware lays it out.
///
/// | Bytes  | Field       | Encoding      |
/// |--------|-------------|---------------|
/// | 0..4   | temperature | f32 LE, °C    |
/// | 4..8   | humidity    | f32 LE, %RH   |
/// | 8..10  | luminosity  | i16 LE, lux   |
/// | 10..12 | soil raw    | i16 LE, count |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawPayload {
    /// Temperature in degrees Celsius, unrounded.
    pub temperature: f32,
    /// Relative humidity percentage, unrounded.
    pub humidity: f32,
    /// Ambient light level.
    pub luminosity: i16,
    /// Capacitive soil probe count (higher is drier).
    pub soil_raw: i16,
}

impl RawPayload {
    /// Parse the wire layout.
    ///
    /// Trailing bytes beyond [`PAYLOAD_LEN`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidPayload`] if `data` contains fewer than
    /// [`PAYLOAD_LEN`] (12) bytes.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        if data.len() < PAYLOAD_LEN {
            return Err(ParseError::InvalidPayload {
                expected: PAYLOAD_LEN,
                actual: data.len(),
            });
        }

        let mut buf = data;
        Ok(RawPayload {
            temperature: buf.get_f32_le(),
            humidity: buf.get_f32_le(),
            luminosity: buf.get_i16_le(),
            soil_raw: buf.get_i16_le(),
        })
    }

    /// Encode into the wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PAYLOAD_LEN] {
        use bytes::BufMut;

        let mut out = [0u8; PAYLOAD_LEN];
        let mut buf = &mut out[..];
        buf.put_f32_le(self.temperature);
        buf.put_f32_le(self.humidity);
        buf.put_i16_le(self.luminosity);
        buf.put_i16_le(self.soil_raw);
        out
    }
}

/// Two-point calibration mapping raw soil counts onto a 0-100 fertility scale.
///
/// ```
/// use flowerpot_types::SoilCalibration;
///
/// let cal = SoilCalibration::default();
/// assert_eq!(cal.fertility(3400), 0);
/// assert_eq!(cal.fertility(1350), 100);
/// assert_eq!(cal.fertility(2000), 68);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoilCalibration {
    /// Raw count read with the probe in air.
    pub in_air: i16,
    /// Raw count read with the probe in water.
    pub in_water: i16,
}

impl Default for SoilCalibration {
    fn default() -> Self {
        Self {
            in_air: DEFAULT_SOIL_IN_AIR,
            in_water: DEFAULT_SOIL_IN_WATER,
        }
    }
}

impl SoilCalibration {
    /// Create a calibration from the two reference counts.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidCalibration`] unless `in_air > in_water`.
    pub fn new(in_air: i16, in_water: i16) -> ParseResult<Self> {
        let cal = Self { in_air, in_water };
        cal.validate()?;
        Ok(cal)
    }

    /// Check the reference points are ordered.
    ///
    /// Needed after deserializing, which bypasses [`SoilCalibration::new`].
    pub fn validate(&self) -> ParseResult<()> {
        if self.in_air <= self.in_water {
            return Err(ParseError::InvalidCalibration {
                in_air: self.in_air,
                in_water: self.in_water,
            });
        }
        Ok(())
    }

    /// Convert a raw soil count to a fertility percentage (0-100).
    #[must_use]
    pub fn fertility(&self, raw: i16) -> u8 {
        if raw >= self.in_air {
            return 0;
        }
        if raw <= self.in_water {
            return 100;
        }
        let in_air = f64::from(self.in_air);
        let span = in_air - f64::from(self.in_water);
        let percent = 100.0 * (in_air - f64::from(raw)) / span;
        // in_water < raw < in_air keeps this strictly inside 0..=100
        round_half_up(percent).clamp(0.0, 100.0) as u8
    }
}

/// A decoded sensor reading.
///
/// Derived from every notification; it has no identity of its own and the
/// latest one simply replaces the previous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Temperature in degrees Celsius, rounded.
    pub temperature: i16,
    /// Relative humidity percentage, rounded.
    pub humidity: i16,
    /// Ambient light level.
    pub luminosity: i16,
    /// Raw soil probe count.
    pub soil_raw: i16,
    /// Soil fertility percentage (0-100) derived from `soil_raw`.
    pub fertility: u8,
    /// Timestamp when the reading was received (if known).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub captured_at: Option<time::OffsetDateTime>,
}

impl SensorReading {
    /// Decode a notification using the default soil calibration.
    ///
    /// # Example
    ///
    /// ```
    /// use flowerpot_types::{RawPayload, SensorReading};
    ///
    /// let bytes = RawPayload {
    ///     temperature: 22.0,
    ///     humidity: 60.0,
    ///     luminosity: 150,
    ///     soil_raw: 2000,
    /// }
    /// .to_bytes();
    ///
    /// let reading = SensorReading::from_bytes(&bytes).unwrap();
    /// assert_eq!(reading.temperature, 22);
    /// assert_eq!(reading.fertility, 68);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidPayload`] if fewer than 12 bytes are supplied,
    /// or [`ParseError::NonFiniteValue`] if a float slot holds NaN or infinity.
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        Self::from_bytes_with_calibration(data, &SoilCalibration::default())
    }

    /// Decode a notification with a specific soil calibration.
    ///
    /// # Errors
    ///
    /// Same as [`SensorReading::from_bytes`].
    #[must_use = "parsing returns a Result that should be handled"]
    pub fn from_bytes_with_calibration(
        data: &[u8],
        calibration: &SoilCalibration,
    ) -> ParseResult<Self> {
        let raw = RawPayload::from_bytes(data)?;
        Self::from_raw(&raw, calibration)
    }

    /// Derive a reading from an already-parsed payload.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NonFiniteValue`] for NaN or infinite floats.
    pub fn from_raw(raw: &RawPayload, calibration: &SoilCalibration) -> ParseResult<Self> {
        Ok(SensorReading {
            temperature: round_finite(raw.temperature, "temperature")?,
            humidity: round_finite(raw.humidity, "humidity")?,
            luminosity: raw.luminosity,
            soil_raw: raw.soil_raw,
            fertility: calibration.fertility(raw.soil_raw),
            captured_at: None,
        })
    }

    /// Stamp the reading with the time it was received.
    #[must_use]
    pub fn with_captured_at(mut self, now: time::OffsetDateTime) -> Self {
        self.captured_at = Some(now);
        self
    }
}

fn round_finite(value: f32, field: &'static str) -> ParseResult<i16> {
    if !value.is_finite() {
        return Err(ParseError::NonFiniteValue { field });
    }
    // Saturates for readings outside the i16 range
    Ok(round_half_up(f64::from(value)) as i16)
}
