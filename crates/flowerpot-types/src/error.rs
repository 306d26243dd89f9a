//! Error types for payload parsing in flowerpot-types.

use thiserror::Error;

/// Errors that can occur when decoding flowerpot sensor data.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in flowerpot-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The notification payload is shorter than the wire format requires.
    #[error("Invalid payload: requires {expected} bytes, got {actual}")]
    InvalidPayload {
        /// Number of bytes the format requires.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// A floating-point slot in the payload held NaN or infinity.
    #[error("Invalid payload: {field} is not a finite number")]
    NonFiniteValue {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The soil calibration points are not ordered (the in-air count must be the larger one).
    #[error("Invalid calibration: in-air value {in_air} must be greater than in-water value {in_water}")]
    InvalidCalibration {
        /// Raw count with the probe in air.
        in_air: i16,
        /// Raw count with the probe in water.
        in_water: i16,
    },
}

/// Result type alias using flowerpot-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
