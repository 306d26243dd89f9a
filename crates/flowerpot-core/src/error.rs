//! Error types for flowerpot-core.
//!
//! This module defines all error types that can occur when talking to a
//! flowerpot over Bluetooth Low Energy.
//!
//! # Error Recovery
//!
//! | Error Type | Strategy | Notes |
//! |------------|----------|-------|
//! | [`Error::Timeout`] | Retry | BLE congestion is usually transient |
//! | [`Error::Bluetooth`] | Retry, then reconnect | May be transient or connection lost |
//! | [`Error::NotConnected`] | Reconnect | Connection was lost |
//! | [`Error::ConnectionFailed`] | Retry with backoff | Device may be out of range |
//! | [`Error::WriteFailed`] | Retry once | BLE writes can fail transiently |
//! | [`Error::InvalidPayload`] | Skip the notification | Report it, never substitute defaults |
//! | [`Error::DeviceNotFound`] | Do not retry | Device not advertising or wrong identifier |
//! | [`Error::CharacteristicNotFound`] | Do not retry | Not a flowerpot, or firmware mismatch |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |
//!
//! `watch` in the CLI reconnects with exponential backoff on the retryable
//! kinds (see [`Error::is_retryable`]) and gives up on the others. A device
//! that disappears after a session was established is still looked for.

use std::time::Duration;

use thiserror::Error;

use flowerpot_types::ParseError;

/// Errors that can occur when communicating with a flowerpot.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to device.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on device.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Data read from the device was unusable (empty, missing or not text).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A readings payload could not be decoded.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Connection failed with specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Write operation failed.
    #[error("Write failed to characteristic {uuid}: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Bluetooth adapter not available or powered off.
    AdapterUnavailable,
    /// Device is out of range.
    OutOfRange,
    /// Connection attempt timed out.
    Timeout,
    /// Any other BLE stack error.
    BleError(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::OutOfRange => write!(f, "device out of range"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
        }
    }
}

/// Reason why a device was not found.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// Device with specified name/address not found.
    NotFound { identifier: String },
    /// Scan timed out before finding device.
    ScanTimeout { duration: Duration },
    /// No Bluetooth adapter available (or Bluetooth is switched off).
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::ScanTimeout { duration } => write!(f, "scan timed out after {:?}", duration),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Whether a fresh attempt (possibly after reconnecting) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. }
            | Error::Bluetooth(_)
            | Error::NotConnected
            | Error::WriteFailed { .. } => true,
            Error::ConnectionFailed { reason, .. } => matches!(
                reason,
                ConnectionFailureReason::OutOfRange
                    | ConnectionFailureReason::Timeout
                    | ConnectionFailureReason::BleError(_)
            ),
            _ => false,
        }
    }
}

/// Result type alias using flowerpot-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
