//! Trait abstractions for flowerpot device operations.
//!
//! This module provides the [`FlowerpotDevice`] trait that abstracts over
//! real Bluetooth devices and mock devices for testing.

use async_trait::async_trait;

use flowerpot_types::SensorReading;

use crate::error::Result;
use crate::streaming::ReadingStream;

/// Trait abstracting flowerpot operations.
///
/// Implemented by [`crate::Device`] for real hardware and
/// [`crate::MockDevice`] for tests, so commands can be written once.
///
/// # Example
///
/// ```
/// use flowerpot_core::{FlowerpotDevice, Result};
///
/// async fn print_fertility<D: FlowerpotDevice>(device: &D) -> Result<()> {
///     let reading = device.read_current().await?;
///     println!("Fertility: {}%", reading.fertility);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FlowerpotDevice: Send + Sync {
    // --- Connection Management ---

    /// Check if the device is connected.
    async fn is_connected(&self) -> bool;

    /// Connect to the device.
    ///
    /// For devices that are already connected, this should be a no-op.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Disconnect from the device.
    async fn disconnect(&self) -> Result<()>;

    // --- Device Identity ---

    /// Get the device name, if available.
    fn name(&self) -> Option<&str>;

    /// Get the device address or identifier.
    ///
    /// On Linux/Windows this is typically the MAC address.
    /// On macOS this is a UUID since MAC addresses are not exposed.
    fn address(&self) -> &str;

    // --- Readings ---

    /// Read and decode the readings characteristic once.
    async fn read_current(&self) -> Result<SensorReading>;

    /// Subscribe to reading notifications.
    ///
    /// The returned stream owns the subscription; close or drop it to unsubscribe.
    async fn subscribe_readings(&self) -> Result<ReadingStream>;

    /// Read the current RSSI (signal strength) in dBm.
    async fn read_rssi(&self) -> Result<i16>;

    // --- Control ---

    /// Switch the onboard LED on or off.
    async fn set_light(&self, on: bool) -> Result<()>;
}
