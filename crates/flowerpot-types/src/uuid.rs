//! Bluetooth UUIDs for the smart flowerpot.
//!
//! The firmware exposes two services: the environmental-sensing service
//! carrying the readings and light characteristics, and the standard
//! Device Information service.

use uuid::{Uuid, uuid};

/// Local name the flowerpot advertises (matched case-insensitively).
pub const ADVERTISED_NAME: &str = "flowerpot";

// --- Flowerpot Service UUIDs ---

/// Environmental Sensing service (0x181C) hosting the readings and light characteristics.
pub const FLOWERPOT_SERVICE: Uuid = uuid!("0000181c-0000-1000-8000-00805f9b34fb");

/// Sensor readings characteristic (read + notify, 12-byte payload).
pub const READINGS: Uuid = uuid!("beb5483e-0000-1000-8000-00805f9b34fb");

/// Light characteristic (read + write, 2-byte command).
pub const LIGHT: Uuid = uuid!("00002a76-0000-1000-8000-00805f9b34fb");

// --- Standard BLE Service UUIDs ---

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");

/// Client Characteristic Configuration descriptor used to enable notifications.
pub const CCCD: Uuid = uuid!("00002902-0000-1000-8000-00805f9b34fb");

/// Returns true if `name` is the flowerpot's advertised local name.
#[must_use]
pub fn is_flowerpot_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(ADVERTISED_NAME)
}
