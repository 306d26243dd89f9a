//! Core BLE library for the smart flowerpot.
//!
//! This crate provides Bluetooth Low Energy (BLE) communication with the
//! flowerpot: discovery, one-shot reads, live notifications and the light
//! command, plus the plant-health classification that turns a reading into
//! Low/OK/High levels and a Healthy/Unhealthy verdict.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby flowerpots, or pair with the first one seen
//! - **Current readings**: Temperature, humidity, luminosity, soil fertility
//! - **Real-time streaming**: Subscribe to reading notifications as a `Stream`
//! - **Light control**: Switch the onboard LED
//! - **Plant health**: Per-metric levels, progress and an overall verdict
//! - **Testing**: [`MockDevice`] implements the same [`FlowerpotDevice`] trait
//!
//! # Platform Differences
//!
//! - **macOS**: Devices are identified by a UUID assigned by CoreBluetooth. This UUID
//!   is stable for a given device on a given Mac, but differs between Macs.
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC address
//!   (e.g., `AA:BB:CC:DD:EE:FF`).
//!
//! [`Device::address()`] returns the appropriate identifier for the platform.
//!
//! # Quick Start
//!
//! ```no_run
//! use flowerpot_core::{Device, Thresholds, scan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let devices = scan::scan_for_devices().await?;
//!     println!("Found {} flowerpots", devices.len());
//!
//!     let device = Device::connect("flowerpot").await?;
//!     let reading = device.read_current().await?;
//!     let assessment = Thresholds::default().evaluate(&reading);
//!     println!("Fertility: {}% ({:?})", reading.fertility, assessment.verdict);
//!
//!     device.set_light(true).await?;
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod mock;
pub mod scan;
pub mod streaming;
pub mod thresholds;
pub mod traits;
pub mod util;

pub use flowerpot_types::types;
pub use flowerpot_types::uuid;

// Core exports
pub use device::{CharacteristicInfo, ConnectionConfig, Device};
pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use scan::{
    DiscoveredDevice, FindProgress, ProgressCallback, ScanOptions, find_device_with_progress,
    find_first_flowerpot,
};
pub use traits::FlowerpotDevice;

pub use mock::{MockDevice, MockDeviceBuilder};
pub use streaming::{ReadingResult, ReadingStream, StreamOptions, StreamOptionsBuilder};
pub use thresholds::{
    Assessment, Band, Level, Metric, MetricStatus, ThresholdConfig, Thresholds, Verdict,
};
pub use util::{create_identifier, format_peripheral_id, normalize_address};

// Re-export from flowerpot-types
pub use flowerpot_types::uuid as uuids;
pub use flowerpot_types::{
    LightState, ParseError, RawPayload, SensorReading, SoilCalibration, encode_light,
};
