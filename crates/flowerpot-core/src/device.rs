//! Flowerpot connection and communication.
//!
//! This module provides the main interface for connecting to a flowerpot
//! over Bluetooth Low Energy: reading the sensor characteristic, subscribing
//! to its notifications and writing the light command.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use flowerpot_types::uuid::{LIGHT, MANUFACTURER_NAME, READINGS};
use flowerpot_types::{LightState, SensorReading, SoilCalibration};

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::scan::{ScanOptions, find_device_with_options};
use crate::streaming::{ReadingStream, StreamOptions};
use crate::traits::FlowerpotDevice;
use crate::util::{create_identifier, format_peripheral_id};

/// A connected flowerpot.
///
/// `Device` is not `Clone`: it owns the BLE connection. Share it across
/// tasks with `Arc<Device>`.
///
/// # Cleanup
///
/// Call [`Device::disconnect`] before dropping the device. Dropping without
/// it logs a warning and spawns a best-effort disconnect.
pub struct Device {
    /// Kept alive for the lifetime of the peripheral connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    /// MAC address on Linux/Windows, CoreBluetooth UUID on macOS.
    address: String,
    /// Characteristics by UUID, built after service discovery.
    characteristics_cache: RwLock<HashMap<Uuid, Characteristic>>,
    /// Cancellation tokens of open reading streams.
    streams: tokio::sync::Mutex<Vec<CancellationToken>>,
    disconnected: AtomicBool,
    config: ConnectionConfig,
    calibration: SoilCalibration,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("calibration", &self.calibration)
            .finish_non_exhaustive()
    }
}

/// Default timeout for BLE characteristic read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use flowerpot_core::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .read_timeout(Duration::from_secs(15));
/// assert_eq!(config.read_timeout, Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

/// One characteristic as discovered on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicInfo {
    pub service: Uuid,
    pub uuid: Uuid,
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
    pub indicate: bool,
}

impl CharacteristicInfo {
    fn from_characteristic(characteristic: &Characteristic) -> Self {
        let props = characteristic.properties;
        Self {
            service: characteristic.service_uuid,
            uuid: characteristic.uuid,
            read: props.contains(CharPropFlags::READ),
            write: props.contains(CharPropFlags::WRITE),
            write_without_response: props.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
            notify: props.contains(CharPropFlags::NOTIFY),
            indicate: props.contains(CharPropFlags::INDICATE),
        }
    }

    /// Property names joined with `+`, e.g. `read+notify`.
    pub fn properties_label(&self) -> String {
        let flags = [
            (self.read, "read"),
            (self.write, "write"),
            (self.write_without_response, "write-no-response"),
            (self.notify, "notify"),
            (self.indicate, "indicate"),
        ];
        let names: Vec<&str> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();
        names.join("+")
    }
}

impl Device {
    /// Connect to a flowerpot by name, address or peripheral ID.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use flowerpot_core::Device;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let device = Device::connect("AA:BB:CC:DD:EE:FF").await?;
    ///     println!("Connected to {:?}", device);
    ///     device.disconnect().await?;
    ///     Ok(())
    /// }
    /// ```
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect(identifier: &str) -> Result<Self> {
        Self::connect_with_config(identifier, ConnectionConfig::default()).await
    }

    /// Connect with custom timeouts.
    ///
    /// The connection timeout also bounds how long the device is searched for.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect_with_config(identifier: &str, config: ConnectionConfig) -> Result<Self> {
        let options = ScanOptions::default()
            .duration(config.connection_timeout)
            .all_devices();
        let (adapter, peripheral) = find_device_with_options(identifier, options).await?;
        Self::from_peripheral_with_config(adapter, peripheral, config).await
    }

    /// Create a Device from an already-discovered peripheral.
    pub async fn from_peripheral(adapter: Adapter, peripheral: Peripheral) -> Result<Self> {
        Self::from_peripheral_with_config(adapter, peripheral, ConnectionConfig::default()).await
    }

    /// Connect to a discovered peripheral and discover its services.
    #[tracing::instrument(level = "info", skip_all, fields(connect_timeout = ?config.connection_timeout))]
    pub async fn from_peripheral_with_config(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        info!("Connecting to device...");
        let device_id = Some(format_peripheral_id(&peripheral.id()));
        match timeout(config.connection_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::connection_failed(device_id, connection_failure_reason(&e)));
            }
            Err(_) => {
                return Err(Error::connection_failed(
                    device_id,
                    ConnectionFailureReason::Timeout,
                ));
            }
        }
        info!("Connected!");

        info!("Discovering services...");
        timeout(config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", config.discovery_timeout))??;

        let services = peripheral.services();
        debug!("Found {} services", services.len());

        let mut characteristics_cache = HashMap::new();
        for service in &services {
            debug!("  Service: {}", service.uuid);
            for char in &service.characteristics {
                debug!("    Characteristic: {} ({:?})", char.uuid, char.properties);
                characteristics_cache.insert(char.uuid, char.clone());
            }
        }

        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());

        // macOS reports 00:00:00:00:00:00, fall back to the peripheral ID
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(Self {
            adapter,
            peripheral,
            name,
            address,
            characteristics_cache: RwLock::new(characteristics_cache),
            streams: tokio::sync::Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            config,
            calibration: SoilCalibration::default(),
        })
    }

    /// Use a specific soil calibration for fertility.
    #[must_use]
    pub fn with_calibration(mut self, calibration: SoilCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// The soil calibration in use.
    pub fn calibration(&self) -> &SoilCalibration {
        &self.calibration
    }

    /// Get the current connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Check if the device is connected (queries BLE stack state).
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Disconnect from the device.
    ///
    /// Cancels every open reading stream, then disconnects the peripheral.
    #[tracing::instrument(level = "info", skip(self), fields(device_name = ?self.name))]
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from device...");
        self.disconnected.store(true, Ordering::SeqCst);

        for token in self.streams.lock().await.drain(..) {
            token.cancel();
        }

        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Get the device name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the device address or identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Read the current RSSI (signal strength) in dBm.
    pub async fn read_rssi(&self) -> Result<i16> {
        let properties = self.peripheral.properties().await?;
        properties
            .and_then(|p| p.rssi)
            .ok_or_else(|| Error::InvalidData("RSSI not available".to_string()))
    }

    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        {
            let cache = self.characteristics_cache.read().await;
            if let Some(char) = cache.get(&uuid) {
                return Ok(char.clone());
            }
            if !cache.is_empty() {
                return Err(Error::characteristic_not_found(
                    uuid.to_string(),
                    self.peripheral.services().len(),
                ));
            }
        }

        warn!(
            "Characteristics cache empty, falling back to service search for {}",
            uuid
        );
        let services = self.peripheral.services();
        services
            .iter()
            .flat_map(|s| s.characteristics.iter())
            .find(|c| c.uuid == uuid)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), services.len()))
    }

    /// Read a characteristic value by UUID.
    pub async fn read_characteristic(&self, uuid: Uuid) -> Result<Vec<u8>> {
        let characteristic = self.find_characteristic(uuid).await?;
        let data = timeout(self.config.read_timeout, self.peripheral.read(&characteristic))
            .await
            .map_err(|_| {
                Error::timeout(format!("read characteristic {}", uuid), self.config.read_timeout)
            })??;
        Ok(data)
    }

    /// Write a value to a characteristic (with response).
    pub async fn write_characteristic(&self, uuid: Uuid, data: &[u8]) -> Result<()> {
        let characteristic = self.find_characteristic(uuid).await?;
        timeout(
            self.config.write_timeout,
            self.peripheral
                .write(&characteristic, data, WriteType::WithResponse),
        )
        .await
        .map_err(|_| Error::timeout(format!("write characteristic {}", uuid), self.config.write_timeout))?
        .map_err(|e| Error::WriteFailed {
            uuid: uuid.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and decode the readings characteristic.
    #[tracing::instrument(level = "debug", skip(self), fields(device_name = ?self.name))]
    pub async fn read_current(&self) -> Result<SensorReading> {
        let data = self.read_characteristic(READINGS).await?;
        let reading = SensorReading::from_bytes_with_calibration(&data, &self.calibration)?;
        Ok(reading.with_captured_at(time::OffsetDateTime::now_utc()))
    }

    /// Switch the onboard LED.
    #[tracing::instrument(level = "debug", skip(self), fields(device_name = ?self.name))]
    pub async fn set_light(&self, on: bool) -> Result<()> {
        let state = LightState::from(on);
        debug!("Writing light command: {}", state);
        self.write_characteristic(LIGHT, &state.to_bytes()).await
    }

    /// Read the manufacturer name from the Device Information service.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn read_manufacturer(&self) -> Result<String> {
        let data = self.read_characteristic(MANUFACTURER_NAME).await?;
        let name = String::from_utf8_lossy(&data)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        if name.is_empty() {
            return Err(Error::InvalidData("Empty manufacturer name".to_string()));
        }
        Ok(name)
    }

    /// All discovered characteristics with their properties, sorted by service.
    pub async fn characteristics(&self) -> Vec<CharacteristicInfo> {
        let cache = self.characteristics_cache.read().await;
        let mut infos: Vec<CharacteristicInfo> = cache
            .values()
            .map(CharacteristicInfo::from_characteristic)
            .collect();
        infos.sort_by_key(|c| (c.service, c.uuid));
        infos
    }

    /// Subscribe to reading notifications with the device's calibration.
    pub async fn subscribe_readings(&self) -> Result<ReadingStream> {
        let options = StreamOptions::builder()
            .calibration(self.calibration)
            .build();
        self.subscribe_readings_with_options(options).await
    }

    /// Subscribe to reading notifications.
    ///
    /// The returned stream unsubscribes from the characteristic when it is
    /// closed, dropped, or the device disconnects.
    #[tracing::instrument(level = "debug", skip_all, fields(device_name = ?self.name))]
    pub async fn subscribe_readings_with_options(
        &self,
        options: StreamOptions,
    ) -> Result<ReadingStream> {
        options.validate()?;
        let characteristic = self.find_characteristic(READINGS).await?;

        // Take the notification stream before subscribing so no early value is missed
        let notifications = self.peripheral.notifications().await?;
        self.peripheral.subscribe(&characteristic).await?;
        info!("Subscribed to reading notifications");

        let source = notifications.filter_map(|n| async move {
            if n.uuid == READINGS {
                Some(n.value)
            } else {
                None
            }
        });

        let peripheral = self.peripheral.clone();
        let teardown = async move {
            match peripheral.unsubscribe(&characteristic).await {
                Ok(()) => debug!("Unsubscribed from reading notifications"),
                Err(e) => debug!("Unsubscribe failed (device may be gone): {}", e),
            }
        };

        let stream = ReadingStream::with_teardown(source, options, teardown);

        let mut streams = self.streams.lock().await;
        streams.retain(|t| !t.is_cancelled());
        streams.push(stream.cancellation_token());

        Ok(stream)
    }

    /// Get the number of cached characteristics.
    pub async fn cached_characteristic_count(&self) -> usize {
        self.characteristics_cache.read().await.len()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if !self.disconnected.swap(true, Ordering::SeqCst) {
            warn!(
                device_name = ?self.name,
                device_address = %self.address,
                "Device dropped without calling disconnect() - performing best-effort cleanup"
            );

            if let Ok(mut streams) = self.streams.try_lock() {
                for token in streams.drain(..) {
                    token.cancel();
                }
            }

            let peripheral = self.peripheral.clone();
            let address = self.address.clone();

            // The runtime may already be shutting down
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = peripheral.disconnect().await {
                        debug!(
                            device_address = %address,
                            error = %e,
                            "Best-effort disconnect failed"
                        );
                    }
                });
            }
        }
    }
}

#[async_trait]
impl FlowerpotDevice for Device {
    async fn is_connected(&self) -> bool {
        Device::is_connected(self).await
    }

    async fn disconnect(&self) -> Result<()> {
        Device::disconnect(self).await
    }

    fn name(&self) -> Option<&str> {
        Device::name(self)
    }

    fn address(&self) -> &str {
        Device::address(self)
    }

    async fn read_current(&self) -> Result<SensorReading> {
        Device::read_current(self).await
    }

    async fn subscribe_readings(&self) -> Result<ReadingStream> {
        Device::subscribe_readings(self).await
    }

    async fn read_rssi(&self) -> Result<i16> {
        Device::read_rssi(self).await
    }

    async fn set_light(&self, on: bool) -> Result<()> {
        Device::set_light(self, on).await
    }
}

/// Map a btleplug connect error onto a structured reason.
fn connection_failure_reason(err: &btleplug::Error) -> ConnectionFailureReason {
    match err {
        btleplug::Error::DeviceNotFound => ConnectionFailureReason::OutOfRange,
        btleplug::Error::TimedOut(_) => ConnectionFailureReason::Timeout,
        btleplug::Error::PermissionDenied => ConnectionFailureReason::AdapterUnavailable,
        other => ConnectionFailureReason::BleError(other.to_string()),
    }
}
