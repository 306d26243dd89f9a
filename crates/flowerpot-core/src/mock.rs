//! Mock device implementation for testing.
//!
//! This module provides a mock flowerpot that can be used for unit testing
//! without requiring actual BLE hardware.
//!
//! The [`MockDevice`] implements the [`FlowerpotDevice`] trait, allowing it to
//! be used interchangeably with real devices in generic code.
//!
//! # Features
//!
//! - **Raw payloads**: The mock stores the 12-byte readings payload itself,
//!   so malformed payloads can be served too
//! - **Notifications**: Push payloads to subscribers with [`MockDevice::notify`]
//! - **Failure injection**: Fail every operation, or only the next few
//! - **Latency simulation**: Add artificial delays to simulate slow BLE responses

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI16, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use tokio::sync::RwLock;

use flowerpot_types::{LightState, RawPayload, SensorReading, SoilCalibration, encode_light};

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::streaming::{ReadingStream, StreamOptions};
use crate::traits::FlowerpotDevice;

/// A mock flowerpot for testing.
///
/// # Example
///
/// ```
/// use flowerpot_core::{FlowerpotDevice, MockDevice};
///
/// #[tokio::main]
/// async fn main() {
///     let device = MockDevice::new("flowerpot");
///     device.connect().await.unwrap();
///
///     async fn read_via_trait<D: FlowerpotDevice>(d: &D) -> u8 {
///         d.read_current().await.unwrap().fertility
///     }
///     assert_eq!(read_via_trait(&device).await, 68);
/// }
/// ```
pub struct MockDevice {
    name: String,
    address: String,
    connected: AtomicBool,
    payload: RwLock<Vec<u8>>,
    calibration: SoilCalibration,
    light: RwLock<LightState>,
    light_writes: RwLock<Vec<[u8; 2]>>,
    rssi: AtomicI16,
    read_count: AtomicU32,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated read latency in milliseconds (0 = no delay).
    read_latency_ms: AtomicU64,
    /// Number of operations left to fail before succeeding.
    remaining_failures: AtomicU32,
    subscribers: std::sync::Mutex<Vec<UnboundedSender<Vec<u8>>>>,
    active_subscriptions: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockDevice {
    /// Default payload: 22 °C, 60 %, 150 lx, soil raw 2000 (fertility 68 %).
    pub const DEFAULT_RAW: RawPayload = RawPayload {
        temperature: 22.0,
        humidity: 60.0,
        luminosity: 150,
        soil_raw: 2000,
    };

    /// Create a new mock device with default values.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF),
            connected: AtomicBool::new(false),
            payload: RwLock::new(Self::DEFAULT_RAW.to_bytes().to_vec()),
            calibration: SoilCalibration::default(),
            light: RwLock::new(LightState::Off),
            light_writes: RwLock::new(Vec::new()),
            rssi: AtomicI16::new(-50),
            read_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            read_latency_ms: AtomicU64::new(0),
            remaining_failures: AtomicU32::new(0),
            subscribers: std::sync::Mutex::new(Vec::new()),
            active_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Connect to the mock device.
    pub async fn connect(&self) -> Result<()> {
        self.check_should_fail().await?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Disconnect from the mock device.
    ///
    /// Ends every open notification stream.
    pub async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.clear();
        }
        Ok(())
    }

    /// Check if connected (sync method for internal use).
    pub fn is_connected_sync(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the device address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Soil calibration used to decode payloads.
    pub fn calibration(&self) -> &SoilCalibration {
        &self.calibration
    }

    /// Read and decode the stored payload.
    pub async fn read_current(&self) -> Result<SensorReading> {
        self.check_connected()?;
        self.check_should_fail().await?;

        self.read_count.fetch_add(1, Ordering::Relaxed);
        let payload = self.payload.read().await;
        let reading = SensorReading::from_bytes_with_calibration(&payload, &self.calibration)?;
        Ok(reading.with_captured_at(time::OffsetDateTime::now_utc()))
    }

    /// Read RSSI (signal strength).
    pub async fn read_rssi(&self) -> Result<i16> {
        self.check_connected()?;
        self.check_should_fail().await?;
        Ok(self.rssi.load(Ordering::Relaxed))
    }

    /// Record a light command write.
    pub async fn set_light(&self, on: bool) -> Result<()> {
        self.check_connected()?;
        self.check_should_fail().await?;
        self.light_writes.write().await.push(encode_light(on));
        *self.light.write().await = LightState::from(on);
        Ok(())
    }

    /// Subscribe to payloads pushed with [`MockDevice::notify`].
    pub async fn subscribe_readings(&self) -> Result<ReadingStream> {
        let options = StreamOptions::builder()
            .calibration(self.calibration)
            .build();
        self.subscribe_readings_with_options(options).await
    }

    /// Subscribe with explicit stream options.
    pub async fn subscribe_readings_with_options(
        &self,
        options: StreamOptions,
    ) -> Result<ReadingStream> {
        self.check_connected()?;
        self.check_should_fail().await?;
        options.validate()?;

        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .map_err(|_| Error::InvalidData("subscriber list poisoned".to_string()))?
            .push(tx);

        let active = Arc::clone(&self.active_subscriptions);
        active.fetch_add(1, Ordering::SeqCst);
        let teardown = async move {
            active.fetch_sub(1, Ordering::SeqCst);
        };

        Ok(ReadingStream::with_teardown(rx, options, teardown))
    }

    fn check_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::Relaxed) {
            Err(Error::NotConnected)
        } else {
            Ok(())
        }
    }

    async fn check_should_fail(&self) -> Result<()> {
        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        // Transient failures first
        let transient = self
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();

        if transient || self.should_fail.load(Ordering::Relaxed) {
            Err(Error::connection_failed(
                Some(self.address.clone()),
                ConnectionFailureReason::BleError(self.fail_message.read().await.clone()),
            ))
        } else {
            Ok(())
        }
    }

    // --- Test control methods ---

    /// Replace the stored payload, which may be malformed.
    pub async fn set_payload(&self, payload: impl Into<Vec<u8>>) {
        *self.payload.write().await = payload.into();
    }

    /// Replace the stored payload with an encoded raw payload.
    pub async fn set_raw(&self, raw: RawPayload) {
        self.set_payload(raw.to_bytes()).await;
    }

    /// Push a notification to every open subscription.
    ///
    /// Returns how many subscribers received it.
    pub fn notify(&self, payload: &[u8]) -> usize {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return 0;
        };
        subscribers.retain(|tx| tx.unbounded_send(payload.to_vec()).is_ok());
        subscribers.len()
    }

    /// Whether at least one reading stream is still open.
    pub fn is_subscribed(&self) -> bool {
        self.subscription_count() > 0
    }

    /// Number of reading streams that have not been torn down yet.
    pub fn subscription_count(&self) -> usize {
        self.active_subscriptions.load(Ordering::SeqCst)
    }

    /// Last light state written.
    pub async fn light_state(&self) -> LightState {
        *self.light.read().await
    }

    /// Every light command written, in order.
    pub async fn light_writes(&self) -> Vec<[u8; 2]> {
        self.light_writes.read().await.clone()
    }

    /// Set RSSI (signal strength) for testing.
    pub fn set_rssi(&self, rssi: i16) {
        self.rssi.store(rssi, Ordering::Relaxed);
    }

    /// Make the device fail on every operation.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Get the number of read operations performed.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Set simulated read latency.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Fail the next `count` operations, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Get the number of remaining transient failures.
    pub fn remaining_failures(&self) -> u32 {
        self.remaining_failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FlowerpotDevice for MockDevice {
    async fn is_connected(&self) -> bool {
        self.is_connected_sync()
    }

    async fn connect(&self) -> Result<()> {
        MockDevice::connect(self).await
    }

    async fn disconnect(&self) -> Result<()> {
        MockDevice::disconnect(self).await
    }

    fn name(&self) -> Option<&str> {
        Some(MockDevice::name(self))
    }

    fn address(&self) -> &str {
        MockDevice::address(self)
    }

    async fn read_current(&self) -> Result<SensorReading> {
        MockDevice::read_current(self).await
    }

    async fn subscribe_readings(&self) -> Result<ReadingStream> {
        MockDevice::subscribe_readings(self).await
    }

    async fn read_rssi(&self) -> Result<i16> {
        MockDevice::read_rssi(self).await
    }

    async fn set_light(&self, on: bool) -> Result<()> {
        MockDevice::set_light(self, on).await
    }
}

/// Builder for creating mock devices with custom settings.
#[derive(Debug)]
pub struct MockDeviceBuilder {
    name: String,
    raw: RawPayload,
    calibration: SoilCalibration,
    rssi: i16,
    auto_connect: bool,
}

impl Default for MockDeviceBuilder {
    fn default() -> Self {
        Self {
            name: "Mock Flowerpot".to_string(),
            raw: MockDevice::DEFAULT_RAW,
            calibration: SoilCalibration::default(),
            rssi: -50,
            auto_connect: true,
        }
    }
}

impl MockDeviceBuilder {
    /// Create a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the temperature in °C.
    #[must_use]
    pub fn temperature(mut self, temp: f32) -> Self {
        self.raw.temperature = temp;
        self
    }

    /// Set the humidity in %.
    #[must_use]
    pub fn humidity(mut self, humidity: f32) -> Self {
        self.raw.humidity = humidity;
        self
    }

    /// Set the luminosity in lux.
    #[must_use]
    pub fn luminosity(mut self, luminosity: i16) -> Self {
        self.raw.luminosity = luminosity;
        self
    }

    /// Set the raw soil-moisture value.
    #[must_use]
    pub fn soil_raw(mut self, soil_raw: i16) -> Self {
        self.raw.soil_raw = soil_raw;
        self
    }

    /// Set the soil calibration.
    #[must_use]
    pub fn calibration(mut self, calibration: SoilCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Set the RSSI.
    #[must_use]
    pub fn rssi(mut self, rssi: i16) -> Self {
        self.rssi = rssi;
        self
    }

    /// Set whether the device should auto-connect.
    #[must_use]
    pub fn auto_connect(mut self, auto: bool) -> Self {
        self.auto_connect = auto;
        self
    }

    /// Build the mock device.
    #[must_use]
    pub fn build(self) -> MockDevice {
        let mut device = MockDevice::new(&self.name);
        device.calibration = self.calibration;
        device.payload = RwLock::new(self.raw.to_bytes().to_vec());
        device.rssi = AtomicI16::new(self.rssi);
        device.connected = AtomicBool::new(self.auto_connect);
        device
    }
}
