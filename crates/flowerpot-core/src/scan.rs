//! Device discovery and scanning.
//!
//! This module finds flowerpots over Bluetooth Low Energy. A peripheral
//! counts as a flowerpot when it advertises the local name `flowerpot`
//! (any case) or the environmental-sensing service.

use std::future::Future;
use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use flowerpot_types::uuid::{FLOWERPOT_SERVICE, is_flowerpot_name};

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::util::{create_identifier, format_peripheral_id, is_null_address, normalize_address};

/// How often the pairing scan re-checks the adapter's peripheral list.
const PAIR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Progress update for device finding operations.
#[derive(Debug, Clone)]
pub enum FindProgress {
    /// Found device in cache, no scan needed.
    CacheHit,
    /// Starting scan attempt.
    ScanAttempt {
        /// Current attempt number (1-based).
        attempt: u32,
        /// Total number of attempts.
        total: u32,
        /// Duration of this scan attempt.
        duration_secs: u64,
    },
    /// Device found on specific attempt.
    Found { attempt: u32 },
    /// Attempt failed, will retry.
    RetryNeeded { attempt: u32 },
}

/// Callback type for progress updates during device finding.
pub type ProgressCallback = Box<dyn Fn(FindProgress) + Send + Sync>;

/// Information about a discovered peripheral.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// The advertised local name.
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (zeros on macOS, use `identifier` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address elsewhere).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Whether the peripheral looks like a flowerpot.
    pub is_flowerpot: bool,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return peripherals that look like flowerpots.
    pub filter_flowerpot_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            filter_flowerpot_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    #[must_use]
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Set whether to filter for flowerpots only.
    #[must_use]
    pub fn filter_flowerpot_only(mut self, filter: bool) -> Self {
        self.filter_flowerpot_only = filter;
        self
    }

    /// Scan for all BLE devices, not just flowerpots.
    #[must_use]
    pub fn all_devices(self) -> Self {
        self.filter_flowerpot_only(false)
    }
}

/// Get the first available Bluetooth adapter.
///
/// Fails with [`DeviceNotFoundReason::NoAdapter`] when Bluetooth is
/// unavailable on this machine.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for flowerpots in range using default options.
///
/// An empty list means nothing was found; it is not an error.
pub async fn scan_for_devices() -> Result<Vec<DiscoveredDevice>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan for devices with custom options.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral, options.filter_flowerpot_only).await {
            Ok(Some(device)) => {
                debug!("Found device: {:?}", device.name);
                discovered.push(device);
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

/// Scan until the first flowerpot advertises, then stop scanning.
///
/// This is the pairing flow: the returned device's `identifier` is what
/// callers should remember for later connections.
#[tracing::instrument(level = "info", skip_all, fields(timeout_secs = timeout.as_secs()))]
pub async fn find_first_flowerpot(timeout: Duration) -> Result<DiscoveredDevice> {
    let adapter = get_adapter().await?;
    find_first_flowerpot_with_adapter(&adapter, timeout).await
}

/// Pairing scan using a specific adapter.
pub async fn find_first_flowerpot_with_adapter(
    adapter: &Adapter,
    timeout: Duration,
) -> Result<DiscoveredDevice> {
    adapter.start_scan(ScanFilter::default()).await?;
    let found = poll_until(timeout, PAIR_POLL_INTERVAL, || first_flowerpot(adapter)).await;

    if let Err(e) = adapter.stop_scan().await {
        warn!("Failed to stop scan: {}", e);
    }

    match found? {
        Some(device) => {
            info!(
                "Paired with {} ({})",
                device.name.as_deref().unwrap_or("flowerpot"),
                device.identifier
            );
            Ok(device)
        }
        None => Err(Error::DeviceNotFound(DeviceNotFoundReason::ScanTimeout {
            duration: timeout,
        })),
    }
}

/// Call `probe` every `interval` until it yields a value, fails, or
/// `timeout` has passed.
async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(interval).await;
    }
}

async fn first_flowerpot(adapter: &Adapter) -> Result<Option<DiscoveredDevice>> {
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(device)) = process_peripheral(&peripheral, true).await {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Build a [`DiscoveredDevice`] from a peripheral, or `None` if filtered out.
async fn process_peripheral(
    peripheral: &Peripheral,
    filter_flowerpot_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let is_flowerpot = is_flowerpot_device(&properties);
    if filter_flowerpot_only && !is_flowerpot {
        return Ok(None);
    }

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredDevice {
        name: properties.local_name,
        id,
        address,
        identifier,
        rssi: properties.rssi,
        is_flowerpot,
    }))
}

/// Check if a peripheral is a flowerpot based on its advertisement.
pub fn is_flowerpot_device(properties: &PeripheralProperties) -> bool {
    if properties
        .local_name
        .as_deref()
        .is_some_and(is_flowerpot_name)
    {
        return true;
    }

    properties.services.contains(&FLOWERPOT_SERVICE)
        || properties.service_data.contains_key(&FLOWERPOT_SERVICE)
}

/// Find a specific device by name or address.
pub async fn find_device(identifier: &str) -> Result<(Adapter, Peripheral)> {
    find_device_with_options(identifier, ScanOptions::default()).await
}

/// Find a specific device by name or address with custom options.
pub async fn find_device_with_options(
    identifier: &str,
    options: ScanOptions,
) -> Result<(Adapter, Peripheral)> {
    find_device_with_progress(identifier, options, None).await
}

/// Find a specific device with progress callback for UI feedback.
///
/// Checks peripherals the adapter already knows about first, then performs
/// up to 3 scans of increasing duration. Advertisements are easy to miss,
/// so a single short scan is not enough.
pub async fn find_device_with_progress(
    identifier: &str,
    options: ScanOptions,
    progress: Option<ProgressCallback>,
) -> Result<(Adapter, Peripheral)> {
    let adapter = get_adapter().await?;
    let identifier_lower = identifier.to_lowercase();

    info!("Looking for device: {}", identifier);

    if let Some(peripheral) = find_peripheral_by_identifier(&adapter, &identifier_lower).await? {
        info!("Found device in cache (no scan needed)");
        if let Some(ref cb) = progress {
            cb(FindProgress::CacheHit);
        }
        return Ok((adapter, peripheral));
    }

    let max_attempts: u32 = 3;
    let base_duration = options.duration.as_millis() as u64 / 2;
    let base_duration = Duration::from_millis(base_duration.max(2000));

    for attempt in 1..=max_attempts {
        let scan_duration = base_duration * attempt;
        let duration_secs = scan_duration.as_secs();

        info!(
            "Scan attempt {}/{} ({}s)...",
            attempt, max_attempts, duration_secs
        );

        if let Some(ref cb) = progress {
            cb(FindProgress::ScanAttempt {
                attempt,
                total: max_attempts,
                duration_secs,
            });
        }

        adapter.start_scan(ScanFilter::default()).await?;
        sleep(scan_duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) =
            find_peripheral_by_identifier(&adapter, &identifier_lower).await?
        {
            info!("Found device on attempt {}", attempt);
            if let Some(ref cb) = progress {
                cb(FindProgress::Found { attempt });
            }
            return Ok((adapter, peripheral));
        }

        if attempt < max_attempts {
            warn!("Device not found, retrying...");
            if let Some(ref cb) = progress {
                cb(FindProgress::RetryNeeded { attempt });
            }
        }
    }

    warn!(
        "Device not found after {} attempts: {}",
        max_attempts, identifier
    );
    Err(Error::device_not_found(identifier))
}

/// Search through known peripherals to find one matching the identifier.
async fn find_peripheral_by_identifier(
    adapter: &Adapter,
    identifier_lower: &str,
) -> Result<Option<Peripheral>> {
    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Ok(Some(props)) = peripheral.properties().await {
            let peripheral_id = format_peripheral_id(&peripheral.id()).to_lowercase();
            if matches_identifier(
                &peripheral_id,
                &props.address.to_string(),
                props.local_name.as_deref(),
                identifier_lower,
            ) {
                debug!("Matched peripheral {}", peripheral_id);
                return Ok(Some(peripheral));
            }
        }
    }

    Ok(None)
}

/// Match by peripheral ID, MAC address (with or without separators), or
/// case-insensitive name substring. `identifier_lower` must be lowercase.
fn matches_identifier(
    peripheral_id_lower: &str,
    address: &str,
    name: Option<&str>,
    identifier_lower: &str,
) -> bool {
    if identifier_lower.is_empty() {
        return false;
    }

    // macOS identifies peripherals by UUID
    if peripheral_id_lower.contains(identifier_lower) {
        return true;
    }

    if !is_null_address(address) && normalize_address(address) == normalize_address(identifier_lower)
    {
        return true;
    }

    name.is_some_and(|n| n.to_lowercase().contains(identifier_lower))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(name: Option<&str>) -> PeripheralProperties {
        PeripheralProperties {
            local_name: name.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_flowerpot_detected_by_name() {
        assert!(is_flowerpot_device(&properties(Some("Flowerpot"))));
        assert!(is_flowerpot_device(&properties(Some("flowerpot"))));
        assert!(!is_flowerpot_device(&properties(Some("Mi Band 7"))));
        assert!(!is_flowerpot_device(&properties(None)));
    }

    #[test]
    fn test_flowerpot_detected_by_service() {
        let mut props = properties(None);
        props.services.push(FLOWERPOT_SERVICE);
        assert!(is_flowerpot_device(&props));
    }

    #[test]
    fn test_scan_options_builder() {
        let opts = ScanOptions::new().duration_secs(10).all_devices();
        assert_eq!(opts.duration, Duration::from_secs(10));
        assert!(!opts.filter_flowerpot_only);

        let opts = ScanOptions::default();
        assert_eq!(opts.duration, Duration::from_secs(5));
        assert!(opts.filter_flowerpot_only);
    }

    #[test]
    fn test_matches_identifier_by_address() {
        let addr = "AA:BB:CC:DD:EE:FF";
        assert!(matches_identifier("hci0/dev_x", addr, None, "aa:bb:cc:dd:ee:ff"));
        assert!(matches_identifier("hci0/dev_x", addr, None, "aabbccddeeff"));
        assert!(!matches_identifier("hci0/dev_x", addr, None, "aa:bb:cc:dd:ee:00"));
    }

    #[test]
    fn test_matches_identifier_ignores_null_address() {
        assert!(!matches_identifier(
            "ffd1e37e-0a9f-1881-3867-7579d66a34e5",
            "00:00:00:00:00:00",
            None,
            "000000000000"
        ));
    }

    #[test]
    fn test_matches_identifier_by_peripheral_id() {
        assert!(matches_identifier(
            "ffd1e37e-0a9f-1881-3867-7579d66a34e5",
            "00:00:00:00:00:00",
            None,
            "ffd1e37e-0a9f-1881-3867-7579d66a34e5"
        ));
    }

    #[test]
    fn test_matches_identifier_by_name_substring() {
        assert!(matches_identifier(
            "id",
            "AA:BB:CC:DD:EE:FF",
            Some("Flowerpot"),
            "flower"
        ));
        assert!(!matches_identifier("id", "AA:BB:CC:DD:EE:FF", Some("Flowerpot"), ""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_first_value() {
        let mut calls = 0;
        let found = poll_until(Duration::from_secs(5), PAIR_POLL_INTERVAL, || {
            calls += 1;
            let value = (calls == 3).then_some(calls);
            async move { Ok(value) }
        })
        .await
        .unwrap();

        assert_eq!(found, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let found: Option<u32> = poll_until(Duration::from_secs(1), PAIR_POLL_INTERVAL, || async {
            Ok(None)
        })
        .await
        .unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_hands_back_errors() {
        let result: Result<Option<u32>> =
            poll_until(Duration::from_secs(5), PAIR_POLL_INTERVAL, || async {
                Err(Error::NotConnected)
            })
            .await;

        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
