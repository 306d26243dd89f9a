//! Info command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use flowerpot_core::Device;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{
    DeviceDetails, FormatOptions, format_info_csv, format_info_json, format_info_text,
};
use crate::util::{connect_device_with_progress, require_device_interactive, write_output};

pub async fn cmd_info(
    device: Option<String>,
    timeout: Duration,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
    config: &Config,
) -> Result<()> {
    let identifier = require_device_interactive(device, config, quiet).await?;

    let show_progress = !quiet && matches!(format, OutputFormat::Text);
    let device =
        connect_device_with_progress(&identifier, timeout, show_progress, config.calibration)
            .await?;

    let details = gather_details(&device).await;
    device.disconnect().await.ok();

    let content = match format {
        OutputFormat::Json => format_info_json(&details, opts)?,
        OutputFormat::Text => format_info_text(&details, opts),
        OutputFormat::Csv => format_info_csv(&details, opts),
    };

    write_output(output, &content)
}

/// Optional fields are left empty when the device does not expose them.
async fn gather_details(device: &Device) -> DeviceDetails {
    let manufacturer = match device.read_manufacturer().await {
        Ok(name) => Some(name),
        Err(e) => {
            debug!("Manufacturer name unavailable: {}", e);
            None
        }
    };
    let rssi = device.read_rssi().await.ok();

    DeviceDetails {
        name: device.name().map(str::to_string),
        address: device.address().to_string(),
        manufacturer,
        rssi,
        characteristics: device.characteristics().await,
    }
}
