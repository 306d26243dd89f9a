//! Read command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use flowerpot_core::{Assessment, FlowerpotDevice, Thresholds};
use flowerpot_types::SensorReading;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{FormatOptions, format_reading_csv, format_reading_json, format_reading_text};
use crate::util::{connect_device_with_progress, require_device_interactive, write_output};

/// Arguments for the read command.
pub struct ReadArgs<'a> {
    pub device: Option<String>,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
    pub config: &'a Config,
}

pub async fn cmd_read(args: ReadArgs<'_>) -> Result<()> {
    let ReadArgs {
        device,
        timeout,
        format,
        output,
        quiet,
        opts,
        config,
    } = args;

    let thresholds = config.thresholds()?;
    let calibration = config.soil_calibration()?;
    let identifier = require_device_interactive(device, config, quiet).await?;

    let show_progress = !quiet && matches!(format, OutputFormat::Text);
    let device =
        connect_device_with_progress(&identifier, timeout, show_progress, calibration).await?;
    let label = config
        .name_for(device.address())
        .or(device.name())
        .map(str::to_string);

    let result = read_with(&device, &thresholds).await;
    device.disconnect().await.ok();
    let (reading, assessment) = result?;

    let content = match format {
        OutputFormat::Json => {
            format_reading_json(&reading, &assessment, opts, label.as_deref())?
        }
        OutputFormat::Text => format_reading_text(&reading, &assessment, opts, label.as_deref()),
        OutputFormat::Csv => format_reading_csv(&reading, &assessment, opts),
    };

    write_output(output, &content)
}

/// Take one reading and classify it.
pub async fn read_with<D: FlowerpotDevice>(
    device: &D,
    thresholds: &Thresholds,
) -> Result<(SensorReading, Assessment)> {
    let reading = device
        .read_current()
        .await
        .context("Failed to read current values")?;
    let assessment = thresholds.evaluate(&reading);
    Ok((reading, assessment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowerpot_core::{Band, Level, MockDeviceBuilder, ThresholdConfig, Verdict};

    #[tokio::test]
    async fn test_read_with_default_mock() {
        let device = MockDeviceBuilder::new().build();
        let (reading, assessment) = read_with(&device, &Thresholds::default()).await.unwrap();

        assert_eq!(reading.temperature, 22);
        assert_eq!(reading.fertility, 68);
        assert_eq!(assessment.humidity.level, Level::Low);
        assert_eq!(assessment.verdict, Verdict::Healthy);
    }

    #[tokio::test]
    async fn test_read_with_custom_thresholds() {
        let device = MockDeviceBuilder::new().temperature(24.4).build();
        let config = ThresholdConfig {
            temperature: Band::new(10, 20),
            ..Default::default()
        };
        let (_, assessment) = read_with(&device, &Thresholds::new(config)).await.unwrap();

        assert_eq!(assessment.temperature.value, 24);
        assert_eq!(assessment.temperature.level, Level::High);
        assert_eq!(assessment.temperature.progress, 100);
        assert_eq!(assessment.verdict, Verdict::Unhealthy);
    }

    #[tokio::test]
    async fn test_read_with_disconnected_device_fails() {
        let device = MockDeviceBuilder::new().auto_connect(false).build();
        let err = read_with(&device, &Thresholds::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read current values"));
    }
}
