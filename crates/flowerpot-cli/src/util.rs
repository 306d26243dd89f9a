//! Utility functions for CLI operations.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use flowerpot_core::{
    ConnectionConfig, ConnectionFailureReason, Device, DeviceNotFoundReason, Error, FindProgress,
    ProgressCallback, ScanOptions, SoilCalibration, find_device_with_progress, scan,
};
use indicatif::ProgressBar;

use crate::config::{Config, get_device_source, print_device_source_feedback, update_last_device};
use crate::style;

const NO_DEVICE_HELP: &str = "No device specified. Use --device <ADDRESS>, set FLOWERPOT_DEVICE, \
     or run 'flowerpot pair' to remember the nearest flowerpot.";

/// Resolve the device to talk to, scanning and prompting interactively if
/// neither the command line nor the config file names one.
pub async fn require_device_interactive(
    device: Option<String>,
    config: &Config,
    quiet: bool,
) -> Result<String> {
    if let Some((identifier, source)) = get_device_source(device.as_deref(), config) {
        print_device_source_feedback(&identifier, source, quiet);
        return Ok(identifier);
    }

    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!("{}\nRun 'flowerpot scan' to find nearby devices.", NO_DEVICE_HELP);
    }

    eprintln!("No device specified. Scanning for nearby flowerpots...");

    let options = ScanOptions::new().duration_secs(5);
    let devices = scan::scan_with_options(options)
        .await
        .map_err(|e| anyhow::anyhow!(describe_error(&e)))
        .context("Failed to scan for devices")?;

    if devices.is_empty() {
        bail!(
            "No flowerpots found nearby.\n\
             Make sure the flowerpot is powered on and in range."
        );
    }

    if devices.len() == 1 {
        let dev = &devices[0];
        let name = dev.name.as_deref().unwrap_or("Unknown");
        eprintln!("Found 1 device: {} ({})", name, dev.identifier);
        return Ok(dev.identifier.clone());
    }

    let items: Vec<String> = devices
        .iter()
        .map(|d| {
            let name = config
                .name_for(&d.identifier)
                .or(d.name.as_deref())
                .unwrap_or("Unknown");
            format!("{} ({})", name, d.identifier)
        })
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a flowerpot")
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to get user selection")?;

    Ok(devices[selection].identifier.clone())
}

/// One-line user-facing description of a core error.
pub fn describe_error(error: &Error) -> String {
    match error {
        Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter)
        | Error::ConnectionFailed {
            reason: ConnectionFailureReason::AdapterUnavailable,
            ..
        } => "Bluetooth unavailable - please enable Bluetooth".to_string(),
        other => other.to_string(),
    }
}

/// Wrap a core error with a user-facing message.
///
/// The core error stays in the chain so callers can `downcast_ref` it.
fn failure_message(headline: String, error: Error, causes: &[&str]) -> anyhow::Error {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut message = format!("{}\n\nCause: {}", headline, describe_error(&error));
    if !causes.is_empty() {
        message.push_str("\n\nPossible causes:");
        for cause in causes {
            message.push_str("\n  - ");
            message.push_str(cause);
        }
    }
    message.push_str(&format!("\n\nTime: {}", timestamp));
    anyhow::Error::new(error).context(message)
}

/// Connect to a device with optional progress display.
pub async fn connect_device_with_progress(
    identifier: &str,
    timeout: Duration,
    show_progress: bool,
    calibration: SoilCalibration,
) -> Result<Device> {
    let spinner: Option<Arc<ProgressBar>> = if show_progress && io::stderr().is_terminal() {
        Some(Arc::new(style::connecting_spinner(identifier)))
    } else {
        None
    };

    let spinner_clone = spinner.clone();
    let progress_callback: Option<ProgressCallback> = if show_progress {
        Some(Box::new(move |progress: FindProgress| {
            if let Some(ref sp) = spinner_clone {
                sp.set_message(progress_message(&progress));
            }
        }))
    } else {
        None
    };

    let options = ScanOptions::new().duration(timeout).all_devices();
    let result = find_device_with_progress(identifier, options, progress_callback).await;

    if let Some(ref sp) = spinner {
        match &result {
            Ok(_) => sp.set_message("Connecting...".to_string()),
            Err(_) => sp.finish_and_clear(),
        }
    }

    let (adapter, peripheral) = result.map_err(|e| {
        failure_message(
            format!("Failed to find device: {}", identifier),
            e,
            &[
                "Bluetooth may be disabled -- check system settings",
                "Device may be out of range -- try moving closer",
                "Device may be connected to another host",
                "Device address may be incorrect -- run 'flowerpot scan' to verify",
            ],
        )
    })?;

    let config = ConnectionConfig::new().connection_timeout(timeout);
    let device = Device::from_peripheral_with_config(adapter, peripheral, config)
        .await
        .map_err(|e| {
            if let Some(ref sp) = spinner {
                sp.finish_and_clear();
            }
            failure_message(
                format!("Failed to connect to device: {}", identifier),
                e,
                &[
                    "Device may have gone out of range",
                    "Device may be connected to another host",
                    "Bluetooth connection was interrupted",
                ],
            )
        })?
        .with_calibration(calibration);

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    // Convenience only; a read-only config dir must not fail the command
    let device_name = device.name().map(|s| s.to_string());
    if let Err(e) = update_last_device(device.address(), device_name.as_deref()) {
        tracing::debug!("Could not remember last device: {}", e);
    }

    Ok(device)
}

fn progress_message(progress: &FindProgress) -> String {
    match *progress {
        FindProgress::CacheHit => "Found device (cached)".to_string(),
        FindProgress::ScanAttempt {
            attempt,
            total,
            duration_secs,
        } => format!(
            "Scanning... (attempt {}/{}, {}s)",
            attempt, total, duration_secs
        ),
        FindProgress::Found { attempt } if attempt > 1 => {
            format!("Found on attempt {}", attempt)
        }
        FindProgress::Found { .. } => "Found device".to_string(),
        FindProgress::RetryNeeded { attempt } => {
            format!("Not found, retrying... (attempt {})", attempt + 1)
        }
    }
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Append output to a file, or print to stdout.
/// Used by streaming commands so earlier lines are kept.
pub fn append_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_error_no_adapter() {
        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter);
        assert_eq!(
            describe_error(&err),
            "Bluetooth unavailable - please enable Bluetooth"
        );

        let err = Error::connection_failed(None, ConnectionFailureReason::AdapterUnavailable);
        assert!(describe_error(&err).starts_with("Bluetooth unavailable"));
    }

    #[test]
    fn test_describe_error_passthrough() {
        let err = Error::device_not_found("basil");
        assert_eq!(describe_error(&err), "Device not found: device 'basil' not found");
    }

    #[test]
    fn test_failure_message_lists_causes() {
        let err = Error::NotConnected;
        let msg = failure_message("Failed".to_string(), err, &["first", "second"]).to_string();
        assert!(msg.starts_with("Failed\n\nCause: Not connected to device"));
        assert!(msg.contains("Possible causes:\n  - first\n  - second"));
        assert!(msg.contains("Time: "));
    }

    #[test]
    fn test_failure_message_keeps_core_error() {
        let err = failure_message("Failed".to_string(), Error::device_not_found("basil"), &[]);
        let core = err.downcast_ref::<Error>().unwrap();
        assert!(matches!(core, Error::DeviceNotFound(_)));
    }

    #[test]
    fn test_progress_messages() {
        assert_eq!(
            progress_message(&FindProgress::ScanAttempt {
                attempt: 2,
                total: 3,
                duration_secs: 10
            }),
            "Scanning... (attempt 2/3, 10s)"
        );
        assert_eq!(progress_message(&FindProgress::Found { attempt: 1 }), "Found device");
        assert_eq!(
            progress_message(&FindProgress::Found { attempt: 3 }),
            "Found on attempt 3"
        );
    }

    #[tokio::test]
    async fn test_require_device_uses_config_default() {
        let config = Config {
            device: Some("basil".to_string()),
            ..Default::default()
        };
        let device = require_device_interactive(None, &config, true).await.unwrap();
        assert_eq!(device, "basil");
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_append_output_keeps_earlier_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.csv");
        append_output(Some(&path), "a\n").unwrap();
        append_output(Some(&path), "b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
