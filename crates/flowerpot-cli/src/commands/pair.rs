//! Pair command implementation.
//!
//! Pairing here means "find the first flowerpot that advertises and make it
//! the default device"; there is no bonding at the BLE level.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use flowerpot_core::find_first_flowerpot;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{FormatOptions, ScanEntry};
use crate::style;
use crate::util::{describe_error, write_output};

pub async fn cmd_pair(
    timeout: u64,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    let spinner = if !quiet && matches!(format, OutputFormat::Text) {
        Some(style::scanning_spinner(timeout))
    } else {
        None
    };

    let result = find_first_flowerpot(Duration::from_secs(timeout)).await;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let found = result
        .map_err(|e| anyhow::anyhow!(describe_error(&e)))
        .context("Pairing failed. Make sure the flowerpot is powered on and nearby")?;
    let entry = ScanEntry::from(&found);

    Config::update(|config| {
        remember_paired(config, &entry);
        Ok(())
    })?;

    let content = match format {
        OutputFormat::Json => opts.as_json(&entry)?,
        OutputFormat::Csv | OutputFormat::Text => {
            let name = entry.name.as_deref().unwrap_or("flowerpot");
            let mut text = style::format_success(
                &format!("Paired with {} ({})", name, entry.identifier),
                opts.no_color,
            );
            text.push('\n');
            if !quiet {
                text.push_str("It is now the default device for read, watch, light and info.\n");
            }
            text
        }
    };

    write_output(output, &content)
}

/// Make the paired device the default and the last-used device.
fn remember_paired(config: &mut Config, entry: &ScanEntry) {
    config.device = Some(entry.identifier.clone());
    config.last_device = Some(entry.identifier.clone());
    config.last_device_name = entry.name.clone();
}
