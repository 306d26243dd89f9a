//! Scan command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use flowerpot_core::{ScanOptions, scan};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{FormatOptions, ScanEntry, format_scan_csv, format_scan_json, format_scan_text};
use crate::style;
use crate::util::{describe_error, write_output};

pub async fn cmd_scan(
    timeout: u64,
    all: bool,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
    config: &Config,
) -> Result<()> {
    let spinner = if !quiet && matches!(format, OutputFormat::Text) {
        Some(style::scanning_spinner(timeout))
    } else {
        None
    };

    let options = ScanOptions::default()
        .duration_secs(timeout)
        .filter_flowerpot_only(!all);

    let result = scan::scan_with_options(options).await;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let devices = result
        .map_err(|e| anyhow::anyhow!(describe_error(&e)))
        .context("Failed to scan for devices")?;
    let entries: Vec<ScanEntry> = devices.iter().map(ScanEntry::from).collect();

    let content = match format {
        OutputFormat::Json => format_scan_json(&entries, opts, Some(&config.names))?,
        OutputFormat::Text => format_scan_text(&entries, opts, Some(&config.names), !quiet),
        OutputFormat::Csv => format_scan_csv(&entries, opts),
    };

    write_output(output, &content)
}
