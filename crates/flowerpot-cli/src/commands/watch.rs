//! Watch command implementation.
//!
//! Subscribes to reading notifications instead of polling. When the stream
//! ends because the device went away, the command reconnects with
//! exponential backoff and subscribes again.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use flowerpot_core::{Device, DeviceNotFoundReason, Error, ReadingStream, Thresholds};
use flowerpot_types::SensorReading;
use futures::StreamExt;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{
    FormatOptions, format_reading_json, format_watch_csv_header, format_watch_csv_line,
    format_watch_line,
};
use crate::style;
use crate::util::{append_output, connect_device_with_progress, require_device_interactive};

/// Minimum backoff delay for reconnection attempts
const MIN_BACKOFF_SECS: u64 = 2;
/// Maximum backoff delay for reconnection attempts
const MAX_BACKOFF_SECS: u64 = 300; // 5 minutes

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub device: Option<String>,
    pub count: u32,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
    pub config: &'a Config,
}

/// Why a subscription stopped delivering readings.
#[derive(Debug, PartialEq, Eq)]
enum StreamEnd {
    /// The requested number of readings was printed.
    Completed,
    /// The notification stream closed underneath us.
    Lost,
    /// Ctrl+C.
    Interrupted,
}

/// Renders readings for one watch session, tracking CSV header and trends.
struct WatchPrinter<'a> {
    format: OutputFormat,
    opts: &'a FormatOptions,
    thresholds: Thresholds,
    device: Option<String>,
    header_written: bool,
    previous: Option<SensorReading>,
    /// Readings rendered so far.
    rendered: u64,
}

impl<'a> WatchPrinter<'a> {
    fn new(format: OutputFormat, opts: &'a FormatOptions, thresholds: Thresholds) -> Self {
        Self {
            format,
            opts,
            thresholds,
            device: None,
            header_written: opts.no_header,
            previous: None,
            rendered: 0,
        }
    }

    fn render(&mut self, reading: &SensorReading) -> Result<String> {
        let assessment = self.thresholds.evaluate(reading);
        let content = match self.format {
            OutputFormat::Json => {
                let opts = self.opts.with_compact(true);
                format_reading_json(reading, &assessment, &opts, self.device.as_deref())?
            }
            OutputFormat::Csv => {
                let mut out = String::new();
                if !self.header_written {
                    out.push_str(&format_watch_csv_header());
                    self.header_written = true;
                }
                out.push_str(&format_watch_csv_line(reading, &assessment));
                out
            }
            OutputFormat::Text => {
                format_watch_line(reading, &assessment, self.previous.as_ref(), self.opts)
            }
        };
        self.previous = Some(*reading);
        self.rendered += 1;
        Ok(content)
    }
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        device,
        count,
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

    let mut printer = WatchPrinter::new(format, opts, thresholds);
    let mut remaining = (count > 0).then_some(count);
    let mut backoff_secs = MIN_BACKOFF_SECS;
    let mut connected_once = false;
    let mut emit = |content: &str| append_output(output, content);

    loop {
        let device =
            match connect_device_with_progress(&identifier, timeout, false, calibration).await {
                Ok(d) => d,
                Err(e) => {
                    if !should_retry(&e, connected_once) {
                        return Err(e);
                    }
                    eprintln!("{}", e);
                    if !wait_backoff(&mut backoff_secs, opts.no_color).await {
                        eprintln!("\nShutting down...");
                        return Ok(());
                    }
                    continue;
                }
            };

        let label = config
            .name_for(device.address())
            .or(device.name())
            .unwrap_or("Unknown")
            .to_string();
        printer.device = Some(label.clone());

        if !connected_once && !quiet {
            let header = if opts.no_color {
                format!("Watching: {} ({})", label, identifier)
            } else {
                format!("Watching: {} ({})", label.green(), identifier.cyan())
            };
            eprintln!("{}", header);
            match remaining {
                Some(n) => eprintln!("Count: {} | Press Ctrl+C to stop", n),
                None => eprintln!("Press Ctrl+C to stop"),
            }
            eprintln!("{}", "-".repeat(50));
        }
        connected_once = true;

        let mut stream = match device.subscribe_readings().await {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("Subscribe failed: {}. Reconnecting...", e);
                disconnect(&device).await;
                if !wait_backoff(&mut backoff_secs, opts.no_color).await {
                    eprintln!("\nShutting down...");
                    return Ok(());
                }
                continue;
            }
        };

        let rendered_before = printer.rendered;
        let end = drain_stream(
            &mut stream,
            &mut printer,
            &mut remaining,
            &mut emit,
            tokio::signal::ctrl_c(),
        )
        .await;

        stream.close().await;
        disconnect(&device).await;

        match end? {
            StreamEnd::Completed => {
                if !quiet {
                    eprintln!("Completed {} readings.", count);
                }
                return Ok(());
            }
            StreamEnd::Interrupted => {
                eprintln!("\nShutting down...");
                return Ok(());
            }
            StreamEnd::Lost => {
                if printer.rendered > rendered_before {
                    backoff_secs = MIN_BACKOFF_SECS;
                }
                eprintln!(
                    "{}",
                    style::format_warning("Connection lost.", opts.no_color)
                );
                if !wait_backoff(&mut backoff_secs, opts.no_color).await {
                    eprintln!("\nShutting down...");
                    return Ok(());
                }
            }
        }
    }
}

/// Whether a failed connect is worth another attempt.
///
/// A device that is not found is only retried once a session has been
/// established, since it has then most likely just gone out of range.
fn should_retry(error: &anyhow::Error, connected_before: bool) -> bool {
    match error.downcast_ref::<Error>() {
        Some(e) if e.is_retryable() => true,
        Some(Error::DeviceNotFound(DeviceNotFoundReason::NotFound { .. })) => connected_before,
        _ => false,
    }
}

/// Next delay after `current`, capped at [`MAX_BACKOFF_SECS`].
fn next_backoff(current: u64) -> u64 {
    (current * 2).min(MAX_BACKOFF_SECS)
}

/// Announce and sleep the current backoff, then grow it.
/// Returns `false` if Ctrl+C arrived first.
async fn wait_backoff(backoff_secs: &mut u64, no_color: bool) -> bool {
    eprintln!(
        "{}",
        style::format_warning(&format!("Retrying in {}s...", backoff_secs), no_color)
    );
    let keep_going = sleep_or_interrupt(*backoff_secs).await;
    *backoff_secs = next_backoff(*backoff_secs);
    keep_going
}

async fn disconnect(device: &Device) {
    if let Err(e) = device.disconnect().await {
        debug!("Disconnect failed: {}", e);
    }
}

/// Sleep for the backoff delay; returns `false` if Ctrl+C arrived first.
async fn sleep_or_interrupt(secs: u64) -> bool {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => false,
        _ = tokio::time::sleep(Duration::from_secs(secs)) => true,
    }
}

/// Print readings from `stream` until it ends, `remaining` hits zero, or
/// `shutdown` resolves.
///
/// Malformed payloads are reported on stderr and skipped.
async fn drain_stream<S, T>(
    stream: &mut ReadingStream,
    printer: &mut WatchPrinter<'_>,
    remaining: &mut Option<u32>,
    emit: &mut impl FnMut(&str) -> Result<()>,
    shutdown: S,
) -> Result<StreamEnd>
where
    S: Future<Output = T>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(StreamEnd::Interrupted),
            item = stream.next() => match item {
                Some(Ok(reading)) => {
                    emit(&printer.render(&reading)?)?;
                    if let Some(n) = remaining.as_mut() {
                        *n = n.saturating_sub(1);
                        if *n == 0 {
                            return Ok(StreamEnd::Completed);
                        }
                    }
                }
                Some(Err(e)) => eprintln!("Skipping reading: {}", e),
                None => return Ok(StreamEnd::Lost),
            },
        }
    }
}
