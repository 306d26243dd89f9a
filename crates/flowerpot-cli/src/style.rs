//! Visual styling utilities for the CLI.
//!
//! This module provides consistent styling across all CLI output including:
//! - Spinners for long-running operations
//! - Level and verdict colours
//! - Progress bars for metric values (Rich mode)
//! - Table formatting

use std::time::Duration;

use flowerpot_core::{Level, Verdict};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::cli::StyleMode;

// ============================================================================
// Progress Indicators (Spinners)
// ============================================================================

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

/// Width of the metric progress bar in cells
const BAR_WIDTH: usize = 10;

/// Get the standard spinner style.
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .expect("valid template")
        .tick_chars(SPINNER_TICK_CHARS)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for scanning operations.
pub fn scanning_spinner(timeout_secs: u64) -> ProgressBar {
    spinner(format!("Scanning for flowerpots... ({}s)", timeout_secs))
}

/// Create a spinner for connecting to a device.
pub fn connecting_spinner(device: &str) -> ProgressBar {
    spinner(format!("Connecting to {}...", device))
}

// ============================================================================
// Level and Verdict Labels
// ============================================================================

/// Display label for a metric level.
pub fn level_label(level: Level) -> &'static str {
    match level {
        Level::Low => "Low",
        Level::Ok => "OK",
        Level::High => "High",
    }
}

/// Display label for a verdict.
pub fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Healthy => "Healthy",
        Verdict::Unhealthy => "Unhealthy",
    }
}

/// Format a level label: green OK, cyan Low, orange High.
pub fn format_level_colored(level: Level, no_color: bool) -> String {
    let label = level_label(level);
    if no_color {
        return format!("[{}]", label);
    }

    match level {
        Level::Ok => format!("[{}]", label.green()),
        Level::Low => format!("[{}]", label.cyan()),
        // Orange color (RGB: 255, 165, 0)
        Level::High => format!("[{}]", label.truecolor(255, 165, 0)),
    }
}

/// Format the verdict as a badge.
pub fn format_verdict_colored(verdict: Verdict, no_color: bool) -> String {
    let label = verdict_label(verdict);
    if no_color {
        return label.to_string();
    }

    match verdict {
        Verdict::Healthy => format!("{}", label.green().bold()),
        Verdict::Unhealthy => format!("{}", label.red().bold()),
    }
}

// ============================================================================
// Progress Bars
// ============================================================================

/// Render a 0-100 progress value as a bar, coloured by level.
pub fn format_progress_bar(progress: u8, level: Level, no_color: bool) -> String {
    let filled = (usize::from(progress.min(100)) * BAR_WIDTH + 50) / 100;
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));

    if no_color {
        bar
    } else {
        match level {
            Level::Ok => format!("{}", bar.green()),
            Level::Low => format!("{}", bar.cyan()),
            Level::High => format!("{}", bar.truecolor(255, 165, 0)),
        }
    }
}

// ============================================================================
// Signal Strength Bar
// ============================================================================

/// Format RSSI as a visual signal bar.
/// RSSI typically ranges from -100 dBm (weak) to -30 dBm (strong).
pub fn format_signal_bar(rssi: Option<i16>, no_color: bool) -> String {
    let Some(rssi) = rssi else {
        return "N/A".to_string();
    };

    // -30 dBm = excellent (10), -100 dBm = very weak (0)
    let strength = ((rssi + 100).clamp(0, 70) as f32 / 7.0).round() as usize;
    let filled = strength.min(10);
    let empty = 10 - filled;

    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));

    if no_color {
        format!("{} {:>3}", bar, rssi)
    } else if filled >= 7 {
        format!("{} {:>3}", bar.green(), rssi)
    } else if filled >= 4 {
        format!("{} {:>3}", bar.yellow(), rssi)
    } else {
        format!("{} {:>3}", bar.red(), rssi)
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Format a success message.
pub fn format_success(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[OK] {}", message)
    } else {
        format!("{} {}", "[OK]".green(), message)
    }
}

/// Format a warning message.
pub fn format_warning(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[!!] {}", message)
    } else {
        format!("{} {}", "[!!]".yellow(), message)
    }
}

/// Get trend indicator for integer values.
pub fn trend_indicator(current: i32, previous: i32, no_color: bool) -> &'static str {
    let diff = current - previous;
    if diff == 0 {
        "-"
    } else if diff > 0 {
        if no_color { "^" } else { "↑" }
    } else if no_color {
        "v"
    } else {
        "↓"
    }
}

/// Format a title header.
pub fn format_title(title: &str, no_color: bool) -> String {
    let underline = "━".repeat(title.chars().count());
    if no_color {
        format!("{}\n{}", title, underline)
    } else {
        format!("{}\n{}", title.bold(), underline.dimmed())
    }
}

/// Apply table style based on StyleMode.
pub fn apply_table_style(table: &mut tabled::Table, style: StyleMode) {
    use tabled::settings::Style;
    match style {
        StyleMode::Rich | StyleMode::Minimal => {
            table.with(Style::rounded());
        }
        StyleMode::Plain => {
            table.with(Style::blank());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_labels() {
        assert_eq!(level_label(Level::Low), "Low");
        assert_eq!(level_label(Level::Ok), "OK");
        assert_eq!(level_label(Level::High), "High");
    }

    #[test]
    fn test_format_level_no_color() {
        assert_eq!(format_level_colored(Level::Ok, true), "[OK]");
        assert_eq!(format_level_colored(Level::High, true), "[High]");
    }

    #[test]
    fn test_format_verdict_no_color() {
        assert_eq!(format_verdict_colored(Verdict::Healthy, true), "Healthy");
        assert_eq!(format_verdict_colored(Verdict::Unhealthy, true), "Unhealthy");
    }

    #[test]
    fn test_progress_bar_fill() {
        assert_eq!(format_progress_bar(0, Level::Low, true), "░░░░░░░░░░");
        assert_eq!(format_progress_bar(100, Level::High, true), "██████████");
        assert_eq!(format_progress_bar(85, Level::Ok, true), "█████████░");
        assert_eq!(format_progress_bar(44, Level::Ok, true), "████░░░░░░");
    }

    #[test]
    fn test_signal_bar() {
        assert_eq!(format_signal_bar(None, true), "N/A");
        assert_eq!(format_signal_bar(Some(-30), true), "██████████ -30");
        assert_eq!(format_signal_bar(Some(-100), true), "░░░░░░░░░░ -100");
    }

    #[test]
    fn test_format_messages_no_color() {
        assert_eq!(format_success("Paired", true), "[OK] Paired");
        assert_eq!(format_warning("Connection lost", true), "[!!] Connection lost");
    }

    #[test]
    fn test_trend_indicator() {
        assert_eq!(trend_indicator(5, 5, true), "-");
        assert_eq!(trend_indicator(6, 5, true), "^");
        assert_eq!(trend_indicator(4, 5, true), "v");
        assert_eq!(trend_indicator(6, 5, false), "↑");
    }

    #[test]
    fn test_format_title_no_color() {
        assert_eq!(format_title("Basil", true), "Basil\n━━━━━");
    }
}
