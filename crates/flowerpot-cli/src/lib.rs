//! Command-line interface for the smart flowerpot BLE sensor.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan for nearby flowerpots |
//! | `pair` | Remember the first flowerpot in range as the default device |
//! | `read` | Read current values and plant health |
//! | `watch` | Follow live readings from notifications |
//! | `light` | Switch the onboard light on or off |
//! | `info` | Display device information and characteristics |
//! | `name` | Manage display names for devices |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Output Formats
//!
//! - **Text** (default): Human-readable output; `--style` picks rich, minimal or plain
//! - **JSON**: Machine-readable JSON (`--json` or `--format json`)
//! - **CSV**: Comma-separated values for spreadsheets and logging
//!
//! # Configuration
//!
//! The CLI stores configuration in `~/.config/flowerpot/config.toml` (or platform
//! equivalent). Besides the default device and output preferences it holds the
//! plant-health bands under `[thresholds]` and the soil probe's calibration
//! points under `[calibration]`.
//!
//! # Environment Variables
//!
//! - `FLOWERPOT_DEVICE`: Default device (overridden by `--device`)
//! - `FLOWERPOT_STYLE`: Default visual style
//! - `NO_COLOR`: Disable colored output when set
//! - `RUST_LOG`: Log filter when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```bash
//! flowerpot pair
//! flowerpot read
//! flowerpot watch --format csv --output basil.csv
//! flowerpot light on --device basil
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod style;
pub mod util;

pub use flowerpot_core;
pub use flowerpot_types;
