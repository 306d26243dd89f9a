//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse a format name from the config file.
    pub fn from_config(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

/// Visual styling mode for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StyleMode {
    /// Standard styling with colors
    Minimal,
    /// Progress bars, tables and full formatting (default)
    #[default]
    Rich,
    /// Plain text with no decorations (for scripting)
    Plain,
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device address, name or nickname, or use FLOWERPOT_DEVICE env var
    #[arg(short, long, env = "FLOWERPOT_DEVICE")]
    pub device: Option<String>,

    /// Connection timeout in seconds
    #[arg(short = 'T', long, default_value = "15")]
    pub timeout: u64,
}

/// Reusable output format argument
#[derive(Debug, Clone, Args)]
pub struct FormatArgs {
    /// Output format (defaults to the config file's `format`, then text)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Omit header row in CSV output (useful for appending)
    #[arg(long)]
    pub no_header: bool,
}

#[derive(Parser)]
#[command(name = "flowerpot")]
#[command(author, version, about = "CLI for the smart flowerpot BLE sensor", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON (shorthand for --format json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Visual styling mode (minimal, rich, plain)
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "rich",
        env = "FLOWERPOT_STYLE"
    )]
    pub style: StyleMode,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby flowerpots
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        #[command(flatten)]
        output: FormatArgs,

        /// List every BLE device, not only flowerpots
        #[arg(short, long)]
        all: bool,
    },

    /// Find the first flowerpot in range and remember it as the default device
    Pair {
        /// How long to look for a flowerpot, in seconds
        #[arg(short, long, default_value = "15")]
        timeout: u64,
    },

    /// Read current sensor values and plant health
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: FormatArgs,
    },

    /// Continuously monitor a device through notifications
    Watch {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: FormatArgs,

        /// Number of readings to take before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,
    },

    /// Switch the onboard light
    Light {
        #[command(flatten)]
        device: DeviceArgs,

        /// Desired light state
        #[arg(value_enum)]
        state: LightArg,
    },

    /// Display device information and characteristics
    Info {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: FormatArgs,
    },

    /// Manage device display names
    Name {
        #[command(subcommand)]
        action: NameSubcommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Light states accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightArg {
    On,
    Off,
}

impl LightArg {
    pub fn is_on(self) -> bool {
        self == LightArg::On
    }
}

/// Display-name subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum NameSubcommand {
    /// List all display names
    List,

    /// Set a display name for a device
    Set {
        /// Friendly name for the device (e.g., "basil", "kitchen-fern")
        name: String,

        /// Device address (MAC address or UUID)
        address: String,
    },

    /// Remove a display name
    #[command(alias = "rm")]
    Remove {
        /// Display name to remove
        name: String,
    },
}

/// Configuration subcommands
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_light_on() {
        let cli = Cli::try_parse_from(["flowerpot", "light", "on", "--device", "basil"]).unwrap();
        match cli.command {
            Commands::Light { device, state } => {
                assert!(state.is_on());
                assert_eq!(device.device.as_deref(), Some("basil"));
            }
            _ => panic!("expected light command"),
        }
    }

    #[test]
    fn test_parse_light_rejects_unknown_state() {
        assert!(Cli::try_parse_from(["flowerpot", "light", "dim"]).is_err());
    }

    #[test]
    fn test_parse_watch_count_and_format() {
        let cli =
            Cli::try_parse_from(["flowerpot", "watch", "-n", "3", "--format", "csv"]).unwrap();
        match cli.command {
            Commands::Watch { count, output, .. } => {
                assert_eq!(count, 3);
                assert_eq!(output.format, Some(OutputFormat::Csv));
            }
            _ => panic!("expected watch command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["flowerpot", "scan", "--json", "--quiet"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config("CSV"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_config("xml"), None);
    }
}
