use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use flowerpot_cli::cli::{Cli, Commands, DeviceArgs, FormatArgs, OutputFormat};
use flowerpot_cli::commands::{
    ReadArgs, WatchArgs, cmd_config, cmd_info, cmd_light, cmd_name, cmd_pair, cmd_read,
    cmd_scan, cmd_watch,
};
use flowerpot_cli::config::{Config, resolve_timeout};
use flowerpot_cli::format::FormatOptions;

/// Default connection timeout in seconds, matching `DeviceArgs`.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "flowerpot", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();
    let no_color = cli.no_color || config.no_color;
    let base_opts = FormatOptions::new(no_color, cli.style).with_compact(cli.compact);
    let output = cli.output.as_ref();
    let quiet = cli.quiet;

    let resolve_format = |args: Option<&FormatArgs>| -> OutputFormat {
        if cli.json {
            return OutputFormat::Json;
        }
        args.and_then(|a| a.format)
            .or_else(|| config.format.as_deref().and_then(OutputFormat::from_config))
            .unwrap_or_default()
    };
    let opts_for = |args: &FormatArgs| base_opts.with_no_header(args.no_header);
    let timeout_for = |args: &DeviceArgs| {
        Duration::from_secs(resolve_timeout(args.timeout, &config, DEFAULT_TIMEOUT_SECS))
    };

    match cli.command {
        Commands::Scan {
            timeout,
            output: ref format_args,
            all,
        } => {
            let format = resolve_format(Some(format_args));
            let opts = opts_for(format_args);
            cmd_scan(timeout, all, format, output, quiet, &opts, &config).await?;
        }
        Commands::Pair { timeout } => {
            let format = resolve_format(None);
            cmd_pair(timeout, format, output, quiet, &base_opts).await?;
        }
        Commands::Read {
            ref device,
            output: ref format_args,
        } => {
            let opts = opts_for(format_args);
            cmd_read(ReadArgs {
                device: device.device.clone(),
                timeout: timeout_for(device),
                format: resolve_format(Some(format_args)),
                output,
                quiet,
                opts: &opts,
                config: &config,
            })
            .await?;
        }
        Commands::Watch {
            ref device,
            output: ref format_args,
            count,
        } => {
            let opts = opts_for(format_args);
            cmd_watch(WatchArgs {
                device: device.device.clone(),
                count,
                timeout: timeout_for(device),
                format: resolve_format(Some(format_args)),
                output,
                quiet,
                opts: &opts,
                config: &config,
            })
            .await?;
        }
        Commands::Light { ref device, state } => {
            cmd_light(
                device.device.clone(),
                timeout_for(device),
                state.is_on(),
                quiet,
                base_opts.no_color,
                &config,
            )
            .await?;
        }
        Commands::Info {
            ref device,
            output: ref format_args,
        } => {
            let opts = opts_for(format_args);
            cmd_info(
                device.device.clone(),
                timeout_for(device),
                resolve_format(Some(format_args)),
                output,
                quiet,
                &opts,
                &config,
            )
            .await?;
        }
        Commands::Name { ref action } => {
            cmd_name(action.clone(), quiet, cli.style)?;
        }
        Commands::Config { action } => {
            cmd_config(action, quiet)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
