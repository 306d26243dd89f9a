//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction, quiet: bool) -> Result<()> {
    let path = Config::path();
    match action {
        ConfigAction::Show => {
            let config = Config::load();
            print!("{}", render(&config)?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init => {
            init_at(&path)?;
            if !quiet {
                println!("Created {}", path.display());
            }
        }
    }
    Ok(())
}

fn render(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}

/// Write a default config file, refusing to overwrite an existing one.
fn init_at(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    Config::default().save_to(path)
}
