//! Name command implementation.
//!
//! Display names map a friendly name such as "basil" to a device address.
//! Every command that takes `--device` accepts a display name too.

use anyhow::{Result, bail};
use tabled::builder::Builder;

use crate::cli::{NameSubcommand, StyleMode};
use crate::config::Config;
use crate::style;

/// What a `name` action changed.
#[derive(Debug, PartialEq, Eq)]
enum NameChange {
    Added,
    Updated,
    Removed,
}

pub fn cmd_name(action: NameSubcommand, quiet: bool, style_mode: StyleMode) -> Result<()> {
    if let NameSubcommand::List = action {
        let config = Config::load();
        if config.names.is_empty() {
            if !quiet {
                println!("No display names configured.");
                println!();
                println!("Add one with: flowerpot name set <name> <address>");
            }
        } else {
            println!("{}", names_table(&config, style_mode));
        }
        return Ok(());
    }

    let change = Config::update_at(&Config::path(), |config| apply(config, &action))?;

    if !quiet {
        match (&action, change) {
            (NameSubcommand::Set { name, address }, NameChange::Added) => {
                println!("Added display name '{}' → {}", name, address);
            }
            (NameSubcommand::Set { name, address }, _) => {
                println!("Updated display name '{}' → {}", name, address);
            }
            (NameSubcommand::Remove { name }, _) => {
                println!("Removed display name '{}'", name);
            }
            (NameSubcommand::List, _) => {}
        }
    }

    Ok(())
}

fn names_table(config: &Config, style_mode: StyleMode) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Name", "Device Address"]);
    for (name, address) in &config.names {
        builder.push_record([name.as_str(), address.as_str()]);
    }
    let mut table = builder.build();
    style::apply_table_style(&mut table, style_mode);
    table.to_string()
}

fn apply(config: &mut Config, action: &NameSubcommand) -> Result<NameChange> {
    match action {
        NameSubcommand::List => bail!("list does not modify display names"),
        NameSubcommand::Set { name, address } => {
            if looks_like_address(name) {
                bail!(
                    "Display name '{}' looks like a device address. \
                     Use a friendly name instead (e.g., 'basil', 'kitchen-fern').",
                    name
                );
            }
            let previous = config.names.insert(name.clone(), address.clone());
            Ok(if previous.is_some() {
                NameChange::Updated
            } else {
                NameChange::Added
            })
        }
        NameSubcommand::Remove { name } => {
            if config.names.remove(name).is_none() {
                bail!("Display name '{}' not found", name);
            }
            Ok(NameChange::Removed)
        }
    }
}

/// Check if a string looks like a device address (MAC or UUID).
fn looks_like_address(s: &str) -> bool {
    // XX:XX:XX:XX:XX:XX or XX-XX-XX-XX-XX-XX
    let mac_pattern = s.chars().filter(|c| *c == ':' || *c == '-').count() >= 5
        && s.chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '-');

    // macOS peripheral UUIDs
    let uuid_pattern = s.len() >= 32 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-');

    mac_pattern || uuid_pattern
}
