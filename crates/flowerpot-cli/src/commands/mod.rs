//! Command implementations for the CLI.

mod config;
mod info;
mod light;
mod name;
mod pair;
mod read;
mod scan;
mod watch;

pub use config::cmd_config;
pub use info::cmd_info;
pub use light::{cmd_light, set_light_with};
pub use name::cmd_name;
pub use pair::cmd_pair;
pub use read::{ReadArgs, cmd_read, read_with};
pub use scan::cmd_scan;
pub use watch::{WatchArgs, cmd_watch};
