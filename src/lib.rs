//! Per-asset energy demand reporting, split by carrier and offset by on-site output.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod catalog;
pub mod cli;
pub mod demand;
pub mod id;
pub mod input;
pub mod log;
pub mod reduction;
pub mod report;
pub mod settings;
pub mod snapshot;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which the program's config files are stored
pub fn get_config_dir() -> PathBuf {
    // Fall back to the current directory on platforms without a config dir
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("energy-offset");
    path
}
