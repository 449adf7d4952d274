//! Common functionality for chiptrade, a simulator of semiconductor trade under alternative
//! trade-policy regimes.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod input;
pub mod log;
pub mod maps;
pub mod model;
pub mod output;
pub mod policy;
pub mod region;
pub mod scenario;
pub mod settings;
pub mod simulation;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This will be something like `~/.config/chiptrade` on Linux.
pub fn get_chiptrade_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No sensible place to put config files, so use the current directory
        return PathBuf::default();
    };

    config_dir.push("chiptrade");
    config_dir
}
