//! Program settings, read from `settings.toml` in the user's config directory.
use crate::get_chiptrade_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::policy::{Scenario, parse_scenario};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for chiptrade.
# Every setting is commented out and shown with its default value. Uncomment a line to change it.
";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_chiptrade_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The default program log level
    pub log_level: String,
    /// Whether to overwrite output files by default
    pub overwrite: bool,
    /// Whether to write additional information to CSV files
    pub debug_model: bool,
    /// Scenarios to run when none are given on the command line (empty means all scenarios)
    pub scenarios: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            debug_model: false,
            scenarios: Vec::new(),
        }
    }
}

impl Settings {
    /// Read the program settings file, falling back to defaults if there isn't one
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// The scenarios selected in the settings file
    pub fn default_scenarios(&self) -> Result<Vec<Scenario>> {
        self.scenarios
            .iter()
            .map(|name| parse_scenario(name))
            .collect::<Result<_>>()
            .context("Invalid scenario in settings file")
    }

    /// A settings file with every field commented out, documented and set to its default
    pub fn default_file_contents() -> String {
        let defaults =
            toml::Value::try_from(Settings::default()).expect("Settings are always valid TOML");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for (field, value) in defaults.as_table().into_iter().flatten() {
            out.push('\n');
            if let Ok(docs) = Settings::get_field_docs(field) {
                for line in docs.lines() {
                    writeln!(out, "# # {}", line.trim()).unwrap();
                }
            }
            writeln!(out, "# {field} = {value}").unwrap();
        }

        out
    }
}
