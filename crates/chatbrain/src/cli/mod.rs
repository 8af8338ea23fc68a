//! Subcommand implementations.

pub mod analyze;
pub mod config;

use chatbrain_core::{Config, ConfigError};
use std::path::Path;

/// Load `path` if given, otherwise the default config location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
