//! Configuration management for packrat.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "packrat";

/// Highest gzip compression level.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PACKRAT_`)
/// 2. TOML config file at `~/.config/packrat/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Archive configuration.
    pub archive: ArchiveConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

/// Archive-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Overwrite destinations that already exist.
    pub override_existing: bool,
    /// Gzip compression level, 0 (none) to 9 (best).
    pub compression_level: u32,
    /// Archive the targets of symlinks instead of the links themselves.
    pub follow_symlinks: bool,
    /// Regexes matched against archive-relative paths; matches are left out.
    pub exclude_patterns: Vec<String>,
}

/// Output-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print the run report as JSON.
    pub json: bool,
    /// Exit non-zero when any entry failed.
    pub strict: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            override_existing: false,
            compression_level: 6,
            follow_symlinks: false,
            exclude_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// A config file that does not exist contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PACKRAT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.archive.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(Error::ConfigValidation {
                message: format!(
                    "compression_level ({}) must be between 0 and {MAX_COMPRESSION_LEVEL}",
                    self.archive.compression_level
                ),
            });
        }

        for pattern in &self.archive.exclude_patterns {
            if regex::Regex::new(pattern).is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid exclude pattern: {pattern}"),
                });
            }
        }

        Ok(())
    }

    /// Fold command-line switches into the loaded configuration.
    ///
    /// Flags can only turn a setting on.
    #[must_use]
    pub fn with_flags(mut self, override_existing: bool, json: bool, strict: bool) -> Self {
        self.archive.override_existing |= override_existing;
        self.output.json |= json;
        self.output.strict |= strict;
        self
    }
}
