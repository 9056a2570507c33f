//! Application configuration management.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config PATH`, otherwise `config.toml` in the platform
//!    config directory)
//! 3. Environment variables prefixed `DUPELINK_` (e.g. `DUPELINK_MIN_SIZE`)
//! 4. Command-line flags
//!
//! ```toml
//! min_size = 1048576
//! exact = true
//! chmod_clear = 0o222
//! ignore_dirs = [".git", "node_modules"]
//! io_threads = 2
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of the environment layer.
pub const ENV_PREFIX: &str = "DUPELINK_";

/// Permission bits a mode may carry.
const MODE_BITS: u32 = 0o7777;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly named config file is missing
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or extracted
    #[error("invalid configuration: {0}")]
    Load(#[source] Box<figment::Error>),

    /// `io_threads` must be at least one
    #[error("io_threads must be at least 1")]
    ZeroIoThreads,

    /// `chmod_clear` carries bits that are not permission bits
    #[error("chmod_clear {0:#o} has bits outside 0o7777")]
    InvalidChmodBits(u32),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files smaller than this are never candidates.
    pub min_size: u64,
    /// Checksum rounds before full comparison (0 skips checksums).
    pub checksum_rounds: u32,
    /// Verify pairs by full comparison even when a shortcut is possible.
    pub exact: bool,
    /// Permission bits cleared on a representative after linking.
    pub chmod_clear: u32,
    /// Directory name patterns never descended into.
    pub ignore_dirs: Vec<String>,
    /// Threads used to checksum one bucket.
    pub io_threads: usize,
    /// Show progress bars.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size: 100_000,
            checksum_rounds: 1,
            exact: true,
            chmod_clear: 0o222,
            ignore_dirs: Vec::new(),
            io_threads: 4,
            progress: true,
        }
    }
}

impl Config {
    /// Load configuration from defaults, the TOML file and the environment,
    /// then apply `overrides` on top.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, a layer fails to
    /// parse, or the merged values are invalid.
    pub fn load<T: Serialize>(explicit: Option<&Path>, overrides: T) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        let figment = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides));

        Self::extract(&figment)
    }

    /// Extract and validate a configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn extract(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::ZeroIoThreads);
        }
        if self.chmod_clear & !MODE_BITS != 0 {
            return Err(ConfigError::InvalidChmodBits(self.chmod_clear));
        }
        Ok(())
    }

    /// Render as a TOML document that [`Config::load`] accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupelink", "dupelink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
