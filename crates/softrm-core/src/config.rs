//! Recycle bin configuration.
//!
//! Loaded once per invocation and threaded explicitly into the store and
//! engine constructors. A missing config file is not an error: the in-memory
//! defaults apply and the caller is told this is a first run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default retention period in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Default aggregate size cap for the holding area, in megabytes.
pub const DEFAULT_MAX_SIZE_MB: u64 = 1024;

const APP_DIR: &str = "softrm";
const CONFIG_FILE: &str = "config.json";

/// Errors loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure reading or writing the file.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file exists but is not valid configuration JSON.
    #[error("invalid configuration at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Retention must be at least one day.
    #[error("retention_days must be at least 1 (got {days})")]
    InvalidRetention { days: u32 },
}

impl ConfigError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// User preferences for the recycle bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinConfig {
    /// Version of the tool that wrote this file.
    pub version: String,
    /// Holding-area root directory.
    pub recycle_bin_path: PathBuf,
    /// Days an entry is kept before age-based eviction.
    pub retention_days: u32,
    /// Aggregate payload size cap in megabytes.
    pub max_size_mb: u64,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self::new(Self::default_bin_path())
    }
}

impl BinConfig {
    /// Create a config with defaults for everything but the bin location.
    pub fn new(recycle_bin_path: impl Into<PathBuf>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            recycle_bin_path: recycle_bin_path.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
        }
    }

    /// Platform configuration directory for softrm.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(APP_DIR)
    }

    /// Path of the configuration file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    /// Platform default location of the holding area.
    pub fn default_bin_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(APP_DIR)
            .join("recycle-bin")
    }

    /// Load from the default location.
    ///
    /// Returns the config and whether a config file actually existed; when it
    /// did not, the defaults are returned and the caller may run first-time
    /// setup.
    pub fn load() -> Result<(Self, bool), ConfigError> {
        match Self::load_from(&Self::config_path())? {
            Some(config) => Ok((config, true)),
            None => Ok((Self::default(), false)),
        }
    }

    /// Load from an explicit path. A missing file yields `None`, not an error.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::io(path, e)),
        };

        let config: Self = serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Save to the default location, creating the config directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let data = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(|e| ConfigError::io(path, e))
    }

    /// Size cap in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_days < 1 {
            return Err(ConfigError::InvalidRetention {
                days: self.retention_days,
            });
        }
        Ok(())
    }
}
