//! Configuration file loading

use dbnav_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors loading the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`DbnavConfig`]
    #[error("invalid config in {path}: {source}")]
    Invalid {
        /// Config file path
        path: PathBuf,
        /// Decoder failure
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration
///
/// ```toml
/// [cache]
/// ttl_secs = 120
/// event_capacity = 16
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbnavConfig {
    /// Resource detail cache tuning
    pub cache: CacheConfig,
}

impl DbnavConfig {
    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` when unreadable, `ConfigError::Invalid` when malformed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    ///
    /// # Errors
    /// As [`DbnavConfig::load`]
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}
