//! Configuration types for jbod-net
//!
//! Both binaries read an optional TOML file into these structures; command
//! line flags override individual fields afterwards.
//!
//! ```toml
//! [remote]
//! address = "127.0.0.1"
//! port = 3333
//!
//! [cache]
//! entries = 1024
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use crate::layout::{MAX_CACHE_ENTRIES, MIN_CACHE_ENTRIES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for the client
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote disk-array endpoint
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Block cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, or the defaults if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check field ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()
    }
}

/// Where the disk-array service listens
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Host name or IP address
    #[serde(default = "default_address")]
    pub address: String,
    /// TCP port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

/// Block cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of cached blocks; 0 disables the cache
    #[serde(default = "default_cache_entries")]
    pub entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entries: default_cache_entries(),
        }
    }
}

impl CacheConfig {
    /// True if a cache should be created at all
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.entries != 0
    }

    /// Reject capacities the cache would refuse at creation time
    pub fn validate(&self) -> Result<()> {
        if self.enabled() && !(MIN_CACHE_ENTRIES..=MAX_CACHE_ENTRIES).contains(&self.entries) {
            return Err(Error::configuration(format!(
                "cache.entries must be 0 or within {MIN_CACHE_ENTRIES}..={MAX_CACHE_ENTRIES}, got {}",
                self.entries
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration for the disk-array emulator server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a configuration file, or the defaults if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3333
}

const fn default_cache_entries() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:3333".to_string()
}
