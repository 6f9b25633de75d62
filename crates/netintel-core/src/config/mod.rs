//! Configuration management for netintel
//!
//! Strongly-typed configuration with TOML support. Every section falls back
//! to its defaults, so an empty file is a valid configuration.

use crate::error::{Error, Result};
use crate::filterlists::DEFAULT_KEY_PREFIX;
use netintel_store::{CacheOptions, DEFAULT_CACHE_SIZE, DEFAULT_WRITE_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record store cache settings
    pub store: StoreConfig,

    /// Blocklist lookup settings
    pub filterlists: FilterListsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.cache_size == 0 {
            return Err(Error::config_value("store.cache_size", "Must be non-zero"));
        }
        if self.store.delay_writes && self.store.write_batch_size == 0 {
            return Err(Error::config_value(
                "store.write_batch_size",
                "Must be non-zero when delay_writes is enabled",
            ));
        }

        let prefix = &self.filterlists.key_prefix;
        if prefix.is_empty() || prefix.ends_with('/') {
            return Err(Error::config_value(
                "filterlists.key_prefix",
                "Must be non-empty and must not end with '/'",
            ));
        }
        if self.filterlists.expected_items == 0 {
            return Err(Error::config_value(
                "filterlists.expected_items",
                "Must be non-zero",
            ));
        }
        let rate = self.filterlists.false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(Error::config_value(
                "filterlists.false_positive_rate",
                format!("Must be between 0 and 1 (exclusive), got {rate}"),
            ));
        }

        Ok(())
    }
}

/// Record store cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of records kept in memory
    pub cache_size: usize,
    /// Delay and batch writes to the backend
    pub delay_writes: bool,
    /// Number of delayed writes that triggers a flush
    pub write_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            // new entries are often queried again soon after insertion
            cache_size: DEFAULT_CACHE_SIZE,
            delay_writes: true,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
        }
    }
}

impl StoreConfig {
    /// Options for a [`CachedStore`](netintel_store::CachedStore) layer
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            cache_size: self.cache_size,
            delay_writes: self.delay_writes,
            write_batch_size: self.write_batch_size,
        }
    }
}

/// Blocklist lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterListsConfig {
    /// Namespace prefix of blocklist entry keys
    pub key_prefix: String,
    /// Expected number of values per entity kind, used to size bloom filters
    pub expected_items: usize,
    /// Target false positive rate of bloom filters
    pub false_positive_rate: f64,
}

impl Default for FilterListsConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            expected_items: 100_000,
            false_positive_rate: 0.001,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or env-filter directive
    pub level: String,
    /// Enable JSON format logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
