//! Store configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! default below.
//!
//! ```json
//! {
//!   "cache_capacity": 256,
//!   "validate_cache_hits": false,
//!   "min_chunk_capacity": 32,
//!   "root_capacity": 64,
//!   "split_threshold": 16,
//!   "reuse_free_chunks": true,
//!   "log_level": "warn"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables of one open store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Headers kept in the chunk cache; 0 disables caching
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Re-read the header on every cache hit and fail on mismatch
    #[serde(default)]
    pub validate_cache_hits: bool,

    /// Smallest capacity handed out by amortized allocation
    #[serde(default = "default_min_chunk_capacity")]
    pub min_chunk_capacity: u64,

    /// Capacity of the root chunk of a new store
    #[serde(default = "default_root_capacity")]
    pub root_capacity: u64,

    /// Smallest leftover worth splitting off a reused chunk
    #[serde(default = "default_split_threshold")]
    pub split_threshold: u64,

    /// Serve allocations from the free list before appending
    #[serde(default = "default_reuse_free_chunks")]
    pub reuse_free_chunks: bool,

    /// Minimum log severity: trace, info, warn, error or fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_cache_capacity() -> usize {
    256
}
fn default_min_chunk_capacity() -> u64 {
    32
}
fn default_root_capacity() -> u64 {
    64
}
fn default_split_threshold() -> u64 {
    16
}
fn default_reuse_free_chunks() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            validate_cache_hits: false,
            min_chunk_capacity: default_min_chunk_capacity(),
            root_capacity: default_root_capacity(),
            split_threshold: default_split_threshold(),
            reuse_free_chunks: default_reuse_free_chunks(),
            log_level: default_log_level(),
        }
    }
}

impl StoreConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", path.display().to_string().as_str())],
        );
        Ok(config)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus cache validation on every hit. For tests and debugging.
    pub fn strict() -> Self {
        Self {
            validate_cache_hits: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_chunk_capacity == 0 {
            return Err(ConfigError::Invalid(
                "min_chunk_capacity must be at least 1".to_string(),
            ));
        }
        if self.split_threshold == 0 {
            return Err(ConfigError::Invalid(
                "split_threshold must be at least 1".to_string(),
            ));
        }
        self.log_severity()?;
        Ok(())
    }

    pub fn log_severity(&self) -> ConfigResult<Severity> {
        Severity::from_name(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "log_level must be one of trace, info, warn, error, fatal; got '{}'",
                self.log_level
            ))
        })
    }
}
