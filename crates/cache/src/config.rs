//! Cache configuration for preview capacity and prefetch pacing.
//!
//! Configuration can be created programmatically, deserialized (it is part of
//! the browser's TOML settings file), or overridden from environment
//! variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the preview cache and its prefetch scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of preview entries kept before LRU eviction
    pub capacity: usize,
    /// Keys dispatched per prefetch batch
    pub prefetch_batch_size: usize,
    /// Pause between prefetch batches in milliseconds
    pub prefetch_pause_ms: u64,
    /// Rows warmed above the visible range
    pub preload_rows_behind: usize,
    /// Rows warmed below the visible range
    pub preload_rows_ahead: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: crate::preview::DEFAULT_CAPACITY,
            prefetch_batch_size: 10,
            prefetch_pause_ms: 50,
            preload_rows_behind: 2,
            preload_rows_ahead: 3,
        }
    }
}

impl CacheConfig {
    /// Sets the maximum number of cached previews.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of keys dispatched per prefetch batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.prefetch_batch_size = batch_size;
        self
    }

    /// Sets the pause between prefetch batches.
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.prefetch_pause_ms = pause.as_millis() as u64;
        self
    }

    /// Sets how many rows behind and ahead of the visible range are warmed.
    pub fn with_preload_rows(mut self, behind: usize, ahead: usize) -> Self {
        self.preload_rows_behind = behind;
        self.preload_rows_ahead = ahead;
        self
    }

    pub fn prefetch_pause(&self) -> Duration {
        Duration::from_millis(self.prefetch_pause_ms)
    }

    /// Applies overrides from environment variables.
    ///
    /// Environment variables:
    /// - `MEDIAGRID_CACHE_CAPACITY`: preview entries (default: 500)
    /// - `MEDIAGRID_PREFETCH_BATCH`: keys per prefetch batch (default: 10)
    /// - `MEDIAGRID_PREFETCH_PAUSE_MS`: pause between batches (default: 50)
    /// - `MEDIAGRID_PRELOAD_BEHIND`: rows warmed above the viewport (default: 2)
    /// - `MEDIAGRID_PRELOAD_AHEAD`: rows warmed below the viewport (default: 3)
    ///
    /// # Errors
    /// Returns an error if any variable holds something other than an unsigned
    /// integer, or if the result fails [`CacheConfig::validate`].
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_usize("MEDIAGRID_CACHE_CAPACITY")? {
            self.capacity = v;
        }
        if let Some(v) = env_usize("MEDIAGRID_PREFETCH_BATCH")? {
            self.prefetch_batch_size = v;
        }
        if let Some(v) = env_usize("MEDIAGRID_PREFETCH_PAUSE_MS")? {
            self.prefetch_pause_ms = v as u64;
        }
        if let Some(v) = env_usize("MEDIAGRID_PRELOAD_BEHIND")? {
            self.preload_rows_behind = v;
        }
        if let Some(v) = env_usize("MEDIAGRID_PRELOAD_AHEAD")? {
            self.preload_rows_ahead = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Loads the default configuration with environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Rejects values the cache and scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "capacity",
                reason: "must hold at least one entry",
            });
        }
        if self.prefetch_batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "prefetch_batch_size",
                reason: "must dispatch at least one key per batch",
            });
        }
        Ok(())
    }
}

fn env_usize(name: &'static str) -> Result<Option<usize>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key: name, value }),
        Err(_) => Ok(None),
    }
}

/// Errors that can occur while building a configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} {reason}")]
    OutOfRange {
        key: &'static str,
        reason: &'static str,
    },
}
