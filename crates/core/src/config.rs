//! Browser configuration.
//!
//! Settings are read from a TOML file whose tables mirror the components:
//!
//! ```toml
//! [cache]
//! capacity = 500
//! prefetch_batch_size = 10
//!
//! [grid]
//! min_item_width = 200.0
//! desired_columns = 6
//!
//! [paging]
//! page_size = 100
//! ```
//!
//! Missing tables and keys fall back to defaults. Environment variables
//! override the file.

use crate::error::ConfigError;
use crate::feed::PagingConfig;
use crate::grid::GridMetrics;
use log::info;
use mediagrid_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub cache: CacheConfig,
    pub grid: GridMetrics,
    pub paging: PagingConfig,
}

impl BrowserConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: BrowserConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                info!("Loading browser config from {}", path.display());
                Self::from_toml(&text)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Applies environment overrides on top of `self`.
    ///
    /// Besides the cache variables read by [`CacheConfig::apply_env`]:
    /// - `MEDIAGRID_PAGE_SIZE`: records per page (default: 100)
    /// - `MEDIAGRID_PAGE_THRESHOLD`: pagination trigger distance in rows (default: 5)
    /// - `MEDIAGRID_OVERSCAN`: rows rendered beyond the viewport (default: 2)
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        self.cache = self.cache.apply_env()?;
        if let Some(v) = env_usize("MEDIAGRID_PAGE_SIZE")? {
            self.paging.page_size = v;
        }
        if let Some(v) = env_usize("MEDIAGRID_PAGE_THRESHOLD")? {
            self.paging.threshold_rows = v;
        }
        if let Some(v) = env_usize("MEDIAGRID_OVERSCAN")? {
            self.grid.overscan = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Loads `path` (if present) and then applies the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_file(path)?.apply_env()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        if self.paging.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "paging.page_size",
                reason: "must request at least one record".into(),
            });
        }
        let grid = &self.grid;
        if !(grid.min_item_width.is_finite() && grid.min_item_width >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "grid.min_item_width",
                reason: format!("{} is not a non-negative width", grid.min_item_width),
            });
        }
        if !(grid.gap.is_finite() && grid.gap >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "grid.gap",
                reason: format!("{} is not a non-negative gap", grid.gap),
            });
        }
        if !(grid.item_height.is_finite() && grid.item_height > 0.0) {
            return Err(ConfigError::Invalid {
                key: "grid.item_height",
                reason: format!("{} is not a positive height", grid.item_height),
            });
        }
        if grid.desired_columns == 0 {
            return Err(ConfigError::Invalid {
                key: "grid.desired_columns",
                reason: "must allow at least one column".into(),
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
            .map_err(|_| ConfigError::Invalid {
                key: name,
                reason: format!("{value:?} is not an unsigned integer"),
            }),
        Err(_) => Ok(None),
    }
}
