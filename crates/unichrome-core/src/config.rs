//! Configuration file support.
//!
//! Settings come from `unichrome.toml`, environment variables and built-in
//! defaults, merged in priority order (highest first):
//!
//! 1. Environment variables (`UNICHROME_*`, `__` separates sections)
//! 2. Configuration file
//! 3. Default values

use crate::distance::DistanceKernel;
use crate::index::hnsw::{HnswParams, NeighborHeuristic};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse or merge configuration sources.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A value failed validation.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Storage configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory for persistent collections.
    pub data_dir: String,
    /// Skip persistence entirely and keep collections in memory.
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./unichrome_data".to_string(),
            in_memory: false,
        }
    }
}

/// Index configuration section.
///
/// Unset values fall back to the [`HnswParams`] defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Target out-degree (M parameter). `None` = default.
    pub m: Option<usize>,
    /// Construction-time candidate pool size. `None` = default.
    pub construction_pruning: Option<usize>,
    /// Neighbour selection policy.
    pub neighbor_heuristic: Option<NeighborHeuristic>,
    /// Distance kernel.
    pub kernel: Option<DistanceKernel>,
    /// Route construction-time distances through the pair cache.
    pub enable_distance_cache: Option<bool>,
}

/// Top-level database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Storage section.
    pub storage: StorageConfig,
    /// Index section.
    pub index: IndexConfig,
}

impl DatabaseConfig {
    /// Loads configuration from an optional TOML file plus `UNICHROME_*`
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if a source cannot be read or merged,
    /// or [`ConfigError::InvalidValue`] if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("UNICHROME_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the index section into construction parameters.
    #[must_use]
    pub fn hnsw_params(&self) -> HnswParams {
        let mut params = HnswParams::with_m(self.index.m.unwrap_or(10));
        if let Some(ef) = self.index.construction_pruning {
            params.construction_pruning = ef;
        }
        if let Some(heuristic) = self.index.neighbor_heuristic {
            params.neighbor_heuristic = heuristic;
        }
        if let Some(kernel) = self.index.kernel {
            params.kernel = kernel;
        }
        if let Some(enabled) = self.index.enable_distance_cache {
            params.enable_distance_cache = enabled;
        }
        params
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(m) = self.index.m {
            if m < 2 {
                return Err(ConfigError::InvalidValue {
                    key: "index.m".to_string(),
                    message: format!("must be at least 2, got {m}"),
                });
            }
        }
        if let Some(ef) = self.index.construction_pruning {
            let m = self.index.m.unwrap_or(10);
            if ef < m {
                return Err(ConfigError::InvalidValue {
                    key: "index.construction_pruning".to_string(),
                    message: format!("must be at least index.m ({m}), got {ef}"),
                });
            }
        }
        if !self.storage.in_memory && self.storage.data_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "storage.data_dir".to_string(),
                message: "must not be empty for persistent storage".to_string(),
            });
        }
        Ok(())
    }
}
