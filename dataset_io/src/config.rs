//! Registry configuration
//!
//! Configuration is a plain serde value so it can be embedded in a host's own
//! settings or loaded from JSON.

use serde::{Deserialize, Serialize};
use storage_engine::OpenMode;
use thiserror::Error;

/// Errors loading a [`RegistryConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse registry config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How a [`crate::FileRegistry`] opens its container and creates datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Access mode used by `FileRegistry::open`
    pub mode: OpenMode,
    /// Replace a dataset that already exists on disk when it is created
    /// again, instead of failing with `AlreadyExists`
    pub recreate_existing: bool,
}

impl RegistryConfig {
    pub fn read_only() -> Self {
        Self {
            mode: OpenMode::ReadOnly,
            ..Self::default()
        }
    }

    pub fn with_recreate_existing(mut self, recreate: bool) -> Self {
        self.recreate_existing = recreate;
        self
    }

    /// Parses a config from JSON; missing fields take their defaults
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
