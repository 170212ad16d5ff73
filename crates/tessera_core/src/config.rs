//! # Engine Configuration
//!
//! Pool capacities are fixed for the lifetime of a pool, so they are decided
//! up front. Configs are plain TOML, loaded once at startup:
//!
//! ```toml
//! default_pool_capacity = 256
//!
//! [pool_capacities]
//! Position = 10000
//! Velocity = 10000
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Capacity of a pool whose component type has no configured override.
pub const DEFAULT_POOL_CAPACITY: usize = 100;

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Capacity for pools without an explicit override.
    pub default_pool_capacity: usize,
    /// Per-component capacity overrides, keyed by `Component::NAME`.
    pub pool_capacities: BTreeMap<String, usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_pool_capacity: DEFAULT_POOL_CAPACITY,
            pool_capacities: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML config.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML, unknown keys or
    /// a zero capacity.
    pub fn from_toml_str(contents: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or is
    /// not a valid config.
    pub fn from_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        tracing::debug!("Loading engine config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Sets the capacity override for one component type.
    #[must_use]
    pub fn with_pool_capacity(mut self, component: &str, capacity: usize) -> Self {
        self.pool_capacities.insert(component.to_owned(), capacity);
        self
    }

    /// Checks that every capacity is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the offending entry.
    pub fn validate(&self) -> EcsResult<()> {
        if self.default_pool_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "default_pool_capacity must be greater than zero".to_owned(),
            ));
        }
        if let Some((name, _)) = self.pool_capacities.iter().find(|(_, capacity)| **capacity == 0) {
            return Err(EcsError::InvalidConfig(format!(
                "pool capacity for `{name}` must be greater than zero"
            )));
        }
        Ok(())
    }

    /// Capacity a new pool for `component` gets.
    #[must_use]
    pub fn capacity_for(&self, component: &str) -> usize {
        self.pool_capacities
            .get(component)
            .copied()
            .unwrap_or(self.default_pool_capacity)
    }
}
