use ldp_ocfl::OcflConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PersistError, PersistResult};

/// Configuration for the persistence layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Object sessions the shared read-only session keeps open. The oldest
    /// is closed when a new one would exceed the bound.
    pub read_only_cache_capacity: usize,
    /// Object storage settings.
    pub ocfl: OcflConfig,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            read_only_cache_capacity: 512,
            ocfl: OcflConfig::default(),
        }
    }
}

impl PersistenceConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> PersistResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| PersistError::Config(e.to_string()))?;
        if config.read_only_cache_capacity == 0 {
            return Err(PersistError::Config(
                "read_only_cache_capacity must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}
