use serde::{Deserialize, Serialize};

use crate::types::CommitOption;

/// Object storage configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcflConfig {
    /// Commit every transaction as a new immutable version. When off,
    /// changes accumulate in the mutable head until a version is requested.
    pub auto_versioning: bool,
}

impl OcflConfig {
    /// Commit option new sessions start with.
    pub fn default_commit_option(&self) -> CommitOption {
        if self.auto_versioning {
            CommitOption::NewVersion
        } else {
            CommitOption::UnversionedHead
        }
    }
}

impl Default for OcflConfig {
    fn default() -> Self {
        Self {
            auto_versioning: true,
        }
    }
}
