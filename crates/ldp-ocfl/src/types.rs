use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a session's staged changes are made durable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitOption {
    /// Fold the changes (and any mutable head) into a new immutable version.
    NewVersion,
    /// Write the changes to the object's mutable head.
    UnversionedHead,
}

/// Identifier of an immutable object version (`v1`, `v2`, ...).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// The version id for a 1-based version number.
    pub fn from_number(number: usize) -> Self {
        Self(format!("v{number}"))
    }

    /// The 1-based version number, if the id is well formed.
    pub fn number(&self) -> Option<usize> {
        self.0.strip_prefix('v')?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VersionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A committed version as listed by [`ObjectSession::list_versions`](crate::ObjectSession::list_versions).
///
/// `created` has whole-second precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version_id: VersionId,
    pub created: DateTime<Utc>,
}

/// What a staged write recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    pub size: u64,
    /// Lowercase hex BLAKE3 digest of the content.
    pub digest: String,
    pub time_written: DateTime<Utc>,
}

/// Result of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedVersion {
    pub object_id: String,
    pub option: CommitOption,
    /// The version created. `None` for mutable-head commits and for
    /// version commits that had nothing to fold.
    pub version_id: Option<VersionId>,
}
