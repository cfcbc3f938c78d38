use crate::types::VersionId;

/// Errors from object storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OcflError {
    /// No file at the subpath (in the requested version, if any).
    #[error("{subpath} not found in object {object_id}")]
    NotFound { object_id: String, subpath: String },

    /// The object has no such version.
    #[error("version {version} not found in object {object_id}")]
    VersionNotFound {
        object_id: String,
        version: VersionId,
    },

    /// Another session committed to the object after this one opened.
    #[error("object {object_id} was changed by another session")]
    Conflict { object_id: String },

    /// The session was committed or closed.
    #[error("session for object {object_id} is closed")]
    Closed { object_id: String },

    #[error("invalid subpath {subpath:?}: {reason}")]
    InvalidPath { subpath: String, reason: String },

    /// Backend failure not covered above.
    #[error("storage error: {0}")]
    Storage(String),
}

impl OcflError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::VersionNotFound { .. })
    }
}

/// Result alias for object storage operations.
pub type OcflResult<T> = Result<T, OcflError>;
