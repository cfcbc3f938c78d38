use ldp_index::IndexError;
use ldp_ocfl::OcflError;
use ldp_types::{IdentifierError, RdfError};

use crate::state::SessionState;

/// Errors produced by persistence sessions and persisters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// No storage object owns the resource.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// No content for the resource at the requested subpath or version.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The session no longer accepts operations.
    #[error("session {session} is closed (state: {state})")]
    SessionClosed { session: String, state: SessionState },

    /// Writes attempted through the shared read-only session.
    #[error("the read-only session cannot {0}")]
    ReadOnly(&'static str),

    /// No registered persister handles the operation.
    #[error("no persister handles {0}")]
    UnsupportedOperation(String),

    #[error("illegal session transition from {from} to {to}")]
    IllegalTransition { from: SessionState, to: SessionState },

    /// An object failed to prepare; nothing was committed.
    #[error("prepare failed for {object_id}: {reason}")]
    PrepareFailed { object_id: String, reason: String },

    /// A commit failed partway. `committed` lists what is already durable.
    #[error("commit failed for {target}: {reason}")]
    CommitFailed {
        target: String,
        reason: String,
        committed: Vec<String>,
    },

    /// One or more committed objects could not be undone.
    #[error("rollback failed: {}", .failures.join("; "))]
    RollbackFailed { failures: Vec<String> },

    /// Supplied size or digest does not match the stored content.
    #[error("fixity check failed for {resource}: {reason}")]
    Fixity { resource: String, reason: String },

    /// The operation is well formed but not applicable to the resource.
    #[error("invalid operation on {resource}: {reason}")]
    InvalidOperation { resource: String, reason: String },

    #[error("storage error: {0}")]
    Storage(OcflError),

    #[error("index error: {0}")]
    Index(IndexError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PersistError {
    pub fn invalid_operation(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for the "not found" family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_) | Self::ItemNotFound(_))
    }
}

impl From<OcflError> for PersistError {
    fn from(e: OcflError) -> Self {
        if e.is_not_found() {
            Self::ItemNotFound(e.to_string())
        } else {
            Self::Storage(e)
        }
    }
}

impl From<IndexError> for PersistError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::NotFound { resource_id } => Self::ObjectNotFound(resource_id),
            other => Self::Index(other),
        }
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<RdfError> for PersistError {
    fn from(e: RdfError) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;
