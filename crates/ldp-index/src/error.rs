//! Error types for index operations.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// No storage object owns the resource.
    #[error("no storage object mapping for {resource_id}")]
    NotFound { resource_id: String },

    /// The mapping would break the archival group layout.
    #[error("invalid mapping for {resource_id}: {reason}")]
    InvalidMapping { resource_id: String, reason: String },

    /// Backend failure.
    #[error("index storage error: {0}")]
    Storage(String),
}

/// Convenience type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
