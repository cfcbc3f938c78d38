use thiserror::Error;

/// Errors produced while parsing or deriving a [`ResourceId`](crate::ResourceId).
///
/// Every variant carries the path exactly as the caller supplied it so the
/// message can be surfaced without further context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier must begin with {prefix}: {path}")]
    MissingPrefix { path: String, prefix: &'static str },

    #[error("path contains empty element: {path}")]
    EmptySegment { path: String },

    #[error("path <{path}> is invalid: it may not contain more than one #")]
    MultipleFragments { path: String },

    #[error("path <{path}> is invalid: the hash fragment is empty")]
    EmptyFragment { path: String },

    #[error("path <{path}> is invalid: it may not contain multiple {suffix} parts")]
    DuplicateSuffix { path: String, suffix: &'static str },

    #[error("path <{path}> is invalid: {suffix} is not the final part")]
    MisplacedSuffix { path: String, suffix: &'static str },

    #[error("path <{path}> is invalid: fcr:acl cannot be combined with fcr:metadata or fcr:versions")]
    AclCombination { path: String },

    #[error("path <{path}> is invalid: fcr:tombstone cannot be combined with another suffix")]
    TombstoneCombination { path: String },

    #[error("invalid request for memento at {path}")]
    InvalidMemento { path: String },

    #[error("invalid resource id {path}: it may not contain '{part}'")]
    ReservedName { path: String, part: String },

    #[error("cannot resolve a blank segment against {base}")]
    BlankSegment { base: String },
}

/// Errors produced by the N-Triples reader.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RdfError {
    #[error("malformed N-Triples at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("N-Triples content is not valid UTF-8")]
    InvalidUtf8,
}
