//! Versioned object storage for the LDP repository.
//!
//! A storage object is a versioned set of files addressed by subpath. The
//! persistence layer never touches objects directly; it opens an
//! [`ObjectSession`] per object, stages writes there, and drives the
//! session through `prepare` and `commit` (or `close` to discard).
//!
//! # Key Types
//!
//! - [`ObjectSession`] -- staging area for one storage object
//! - [`ObjectSessionFactory`] -- opens sessions by object id
//! - [`CommitOption`] -- new immutable version, or the mutable head
//! - [`InMemoryOcflRepository`] -- content-addressed in-memory backend
//!
//! # Design Rules
//!
//! 1. Content is addressed by BLAKE3 digest and stored once.
//! 2. Versions are immutable; only the mutable head may be rewritten.
//! 3. Staged changes are invisible to other sessions until commit.
//! 4. A session whose object moved since it opened fails `prepare`.

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use config::OcflConfig;
pub use error::{OcflError, OcflResult};
pub use memory::InMemoryOcflRepository;
pub use traits::{ObjectSession, ObjectSessionFactory};
pub use types::{CommitOption, CommittedVersion, VersionId, VersionInfo, WriteOutcome};
