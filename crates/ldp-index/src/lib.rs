//! Resource-to-storage-object index for the LDP repository.
//!
//! Every persisted resource lives inside exactly one storage object. The
//! index answers "which object holds this resource, and which resource owns
//! that object". Resources inside an archival group share the group root's
//! object; everything else is the root of its own object.
//!
//! Writes are scoped to a transaction and become visible to other
//! transactions only on [`ObjectIndex::commit`]. Reads inside the writing
//! transaction see its own pending changes.
//!
//! # Modules
//!
//! - [`error`] -- Error types for index operations
//! - [`types`] -- [`ObjectMapping`] and the stored [`IndexEntry`]
//! - [`traits`] -- The [`ObjectIndex`] trait
//! - [`memory`] -- In-memory [`InMemoryObjectIndex`]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{IndexError, Result};
pub use memory::InMemoryObjectIndex;
pub use traits::ObjectIndex;
pub use types::{IndexEntry, ObjectMapping};
