//! The [`ObjectIndex`] trait.

use ldp_types::{ResourceId, TransactionId};

use crate::error::Result;
use crate::types::ObjectMapping;

/// Maps resources to the storage objects that hold them.
///
/// Implementations must be thread-safe and provide read-your-own-writes
/// within a transaction without callers taking any lock.
pub trait ObjectIndex: Send + Sync {
    /// Resolve the storage object for a resource.
    ///
    /// Descriptions, ACLs, timemaps and mementos resolve through their base
    /// id, so a binary and its description always share a mapping. A
    /// resource with no entry of its own resolves to its nearest archival
    /// group ancestor. With `tx`, that transaction's pending changes are
    /// visible.
    fn get_mapping(&self, tx: Option<&TransactionId>, id: &ResourceId) -> Result<ObjectMapping>;

    /// Record the mapping for `id` within `tx`.
    fn add_mapping(
        &self,
        tx: &TransactionId,
        id: &ResourceId,
        mapping: ObjectMapping,
        archival_group: bool,
    ) -> Result<()>;

    /// Remove the entry for `id` within `tx`. Removing a missing entry is
    /// not an error.
    fn remove_mapping(&self, tx: &TransactionId, id: &ResourceId) -> Result<()>;

    /// Publish `tx`'s pending changes. Unknown transactions are a no-op.
    fn commit(&self, tx: &TransactionId) -> Result<()>;

    /// Discard `tx`'s pending changes. Unknown transactions are a no-op.
    fn rollback(&self, tx: &TransactionId) -> Result<()>;
}
