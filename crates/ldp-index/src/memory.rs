//! In-memory object index for testing and ephemeral use.
//!
//! [`InMemoryObjectIndex`] keeps committed entries in one `HashMap` and each
//! open transaction's changes in an overlay keyed by transaction id. A
//! `None` in the overlay is a pending removal.

use std::collections::HashMap;
use std::sync::RwLock;

use ldp_types::{ResourceId, TransactionId};
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::traits::ObjectIndex;
use crate::types::{IndexEntry, ObjectMapping};

type Overlay = HashMap<String, Option<IndexEntry>>;

/// An in-memory implementation of [`ObjectIndex`].
#[derive(Debug, Default)]
pub struct InMemoryObjectIndex {
    committed: RwLock<HashMap<String, IndexEntry>>,
    pending: RwLock<HashMap<TransactionId, Overlay>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> IndexError {
    IndexError::Storage(format!("lock poisoned: {e}"))
}

impl InMemoryObjectIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.committed.read().map(|m| m.len()).unwrap_or_default()
    }

    /// Returns `true` if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of transactions with pending changes.
    pub fn open_transactions(&self) -> usize {
        self.pending.read().map(|m| m.len()).unwrap_or_default()
    }

    /// The entry for a base id as seen by `tx`.
    fn lookup(&self, tx: Option<&TransactionId>, base_id: &str) -> Result<Option<IndexEntry>> {
        if let Some(tx) = tx {
            let pending = self.pending.read().map_err(poisoned)?;
            if let Some(change) = pending.get(tx).and_then(|overlay| overlay.get(base_id)) {
                return Ok(change.clone());
            }
        }
        let committed = self.committed.read().map_err(poisoned)?;
        Ok(committed.get(base_id).cloned())
    }

    fn stage(&self, tx: &TransactionId, base_id: &str, change: Option<IndexEntry>) -> Result<()> {
        let mut pending = self.pending.write().map_err(poisoned)?;
        pending
            .entry(tx.clone())
            .or_default()
            .insert(base_id.to_string(), change);
        Ok(())
    }
}

impl ObjectIndex for InMemoryObjectIndex {
    fn get_mapping(&self, tx: Option<&TransactionId>, id: &ResourceId) -> Result<ObjectMapping> {
        if let Some(entry) = self.lookup(tx, id.base_id())? {
            return Ok(entry.mapping);
        }

        // Only an archival group can own a resource that has no entry.
        let mut ancestor = id.parent();
        while let Some(current) = ancestor {
            if let Some(entry) = self.lookup(tx, current.base_id())? {
                if entry.covers_descendants_of(&current) {
                    return Ok(entry.mapping);
                }
                break;
            }
            ancestor = current.parent();
        }

        Err(IndexError::NotFound {
            resource_id: id.full_id().to_string(),
        })
    }

    fn add_mapping(
        &self,
        tx: &TransactionId,
        id: &ResourceId,
        mapping: ObjectMapping,
        archival_group: bool,
    ) -> Result<()> {
        let owner = &mapping.owner_resource_id;
        let owns_itself = owner.base_id() == id.base_id();
        if !owns_itself && !owner.is_ancestor_of(id) {
            return Err(IndexError::InvalidMapping {
                resource_id: id.full_id().to_string(),
                reason: format!("owner {owner} is not an ancestor"),
            });
        }
        if archival_group && !owns_itself {
            return Err(IndexError::InvalidMapping {
                resource_id: id.full_id().to_string(),
                reason: "an archival group must own its storage object".to_string(),
            });
        }

        debug!(
            tx = %tx,
            resource = id.base_id(),
            object = %mapping.storage_object_id,
            archival_group,
            "index mapping added"
        );
        self.stage(
            tx,
            id.base_id(),
            Some(IndexEntry {
                mapping,
                archival_group,
            }),
        )
    }

    fn remove_mapping(&self, tx: &TransactionId, id: &ResourceId) -> Result<()> {
        debug!(tx = %tx, resource = id.base_id(), "index mapping removed");
        self.stage(tx, id.base_id(), None)
    }

    fn commit(&self, tx: &TransactionId) -> Result<()> {
        let mut pending = self.pending.write().map_err(poisoned)?;
        let Some(overlay) = pending.remove(tx) else {
            return Ok(());
        };
        let mut committed = self.committed.write().map_err(poisoned)?;
        let changes = overlay.len();
        for (base_id, change) in overlay {
            match change {
                Some(entry) => {
                    committed.insert(base_id, entry);
                }
                None => {
                    committed.remove(&base_id);
                }
            }
        }
        debug!(tx = %tx, changes, "index transaction committed");
        Ok(())
    }

    fn rollback(&self, tx: &TransactionId) -> Result<()> {
        let mut pending = self.pending.write().map_err(poisoned)?;
        if let Some(overlay) = pending.remove(tx) {
            debug!(tx = %tx, discarded = overlay.len(), "index transaction rolled back");
        }
        Ok(())
    }
}
