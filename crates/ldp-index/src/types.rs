//! Core index types.

use ldp_types::ResourceId;
use serde::{Deserialize, Serialize};

/// Where a resource is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMapping {
    /// Opaque id of the storage object holding the resource.
    pub storage_object_id: String,
    /// The resource whose storage object this is: the resource itself, or
    /// the root of its archival group.
    pub owner_resource_id: ResourceId,
}

impl ObjectMapping {
    pub fn new(storage_object_id: impl Into<String>, owner_resource_id: ResourceId) -> Self {
        Self {
            storage_object_id: storage_object_id.into(),
            owner_resource_id,
        }
    }
}

/// A stored index row, keyed by resource base id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub mapping: ObjectMapping,
    /// The resource is the root of an archival group.
    pub archival_group: bool,
}

impl IndexEntry {
    /// Returns `true` if descendants of `resource` without an entry of
    /// their own belong to this entry's storage object.
    ///
    /// That holds for an archival group root and for any resource stored
    /// inside an archival group.
    pub fn covers_descendants_of(&self, resource: &ResourceId) -> bool {
        self.archival_group || self.mapping.owner_resource_id.base_id() != resource.base_id()
    }
}
