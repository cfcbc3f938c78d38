//! Operation handlers.
//!
//! A [`PersisterRegistry`] is an ordered list of [`Persister`]s. Dispatch
//! picks the first one whose [`Persister::handles`] accepts the operation.
//! Persisters hold no state; everything they change goes through the
//! [`ObjectSession`] and the index transaction they are handed.

pub mod create_version;
pub mod delete;
pub mod non_rdf_source;
pub mod purge;
pub mod rdf_source;

pub use create_version::CreateVersionPersister;
pub use delete::DeletePersister;
pub use non_rdf_source::NonRdfSourcePersister;
pub use purge::PurgePersister;
pub use rdf_source::RdfSourcePersister;

use bytes::Bytes;
use ldp_index::{IndexError, ObjectIndex, ObjectMapping};
use ldp_ocfl::ObjectSession;
use ldp_types::{ResourceHeaders, ResourceId, TransactionId};
use tracing::debug;

use crate::error::{PersistError, PersistResult};
use crate::operation::ResourceOperation;
use crate::paths;

/// What a persister may touch besides the object session.
pub struct PersistContext<'a> {
    pub transaction: &'a TransactionId,
    pub index: &'a dyn ObjectIndex,
}

impl PersistContext<'_> {
    /// Index lookup inside this transaction.
    pub fn mapping(&self, id: &ResourceId) -> PersistResult<ObjectMapping> {
        Ok(self.index.get_mapping(Some(self.transaction), id)?)
    }
}

/// Applies one category of [`ResourceOperation`] to a storage object.
///
/// The trait is object-safe and `Send + Sync` so persisters can be stored in
/// a `Vec<Box<dyn Persister>>` shared by every session.
pub trait Persister: Send + Sync {
    /// Human-readable name (e.g. "rdf-source").
    fn name(&self) -> &str;

    fn handles(&self, operation: &ResourceOperation) -> bool;

    /// The storage object the operation applies to. Defaults to the index
    /// mapping of the operation's resource.
    fn resolve_mapping(
        &self,
        context: &PersistContext<'_>,
        operation: &ResourceOperation,
    ) -> PersistResult<ObjectMapping> {
        context.mapping(operation.resource_id())
    }

    /// Apply the operation to `session`, the session of `mapping`'s object.
    fn persist(
        &self,
        context: &PersistContext<'_>,
        session: &dyn ObjectSession,
        operation: &ResourceOperation,
        mapping: &ObjectMapping,
    ) -> PersistResult<()>;
}

/// Ordered set of persisters.
pub struct PersisterRegistry {
    persisters: Vec<Box<dyn Persister>>,
}

impl PersisterRegistry {
    /// An empty registry. Use [`Self::register`] to add persisters, or
    /// [`Self::with_default_persisters`] for the standard set.
    pub fn new() -> Self {
        Self {
            persisters: Vec::new(),
        }
    }

    /// RDF source, non-RDF source, delete, create-version, purge.
    pub fn with_default_persisters() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RdfSourcePersister));
        registry.register(Box::new(NonRdfSourcePersister));
        registry.register(Box::new(DeletePersister));
        registry.register(Box::new(CreateVersionPersister));
        registry.register(Box::new(PurgePersister));
        registry
    }

    /// Append a persister after the existing ones.
    pub fn register(&mut self, persister: Box<dyn Persister>) {
        self.persisters.push(persister);
    }

    pub fn len(&self) -> usize {
        self.persisters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persisters.is_empty()
    }

    /// Persister names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.persisters.iter().map(|p| p.name()).collect()
    }

    /// The first persister that handles `operation`.
    pub fn select(&self, operation: &ResourceOperation) -> PersistResult<&dyn Persister> {
        self.persisters
            .iter()
            .find(|p| p.handles(operation))
            .map(|p| p.as_ref())
            .ok_or_else(|| PersistError::UnsupportedOperation(operation.to_string()))
    }
}

impl Default for PersisterRegistry {
    fn default() -> Self {
        Self::with_default_persisters()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Mapping for a resource about to be created.
///
/// An existing mapping is reused, which places new resources inside an
/// enclosing archival group. Otherwise the resource becomes the root of a
/// new storage object named after its base id.
pub(crate) fn mapping_for_new_resource(
    context: &PersistContext<'_>,
    resource: &ResourceId,
    archival_group: bool,
) -> PersistResult<ObjectMapping> {
    let mapping = match context.index.get_mapping(Some(context.transaction), resource) {
        Ok(mapping) => mapping,
        Err(IndexError::NotFound { .. }) => {
            ObjectMapping::new(resource.base_id(), resource.as_base())
        }
        Err(e) => return Err(e.into()),
    };
    if archival_group && mapping.owner_resource_id.base_id() != resource.base_id() {
        return Err(PersistError::invalid_operation(
            resource.full_id(),
            format!(
                "archival groups cannot be nested (inside {})",
                mapping.owner_resource_id
            ),
        ));
    }
    Ok(mapping)
}

/// Record the mapping of a newly created resource in the index transaction.
pub(crate) fn register_mapping(
    context: &PersistContext<'_>,
    resource: &ResourceId,
    mapping: &ObjectMapping,
    archival_group: bool,
) -> PersistResult<()> {
    context
        .index
        .add_mapping(context.transaction, &resource.as_base(), mapping.clone(), archival_group)?;
    Ok(())
}

/// Read the headers sidecar of `resource`.
pub(crate) fn read_headers(
    session: &dyn ObjectSession,
    mapping: &ObjectMapping,
    resource: &ResourceId,
) -> PersistResult<ResourceHeaders> {
    let subpath = paths::header_path(&mapping.owner_resource_id, resource)?;
    let bytes = session.read(&subpath, None)?;
    Ok(ResourceHeaders::from_json(&bytes)?)
}

/// Read headers, returning `None` when the sidecar does not exist.
pub(crate) fn read_headers_opt(
    session: &dyn ObjectSession,
    mapping: &ObjectMapping,
    resource: &ResourceId,
) -> PersistResult<Option<ResourceHeaders>> {
    match read_headers(session, mapping, resource) {
        Ok(headers) => Ok(Some(headers)),
        Err(PersistError::ItemNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Stage the headers sidecar for `headers.id`.
pub(crate) fn write_headers(
    session: &dyn ObjectSession,
    mapping: &ObjectMapping,
    headers: &ResourceHeaders,
) -> PersistResult<()> {
    let subpath = paths::header_path(&mapping.owner_resource_id, &headers.id)?;
    session.write(&subpath, Bytes::from(headers.to_json()?))?;
    debug!(object = session.object_id(), subpath = %subpath, "headers staged");
    Ok(())
}

/// Fail if the resource exists and is not a tombstone.
pub(crate) fn ensure_absent(
    session: &dyn ObjectSession,
    mapping: &ObjectMapping,
    resource: &ResourceId,
) -> PersistResult<Option<ResourceHeaders>> {
    match read_headers_opt(session, mapping, resource)? {
        Some(existing) if !existing.deleted => Err(PersistError::invalid_operation(
            resource.full_id(),
            "resource already exists",
        )),
        tombstone => Ok(tombstone),
    }
}

/// Headers of a live resource, for updates.
pub(crate) fn live_headers(
    session: &dyn ObjectSession,
    mapping: &ObjectMapping,
    resource: &ResourceId,
) -> PersistResult<ResourceHeaders> {
    let headers = read_headers(session, mapping, resource)?;
    if headers.deleted {
        return Err(PersistError::invalid_operation(
            resource.full_id(),
            "resource is deleted",
        ));
    }
    Ok(headers)
}
