use chrono::{DateTime, Utc};
use ldp_index::ObjectMapping;
use ldp_ocfl::ObjectSession;
use ldp_types::ResourceHeaders;
use tracing::debug;

use super::{read_headers, read_headers_opt, write_headers, PersistContext, Persister};
use crate::error::{PersistError, PersistResult};
use crate::operation::ResourceOperation;

/// Replaces a resource with a tombstone.
///
/// The headers stay behind with `deleted` set; the content file is removed.
/// Deleting a binary tombstones its description too.
pub struct DeletePersister;

fn tombstone(
    session: &dyn ObjectSession,
    mapping: &ObjectMapping,
    mut headers: ResourceHeaders,
    principal: Option<&str>,
    now: DateTime<Utc>,
) -> PersistResult<()> {
    headers.deleted = true;
    headers.touch_modified(principal, now);
    if let Some(path) = headers.content_path.as_deref() {
        session.delete(path)?;
    }
    write_headers(session, mapping, &headers)
}

impl Persister for DeletePersister {
    fn name(&self) -> &str {
        "delete"
    }

    fn handles(&self, operation: &ResourceOperation) -> bool {
        matches!(operation, ResourceOperation::Delete { .. })
    }

    fn persist(
        &self,
        _context: &PersistContext<'_>,
        session: &dyn ObjectSession,
        operation: &ResourceOperation,
        mapping: &ObjectMapping,
    ) -> PersistResult<()> {
        let resource = operation.resource_id().as_resource();
        if resource.is_description() {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "a description is deleted with its binary",
            ));
        }

        let headers = read_headers(session, mapping, &resource)?;
        if headers.deleted {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "resource is already deleted",
            ));
        }
        let binary = headers.interaction_model.is_binary();
        let now = Utc::now();
        let principal = operation.user_principal();
        tombstone(session, mapping, headers, principal, now)?;

        if binary {
            if let Some(description) =
                read_headers_opt(session, mapping, &resource.as_description())?
            {
                tombstone(session, mapping, description, principal, now)?;
            }
        }

        debug!(
            resource = %resource,
            object = %mapping.storage_object_id,
            binary,
            "resource deleted"
        );
        Ok(())
    }
}
