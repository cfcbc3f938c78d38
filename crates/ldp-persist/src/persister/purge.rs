use ldp_index::ObjectMapping;
use ldp_ocfl::ObjectSession;
use tracing::debug;

use super::{read_headers, PersistContext, Persister};
use crate::error::{PersistError, PersistResult};
use crate::operation::ResourceOperation;
use crate::paths;

/// Removes every trace of a tombstoned resource from its object's head and
/// drops its index mapping. Earlier versions keep their copies.
pub struct PurgePersister;

impl Persister for PurgePersister {
    fn name(&self) -> &str {
        "purge"
    }

    fn handles(&self, operation: &ResourceOperation) -> bool {
        matches!(operation, ResourceOperation::Purge { .. })
    }

    fn persist(
        &self,
        context: &PersistContext<'_>,
        session: &dyn ObjectSession,
        operation: &ResourceOperation,
        mapping: &ObjectMapping,
    ) -> PersistResult<()> {
        let resource = operation.resource_id().as_resource();
        let headers = read_headers(session, mapping, &resource)?;
        if !headers.deleted {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "only a deleted resource can be purged",
            ));
        }

        let owner = &mapping.owner_resource_id;
        session.delete(&paths::header_path(owner, &resource)?)?;
        if headers.interaction_model.is_binary() {
            session.delete(&paths::header_path(owner, &resource.as_description())?)?;
        }
        if !resource.is_acl() && !resource.is_description() {
            context
                .index
                .remove_mapping(context.transaction, &resource.as_base())?;
        }

        debug!(
            resource = %resource,
            object = %mapping.storage_object_id,
            "resource purged"
        );
        Ok(())
    }
}
