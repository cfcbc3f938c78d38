use ldp_index::ObjectMapping;
use ldp_ocfl::{CommitOption, ObjectSession};
use tracing::debug;

use super::{PersistContext, Persister};
use crate::error::PersistResult;
use crate::operation::ResourceOperation;

/// Marks the resource's storage object for an immutable version on commit.
pub struct CreateVersionPersister;

impl Persister for CreateVersionPersister {
    fn name(&self) -> &str {
        "create-version"
    }

    fn handles(&self, operation: &ResourceOperation) -> bool {
        matches!(operation, ResourceOperation::CreateVersion { .. })
    }

    fn persist(
        &self,
        _context: &PersistContext<'_>,
        session: &dyn ObjectSession,
        operation: &ResourceOperation,
        mapping: &ObjectMapping,
    ) -> PersistResult<()> {
        session.set_default_commit_option(CommitOption::NewVersion);
        debug!(
            resource = %operation.resource_id(),
            object = %mapping.storage_object_id,
            "new version requested"
        );
        Ok(())
    }
}
