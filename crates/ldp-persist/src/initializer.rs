use ldp_index::IndexError;
use ldp_types::{InteractionModel, ResourceId, TransactionId};
use tracing::{debug, info, warn};

use crate::error::PersistResult;
use crate::manager::SessionManager;
use crate::operation::{RdfSourceOperation, ResourceOperation};

/// Creates the repository root container on first start.
pub struct RepositoryInitializer<'a> {
    manager: &'a SessionManager,
}

impl<'a> RepositoryInitializer<'a> {
    pub fn new(manager: &'a SessionManager) -> Self {
        Self { manager }
    }

    /// Create the root unless the index already maps it. Returns `true` if
    /// the root was created.
    pub fn initialize(&self) -> PersistResult<bool> {
        let root = ResourceId::root();
        match self.manager.index().get_mapping(None, &root) {
            Ok(_) => {
                debug!("repository root already present");
                return Ok(false);
            }
            Err(IndexError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let transaction = TransactionId::new();
        let session = self.manager.get_session(&transaction);
        let create = ResourceOperation::CreateRdfSource(RdfSourceOperation::new(
            root,
            InteractionModel::BasicContainer,
        ));
        let result = session.persist(&create).and_then(|()| session.commit());
        if let Err(e) = &result {
            warn!(tx = %transaction, error = %e, "repository root creation failed");
            if let Err(rollback) = session.rollback() {
                warn!(tx = %transaction, error = %rollback, "rollback after failed initialization");
            }
        }
        self.manager.remove_session(&transaction);
        result?;

        info!(tx = %transaction, "repository root created");
        Ok(true)
    }
}
