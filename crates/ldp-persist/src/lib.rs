//! Transactional persistence sessions for the LDP repository.
//!
//! Resource operations submitted inside a transaction are routed to a
//! persister, staged in the object session of the storage object that owns
//! the resource, and made durable together on commit. Reads go through the
//! same session so a transaction sees its own staged writes.
//!
//! # Quick Start
//!
//! ```rust
//! use ldp_persist::{
//!     PersistenceConfig, RdfSourceOperation, RepositoryInitializer, ResourceOperation,
//!     SessionManager,
//! };
//! use ldp_types::{InteractionModel, ResourceId, TransactionId};
//!
//! let manager = SessionManager::in_memory(PersistenceConfig::default());
//! RepositoryInitializer::new(&manager).initialize().unwrap();
//!
//! let tx = TransactionId::new();
//! let session = manager.get_session(&tx);
//! let id = ResourceId::parse("info:fedora/collection").unwrap();
//! let op = RdfSourceOperation::new(id.clone(), InteractionModel::BasicContainer);
//! session.persist(&ResourceOperation::CreateRdfSource(op)).unwrap();
//! session.commit().unwrap();
//! manager.remove_session(&tx);
//!
//! let headers = manager.get_read_only_session().get_headers(&id, None).unwrap();
//! assert!(headers.object_root);
//! ```
//!
//! # Modules
//!
//! - [`session`] -- the per-transaction coordinator and its quiescence barrier
//! - [`manager`] -- session lookup by transaction id, read-only singleton
//! - [`persister`] -- operation handlers and their registry
//! - [`paths`] -- where resources live inside a storage object
//! - [`state`] -- the session lifecycle state machine

pub mod barrier;
pub mod config;
pub mod error;
pub mod initializer;
pub mod manager;
pub mod operation;
pub mod paths;
pub mod persister;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;

pub use barrier::{BarrierGuard, QuiescenceBarrier};
pub use config::PersistenceConfig;
pub use error::{PersistError, PersistResult};
pub use initializer::RepositoryInitializer;
pub use manager::SessionManager;
pub use operation::{
    ExternalContent, NonRdfSourceOperation, OperationKind, RdfSourceOperation, RelaxedProperties,
    ResourceOperation,
};
pub use persister::{
    CreateVersionPersister, DeletePersister, NonRdfSourcePersister, PersistContext, Persister,
    PersisterRegistry, PurgePersister, RdfSourcePersister,
};
pub use session::PersistenceSession;
pub use state::SessionState;
