use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ldp_index::{InMemoryObjectIndex, ObjectIndex};
use ldp_ocfl::{InMemoryOcflRepository, ObjectSessionFactory};
use ldp_types::TransactionId;
use tracing::debug;

use crate::config::PersistenceConfig;
use crate::persister::PersisterRegistry;
use crate::session::PersistenceSession;

/// Hands out one [`PersistenceSession`] per transaction id plus a shared
/// read-only session.
///
/// The storage factory, object index and persister registry are built once
/// and shared by every session.
pub struct SessionManager {
    factory: Arc<dyn ObjectSessionFactory>,
    index: Arc<dyn ObjectIndex>,
    persisters: Arc<PersisterRegistry>,
    sessions: RwLock<HashMap<TransactionId, Arc<PersistenceSession>>>,
    read_only: Arc<PersistenceSession>,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn ObjectSessionFactory>,
        index: Arc<dyn ObjectIndex>,
        persisters: PersisterRegistry,
        config: &PersistenceConfig,
    ) -> Self {
        let persisters = Arc::new(persisters);
        let read_only = Arc::new(PersistenceSession::read_only(
            Arc::clone(&factory),
            Arc::clone(&index),
            Arc::clone(&persisters),
            config.read_only_cache_capacity,
        ));
        Self {
            factory,
            index,
            persisters,
            sessions: RwLock::new(HashMap::new()),
            read_only,
        }
    }

    /// A manager over fresh in-memory storage and index with the default
    /// persisters.
    pub fn in_memory(config: PersistenceConfig) -> Self {
        let factory = Arc::new(InMemoryOcflRepository::new(config.ocfl.clone()));
        let index = Arc::new(InMemoryObjectIndex::new());
        Self::new(
            factory,
            index,
            PersisterRegistry::with_default_persisters(),
            &config,
        )
    }

    /// The session for `transaction`, created on first request. Repeated
    /// calls return the same instance until it is removed.
    pub fn get_session(&self, transaction: &TransactionId) -> Arc<PersistenceSession> {
        if let Some(session) = self
            .sessions
            .read()
            .expect("lock poisoned")
            .get(transaction)
        {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().expect("lock poisoned");
        let session = sessions.entry(transaction.clone()).or_insert_with(|| {
            debug!(tx = %transaction, "persistence session created");
            Arc::new(PersistenceSession::new(
                transaction.clone(),
                Arc::clone(&self.factory),
                Arc::clone(&self.index),
                Arc::clone(&self.persisters),
            ))
        });
        Arc::clone(session)
    }

    /// The shared session without transaction identity.
    pub fn get_read_only_session(&self) -> Arc<PersistenceSession> {
        Arc::clone(&self.read_only)
    }

    /// Forget the session of a finished transaction.
    pub fn remove_session(&self, transaction: &TransactionId) -> Option<Arc<PersistenceSession>> {
        let removed = self
            .sessions
            .write()
            .expect("lock poisoned")
            .remove(transaction);
        if removed.is_some() {
            debug!(tx = %transaction, "persistence session removed");
        }
        removed
    }

    /// Number of transaction sessions currently held.
    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("lock poisoned").len()
    }

    pub fn index(&self) -> &dyn ObjectIndex {
        self.index.as_ref()
    }

    pub fn persisters(&self) -> &PersisterRegistry {
        &self.persisters
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.session_count())
            .field("persisters", &self.persisters.names())
            .finish()
    }
}
