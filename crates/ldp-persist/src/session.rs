//! The transaction coordinator.
//!
//! A [`PersistenceSession`] routes resource operations to persisters, keeps
//! one [`ObjectSession`] per touched storage object, and drives those
//! sessions through prepare and commit (or close) exactly once.
//!
//! Commit is not atomic across storage objects. Objects are committed one
//! at a time in id order; if one fails, the ones before it stay durable and
//! are reported by [`PersistError::CommitFailed`]. The index transaction is
//! committed only after every object, so a failure never publishes index
//! entries for content that was not written.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use ldp_index::{IndexError, ObjectIndex, ObjectMapping};
use ldp_ocfl::{CommitOption, ObjectSession, ObjectSessionFactory, VersionId};
use ldp_types::rdf::parse_ntriples;
use ldp_types::{RdfStream, ResourceHeaders, ResourceId, TransactionId};
use tracing::{debug, error, info, warn};

use crate::barrier::QuiescenceBarrier;
use crate::error::{PersistError, PersistResult};
use crate::operation::ResourceOperation;
use crate::paths;
use crate::persister::{PersistContext, PersisterRegistry};
use crate::state::SessionState;

const READ_ONLY_LABEL: &str = "read-only";

/// Per-object staging map.
///
/// Find-or-create happens under one lock, so concurrent first touches of
/// an object share a single session. With a capacity the oldest entry is
/// evicted once the bound is exceeded.
struct ObjectSessions {
    sessions: HashMap<String, Arc<dyn ObjectSession>>,
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl ObjectSessions {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            sessions: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn evict_overflow(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.sessions.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            let Some(session) = self.sessions.remove(&oldest) else {
                continue;
            };
            // A reader still holding the session closes nothing; it is
            // simply dropped once that read finishes.
            if Arc::strong_count(&session) == 1 {
                if let Err(e) = session.close() {
                    warn!(object = %oldest, error = %e, "failed to close evicted object session");
                }
            }
            debug!(object = %oldest, "evicted read-only object session");
        }
    }
}

/// Coordinates the persistence work of one transaction.
///
/// Sessions without a transaction id are read-only: they serve reads from
/// committed state, reject [`persist`](Self::persist), and treat
/// [`commit`](Self::commit) and [`rollback`](Self::rollback) as no-ops.
pub struct PersistenceSession {
    transaction: Option<TransactionId>,
    factory: Arc<dyn ObjectSessionFactory>,
    index: Arc<dyn ObjectIndex>,
    persisters: Arc<PersisterRegistry>,
    state: Mutex<SessionState>,
    barrier: QuiescenceBarrier,
    /// Serializes commit and rollback.
    lifecycle: Mutex<()>,
    sessions: Mutex<ObjectSessions>,
    /// Objects committed so far, with the option they were committed with.
    committed: Mutex<Vec<(String, CommitOption)>>,
}

impl PersistenceSession {
    /// A session for `transaction`.
    pub fn new(
        transaction: TransactionId,
        factory: Arc<dyn ObjectSessionFactory>,
        index: Arc<dyn ObjectIndex>,
        persisters: Arc<PersisterRegistry>,
    ) -> Self {
        Self::build(Some(transaction), factory, index, persisters, None)
    }

    /// A read-only session keeping at most `capacity` object sessions.
    pub fn read_only(
        factory: Arc<dyn ObjectSessionFactory>,
        index: Arc<dyn ObjectIndex>,
        persisters: Arc<PersisterRegistry>,
        capacity: usize,
    ) -> Self {
        Self::build(None, factory, index, persisters, Some(capacity.max(1)))
    }

    fn build(
        transaction: Option<TransactionId>,
        factory: Arc<dyn ObjectSessionFactory>,
        index: Arc<dyn ObjectIndex>,
        persisters: Arc<PersisterRegistry>,
        capacity: Option<usize>,
    ) -> Self {
        Self {
            transaction,
            factory,
            index,
            persisters,
            state: Mutex::new(SessionState::NotStarted),
            barrier: QuiescenceBarrier::new(),
            lifecycle: Mutex::new(()),
            sessions: Mutex::new(ObjectSessions::new(capacity)),
            committed: Mutex::new(Vec::new()),
        }
    }

    /// The transaction id, `None` for the read-only session.
    pub fn id(&self) -> Option<&TransactionId> {
        self.transaction.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.transaction.is_none()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("lock poisoned")
    }

    /// Ids of the storage objects with an open object session, sorted.
    pub fn touched_objects(&self) -> Vec<String> {
        let sessions = self.sessions.lock().expect("lock poisoned");
        let mut ids: Vec<String> = sessions.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn label(&self) -> String {
        self.transaction
            .as_ref()
            .map_or_else(|| READ_ONLY_LABEL.to_string(), |tx| tx.to_string())
    }

    fn ensure_open(&self) -> PersistResult<()> {
        let state = self.state();
        if !state.is_open() {
            return Err(PersistError::SessionClosed {
                session: self.label(),
                state,
            });
        }
        Ok(())
    }

    /// Move to `to`, returning the state left behind.
    fn transition(&self, to: SessionState) -> PersistResult<SessionState> {
        let mut state = self.state.lock().expect("lock poisoned");
        let from = *state;
        *state = from.transition(to)?;
        debug!(session = %self.label(), from = %from, to = %to, "session state changed");
        Ok(from)
    }

    fn object_session(&self, object_id: &str) -> PersistResult<Arc<dyn ObjectSession>> {
        let mut cache = self.sessions.lock().expect("lock poisoned");
        if let Some(session) = cache.sessions.get(object_id) {
            return Ok(Arc::clone(session));
        }
        let session = self.factory.new_session(object_id)?;
        cache
            .sessions
            .insert(object_id.to_string(), Arc::clone(&session));
        cache.order.push_back(object_id.to_string());
        cache.evict_overflow();
        debug!(session = %self.label(), object = object_id, "object session opened");
        Ok(session)
    }

    fn sorted_sessions(&self) -> Vec<(String, Arc<dyn ObjectSession>)> {
        let cache = self.sessions.lock().expect("lock poisoned");
        let mut sessions: Vec<_> = cache
            .sessions
            .iter()
            .map(|(id, session)| (id.clone(), Arc::clone(session)))
            .collect();
        sessions.sort_by(|a, b| a.0.cmp(&b.0));
        sessions
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Apply `operation` inside this transaction.
    ///
    /// Safe to call from several threads at once. Operations on the same
    /// storage object share its object session.
    pub fn persist(&self, operation: &ResourceOperation) -> PersistResult<()> {
        let Some(transaction) = &self.transaction else {
            return Err(PersistError::ReadOnly("persist"));
        };
        let _guard = self.barrier.enter();
        self.ensure_open()?;

        let persister = self.persisters.select(operation)?;
        let context = PersistContext {
            transaction,
            index: self.index.as_ref(),
        };
        let mapping = persister.resolve_mapping(&context, operation)?;
        let session = self.object_session(&mapping.storage_object_id)?;
        debug!(
            tx = %transaction,
            operation = %operation,
            persister = persister.name(),
            object = %mapping.storage_object_id,
            "persisting operation"
        );
        persister.persist(&context, session.as_ref(), operation, &mapping)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Mapping and object session for `id`. A resource without a storage
    /// object is reported as [`PersistError::ItemNotFound`].
    fn locate(&self, id: &ResourceId) -> PersistResult<(ObjectMapping, Arc<dyn ObjectSession>)> {
        let mapping = match self.index.get_mapping(self.transaction.as_ref(), id) {
            Ok(mapping) => mapping,
            Err(IndexError::NotFound { resource_id }) => {
                return Err(PersistError::ItemNotFound(resource_id))
            }
            Err(e) => return Err(e.into()),
        };
        let session = self.object_session(&mapping.storage_object_id)?;
        Ok((mapping, session))
    }

    /// The version whose creation instant equals `instant` at whole-second
    /// precision. When several match, the latest wins.
    fn resolve_version(
        &self,
        session: &dyn ObjectSession,
        subpath: &str,
        id: &ResourceId,
        instant: Option<DateTime<Utc>>,
    ) -> PersistResult<Option<VersionId>> {
        let Some(instant) = instant else {
            return Ok(None);
        };
        let wanted = instant.trunc_subsecs(0);
        session
            .list_versions(Some(subpath))?
            .into_iter()
            .rev()
            .find(|v| v.created.trunc_subsecs(0) == wanted)
            .map(|v| Some(v.version_id))
            .ok_or_else(|| {
                PersistError::ItemNotFound(format!(
                    "no version of {} at {}",
                    id.full_id(),
                    wanted.to_rfc3339()
                ))
            })
    }

    /// Headers of `resource` plus what is needed to read its content at the
    /// same version.
    fn read_headers_at(
        &self,
        resource: &ResourceId,
        version: Option<DateTime<Utc>>,
    ) -> PersistResult<(ResourceHeaders, Arc<dyn ObjectSession>, Option<VersionId>)> {
        let (mapping, session) = self.locate(resource)?;
        let subpath = paths::header_path(&mapping.owner_resource_id, resource)?;
        let version = self.resolve_version(session.as_ref(), &subpath, resource, version)?;
        let bytes = session.read(&subpath, version.as_ref())?;
        Ok((ResourceHeaders::from_json(&bytes)?, session, version))
    }

    fn read_content(
        session: &dyn ObjectSession,
        headers: &ResourceHeaders,
        version: Option<&VersionId>,
    ) -> PersistResult<Bytes> {
        let path = headers
            .content_path
            .as_deref()
            .ok_or_else(|| PersistError::ItemNotFound(format!("{} has no content", headers.id)))?;
        Ok(session.read(path, version)?)
    }

    /// Server-managed headers of `id`, current or as of `version`.
    ///
    /// A memento id carries its own instant; an explicit `version` takes
    /// precedence.
    pub fn get_headers(
        &self,
        id: &ResourceId,
        version: Option<DateTime<Utc>>,
    ) -> PersistResult<ResourceHeaders> {
        let _guard = self.barrier.enter();
        self.ensure_open()?;
        let (headers, _, _) = self.read_headers_at(&id.as_resource(), version.or(id.memento_instant()))?;
        Ok(headers)
    }

    /// User triples of an RDF source. A description's triples are about
    /// its binary.
    pub fn get_triples(
        &self,
        id: &ResourceId,
        version: Option<DateTime<Utc>>,
    ) -> PersistResult<RdfStream> {
        let _guard = self.barrier.enter();
        self.ensure_open()?;
        let resource = id.as_resource();
        let (headers, session, version) =
            self.read_headers_at(&resource, version.or(id.memento_instant()))?;
        if headers.interaction_model.is_binary() {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "a binary has no triples; read its description",
            ));
        }
        let content = Self::read_content(session.as_ref(), &headers, version.as_ref())?;
        let topic = if resource.is_description() {
            resource.as_base()
        } else {
            resource
        };
        Ok(RdfStream::new(topic, parse_ntriples(&content)?))
    }

    /// Server-managed triples derived from the headers of `id`. For a
    /// description these are the binary's properties.
    pub fn get_managed_properties(
        &self,
        id: &ResourceId,
        version: Option<DateTime<Utc>>,
    ) -> PersistResult<RdfStream> {
        let _guard = self.barrier.enter();
        self.ensure_open()?;
        let resource = if id.is_description() {
            id.as_base()
        } else {
            id.as_resource()
        };
        let (headers, _, _) = self.read_headers_at(&resource, version.or(id.memento_instant()))?;
        let triples = headers.managed_triples(&resource);
        Ok(RdfStream::new(resource, triples))
    }

    /// Stored content of `id`.
    ///
    /// For a binary this is its bytes. A description id yields the
    /// description's own N-Triples, never the binary it describes.
    pub fn get_binary_content(
        &self,
        id: &ResourceId,
        version: Option<DateTime<Utc>>,
    ) -> PersistResult<Bytes> {
        let _guard = self.barrier.enter();
        self.ensure_open()?;
        let resource = id.as_resource();
        let (headers, session, version) =
            self.read_headers_at(&resource, version.or(id.memento_instant()))?;
        if !resource.is_description() && !headers.interaction_model.is_binary() {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "not a binary",
            ));
        }
        if let Some(url) = &headers.external_url {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                format!("content is held externally at {url}"),
            ));
        }
        Self::read_content(session.as_ref(), &headers, version.as_ref())
    }

    /// Instants of the committed versions in which `id` changed, oldest
    /// first.
    pub fn list_versions(&self, id: &ResourceId) -> PersistResult<Vec<DateTime<Utc>>> {
        let _guard = self.barrier.enter();
        self.ensure_open()?;
        let resource = id.as_resource();
        let (mapping, session) = self.locate(&resource)?;
        let subpath = paths::header_path(&mapping.owner_resource_id, &resource)?;
        Ok(session
            .list_versions(Some(&subpath))?
            .into_iter()
            .map(|v| v.created)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Make the transaction durable.
    ///
    /// Waits for in-flight operations, prepares every object session, then
    /// commits them in object-id order followed by the index transaction.
    pub fn commit(&self) -> PersistResult<()> {
        let Some(transaction) = &self.transaction else {
            debug!("commit on the read-only session ignored");
            return Ok(());
        };
        let _lifecycle = self.lifecycle.lock().expect("lock poisoned");
        self.transition(SessionState::CommitStarted)?;
        self.barrier.await_quiescence();

        let sessions = self.sorted_sessions();
        info!(tx = %transaction, objects = sessions.len(), "committing transaction");

        for (object_id, session) in &sessions {
            if let Err(e) = session.prepare() {
                self.transition(SessionState::PrepareFailed)?;
                warn!(tx = %transaction, object = %object_id, error = %e, "prepare failed");
                return Err(PersistError::PrepareFailed {
                    object_id: object_id.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let mut committed = Vec::with_capacity(sessions.len());
        for (object_id, session) in &sessions {
            let option = session.default_commit_option();
            match session.commit(option) {
                Ok(version) => {
                    debug!(
                        tx = %transaction,
                        object = %object_id,
                        ?option,
                        version = ?version.version_id,
                        "object committed"
                    );
                    self.committed
                        .lock()
                        .expect("lock poisoned")
                        .push((object_id.clone(), option));
                    committed.push(object_id.clone());
                }
                Err(e) => {
                    self.transition(SessionState::CommitFailed)?;
                    error!(
                        tx = %transaction,
                        object = %object_id,
                        committed = committed.len(),
                        error = %e,
                        "commit failed partway"
                    );
                    return Err(PersistError::CommitFailed {
                        target: object_id.clone(),
                        reason: e.to_string(),
                        committed,
                    });
                }
            }
        }

        if let Err(e) = self.index.commit(transaction) {
            self.transition(SessionState::CommitFailed)?;
            error!(tx = %transaction, error = %e, "index commit failed");
            return Err(PersistError::CommitFailed {
                target: "object index".to_string(),
                reason: e.to_string(),
                committed,
            });
        }

        self.transition(SessionState::Committed)?;
        info!(tx = %transaction, objects = committed.len(), "transaction committed");
        Ok(())
    }

    /// Abandon the transaction.
    ///
    /// Uncommitted object sessions are closed. Objects already committed by
    /// a failed commit cannot be undone; each one is reported in
    /// [`PersistError::RollbackFailed`].
    pub fn rollback(&self) -> PersistResult<()> {
        let Some(transaction) = &self.transaction else {
            debug!("rollback on the read-only session ignored");
            return Ok(());
        };
        let _lifecycle = self.lifecycle.lock().expect("lock poisoned");
        let from = self.transition(SessionState::RollingBack)?;
        if from == SessionState::NotStarted {
            self.barrier.await_quiescence();
        }

        let committed: HashMap<String, CommitOption> = self
            .committed
            .lock()
            .expect("lock poisoned")
            .iter()
            .cloned()
            .collect();
        let mut failures = Vec::new();
        for (object_id, session) in self.sorted_sessions() {
            match committed.get(&object_id) {
                None => {
                    if let Err(e) = session.close() {
                        warn!(tx = %transaction, object = %object_id, error = %e, "failed to close object session");
                    }
                }
                Some(CommitOption::NewVersion) => failures.push(format!(
                    "{object_id}: rolling back a committed version is not supported"
                )),
                Some(CommitOption::UnversionedHead) => failures.push(format!(
                    "{object_id}: already committed to the unversioned head and cannot be rolled back"
                )),
            }
        }
        if let Err(e) = self.index.rollback(transaction) {
            failures.push(format!("object index: {e}"));
        }

        if failures.is_empty() {
            self.transition(SessionState::RolledBack)?;
            info!(tx = %transaction, "transaction rolled back");
            Ok(())
        } else {
            self.transition(SessionState::RollbackFailed)?;
            error!(tx = %transaction, failures = failures.len(), "rollback incomplete");
            Err(PersistError::RollbackFailed { failures })
        }
    }
}

impl std::fmt::Debug for PersistenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceSession")
            .field("transaction", &self.transaction)
            .field("state", &self.state())
            .field("objects", &self.touched_objects().len())
            .finish()
    }
}
