//! Fixtures shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use bytes::Bytes;
use ldp_index::{InMemoryObjectIndex, ObjectMapping};
use ldp_ocfl::{
    CommitOption, CommittedVersion, InMemoryOcflRepository, ObjectSession, ObjectSessionFactory,
    OcflConfig, OcflError, OcflResult, VersionId, VersionInfo, WriteOutcome,
};
use ldp_types::{ResourceHeaders, ResourceId, Term, TransactionId, Triple};

use crate::error::PersistResult;
use crate::operation::ResourceOperation;
use crate::persister::{PersistContext, Persister};

pub(crate) const DC_TITLE: &str = "http://purl.org/dc/terms/title";

/// Route log output through the test harness. Safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub(crate) fn id(raw: &str) -> ResourceId {
    ResourceId::parse(raw).unwrap()
}

pub(crate) fn title(subject: &str, value: &str) -> Triple {
    Triple::new(Term::iri(subject), Term::iri(DC_TITLE), Term::literal(value))
}

// ---------------------------------------------------------------------------
// Persister fixture
// ---------------------------------------------------------------------------

/// One transaction against fresh in-memory storage, driving persisters
/// directly.
pub(crate) struct Fixture {
    pub repo: InMemoryOcflRepository,
    pub index: InMemoryObjectIndex,
    pub tx: TransactionId,
    sessions: Mutex<HashMap<String, Arc<dyn ObjectSession>>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(OcflConfig::default())
    }

    pub fn with_config(config: OcflConfig) -> Self {
        Self {
            repo: InMemoryOcflRepository::new(config),
            index: InMemoryObjectIndex::new(),
            tx: TransactionId::from("fixture-tx"),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> PersistContext<'_> {
        PersistContext {
            transaction: &self.tx,
            index: &self.index,
        }
    }

    pub fn session(&self, object_id: &str) -> Arc<dyn ObjectSession> {
        let mut sessions = self.sessions.lock().unwrap();
        Arc::clone(
            sessions
                .entry(object_id.to_string())
                .or_insert_with(|| self.repo.new_session(object_id).unwrap()),
        )
    }

    pub fn apply(
        &self,
        persister: &dyn Persister,
        operation: &ResourceOperation,
    ) -> PersistResult<ObjectMapping> {
        let context = self.context();
        let mapping = persister.resolve_mapping(&context, operation)?;
        let session = self.session(&mapping.storage_object_id);
        persister.persist(&context, session.as_ref(), operation, &mapping)?;
        Ok(mapping)
    }

    /// Staged or committed content, `None` if absent.
    pub fn read(&self, object_id: &str, subpath: &str) -> Option<Bytes> {
        self.session(object_id).read(subpath, None).ok()
    }

    pub fn headers(&self, object_id: &str, subpath: &str) -> Option<ResourceHeaders> {
        self.read(object_id, subpath)
            .map(|bytes| ResourceHeaders::from_json(&bytes).unwrap())
    }

    pub fn mapping(&self, raw: &str) -> PersistResult<ObjectMapping> {
        self.context().mapping(&id(raw))
    }
}

// ---------------------------------------------------------------------------
// Recording object sessions
// ---------------------------------------------------------------------------

/// A call observed on a [`RecordingSession`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    WriteStart(String),
    WriteEnd(String),
    VersionedRead(String, VersionId),
    Prepare(String),
    Commit(String, CommitOption),
    Close(String),
}

impl Event {
    pub fn object_id(&self) -> &str {
        match self {
            Self::WriteStart(id)
            | Self::WriteEnd(id)
            | Self::VersionedRead(id, _)
            | Self::Prepare(id)
            | Self::Commit(id, _)
            | Self::Close(id) => id,
        }
    }
}

#[derive(Default)]
struct HoldState {
    armed: bool,
    held: usize,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<Event>>,
    fail_prepare: Mutex<HashSet<String>>,
    fail_commit: Mutex<HashSet<String>>,
    versions: Mutex<HashMap<String, Vec<VersionInfo>>>,
    hold: Mutex<HoldState>,
    hold_changed: Condvar,
    created: AtomicUsize,
}

impl Shared {
    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn pause_if_held(&self) {
        let mut hold = self.hold.lock().unwrap();
        if !hold.armed {
            return;
        }
        hold.held += 1;
        self.hold_changed.notify_all();
        while hold.armed {
            hold = self.hold_changed.wait(hold).unwrap();
        }
        hold.held -= 1;
    }
}

/// Session factory over in-memory storage whose sessions log every
/// lifecycle call and can be told to stall or fail.
pub(crate) struct RecordingFactory {
    repo: InMemoryOcflRepository,
    shared: Arc<Shared>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::with_config(OcflConfig::default())
    }

    pub fn with_config(config: OcflConfig) -> Self {
        Self {
            repo: InMemoryOcflRepository::new(config),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn repo(&self) -> &InMemoryOcflRepository {
        &self.repo
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }

    pub fn fail_prepare(&self, object_id: &str) {
        self.shared
            .fail_prepare
            .lock()
            .unwrap()
            .insert(object_id.to_string());
    }

    pub fn fail_commit(&self, object_id: &str) {
        self.shared
            .fail_commit
            .lock()
            .unwrap()
            .insert(object_id.to_string());
    }

    /// Replace the version listing reported for `object_id`. Versioned
    /// reads are then answered from the current state and logged.
    pub fn set_versions(&self, object_id: &str, versions: Vec<VersionInfo>) {
        self.shared
            .versions
            .lock()
            .unwrap()
            .insert(object_id.to_string(), versions);
    }

    /// Make every subsequent write stall after logging `WriteStart`.
    pub fn hold_writes(&self) {
        self.shared.hold.lock().unwrap().armed = true;
    }

    /// Block until `count` writes are stalled.
    pub fn wait_for_held(&self, count: usize) {
        let mut hold = self.shared.hold.lock().unwrap();
        while hold.held < count {
            hold = self.shared.hold_changed.wait(hold).unwrap();
        }
    }

    pub fn release_writes(&self) {
        self.shared.hold.lock().unwrap().armed = false;
        self.shared.hold_changed.notify_all();
    }
}

impl ObjectSessionFactory for RecordingFactory {
    fn new_session(&self, object_id: &str) -> OcflResult<Arc<dyn ObjectSession>> {
        self.shared.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingSession {
            inner: self.repo.new_session(object_id)?,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct RecordingSession {
    inner: Arc<dyn ObjectSession>,
    shared: Arc<Shared>,
}

impl RecordingSession {
    fn id(&self) -> String {
        self.inner.object_id().to_string()
    }

    fn scripted_versions(&self) -> Option<Vec<VersionInfo>> {
        self.shared
            .versions
            .lock()
            .unwrap()
            .get(self.inner.object_id())
            .cloned()
    }
}

impl ObjectSession for RecordingSession {
    fn object_id(&self) -> &str {
        self.inner.object_id()
    }

    fn read(&self, subpath: &str, version: Option<&VersionId>) -> OcflResult<Bytes> {
        match version {
            Some(version) if self.scripted_versions().is_some() => {
                self.shared
                    .record(Event::VersionedRead(self.id(), version.clone()));
                self.inner.read(subpath, None)
            }
            _ => self.inner.read(subpath, version),
        }
    }

    fn write(&self, subpath: &str, content: Bytes) -> OcflResult<WriteOutcome> {
        self.shared.record(Event::WriteStart(self.id()));
        self.shared.pause_if_held();
        let outcome = self.inner.write(subpath, content);
        self.shared.record(Event::WriteEnd(self.id()));
        outcome
    }

    fn delete(&self, subpath: &str) -> OcflResult<()> {
        self.inner.delete(subpath)
    }

    fn list_versions(&self, subpath: Option<&str>) -> OcflResult<Vec<VersionInfo>> {
        match self.scripted_versions() {
            Some(versions) => Ok(versions),
            None => self.inner.list_versions(subpath),
        }
    }

    fn default_commit_option(&self) -> CommitOption {
        self.inner.default_commit_option()
    }

    fn set_default_commit_option(&self, option: CommitOption) {
        self.inner.set_default_commit_option(option)
    }

    fn prepare(&self) -> OcflResult<()> {
        self.shared.record(Event::Prepare(self.id()));
        if self.shared.fail_prepare.lock().unwrap().contains(self.inner.object_id()) {
            return Err(OcflError::Conflict {
                object_id: self.id(),
            });
        }
        self.inner.prepare()
    }

    fn commit(&self, option: CommitOption) -> OcflResult<CommittedVersion> {
        self.shared.record(Event::Commit(self.id(), option));
        if self.shared.fail_commit.lock().unwrap().contains(self.inner.object_id()) {
            return Err(OcflError::Storage("disk full".into()));
        }
        self.inner.commit(option)
    }

    fn close(&self) -> OcflResult<()> {
        self.shared.record(Event::Close(self.id()));
        self.inner.close()
    }
}
