use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use crate::config::OcflConfig;
use crate::error::{OcflError, OcflResult};
use crate::traits::{ObjectSession, ObjectSessionFactory};
use crate::types::{CommitOption, CommittedVersion, VersionId, VersionInfo, WriteOutcome};

/// Subpath to content digest.
type FileState = BTreeMap<String, String>;

struct StoredVersion {
    id: VersionId,
    created: DateTime<Utc>,
    state: FileState,
}

#[derive(Default)]
struct StoredObject {
    versions: Vec<StoredVersion>,
    head: Option<FileState>,
    /// Bumped on every commit; sessions compare it to detect conflicts.
    revision: u64,
}

impl StoredObject {
    fn current_state(&self) -> Option<&FileState> {
        self.head
            .as_ref()
            .or_else(|| self.versions.last().map(|v| &v.state))
    }
}

#[derive(Default)]
struct Storage {
    blobs: HashMap<String, Bytes>,
    objects: HashMap<String, StoredObject>,
}

impl Storage {
    fn revision(&self, object_id: &str) -> u64 {
        self.objects.get(object_id).map_or(0, |o| o.revision)
    }
}

/// In-memory versioned object repository.
///
/// Intended for tests and embedding. File content lives in a shared
/// BLAKE3-addressed blob pool, so identical content across files, versions
/// and objects is stored once. Everything sits behind one `RwLock`.
pub struct InMemoryOcflRepository {
    config: OcflConfig,
    storage: Arc<RwLock<Storage>>,
}

impl InMemoryOcflRepository {
    pub fn new(config: OcflConfig) -> Self {
        Self {
            config,
            storage: Arc::new(RwLock::new(Storage::default())),
        }
    }

    pub fn config(&self) -> &OcflConfig {
        &self.config
    }

    /// Returns `true` if the object has been committed at least once.
    pub fn contains_object(&self, object_id: &str) -> bool {
        self.storage
            .read()
            .expect("lock poisoned")
            .objects
            .contains_key(object_id)
    }

    /// Sorted ids of all committed objects.
    pub fn object_ids(&self) -> Vec<String> {
        let storage = self.storage.read().expect("lock poisoned");
        let mut ids: Vec<String> = storage.objects.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of immutable versions of an object (0 if unknown).
    pub fn version_count(&self, object_id: &str) -> usize {
        self.storage
            .read()
            .expect("lock poisoned")
            .objects
            .get(object_id)
            .map_or(0, |o| o.versions.len())
    }

    /// Returns `true` if the object has uncommitted-to-version changes.
    pub fn has_mutable_head(&self, object_id: &str) -> bool {
        self.storage
            .read()
            .expect("lock poisoned")
            .objects
            .get(object_id)
            .is_some_and(|o| o.head.is_some())
    }

    /// Number of distinct content blobs stored.
    pub fn blob_count(&self) -> usize {
        self.storage.read().expect("lock poisoned").blobs.len()
    }
}

impl Default for InMemoryOcflRepository {
    fn default() -> Self {
        Self::new(OcflConfig::default())
    }
}

impl ObjectSessionFactory for InMemoryOcflRepository {
    fn new_session(&self, object_id: &str) -> OcflResult<Arc<dyn ObjectSession>> {
        let base_revision = self
            .storage
            .read()
            .expect("lock poisoned")
            .revision(object_id);
        debug!(object_id, base_revision, "opened object session");
        Ok(Arc::new(InMemoryObjectSession {
            object_id: object_id.to_string(),
            storage: Arc::clone(&self.storage),
            inner: Mutex::new(SessionInner {
                staged: BTreeMap::new(),
                base_revision,
                commit_option: self.config.default_commit_option(),
                closed: false,
            }),
        }))
    }
}

impl std::fmt::Debug for InMemoryOcflRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.read().expect("lock poisoned");
        f.debug_struct("InMemoryOcflRepository")
            .field("object_count", &storage.objects.len())
            .field("blob_count", &storage.blobs.len())
            .finish()
    }
}

struct StagedFile {
    digest: String,
    content: Bytes,
}

struct SessionInner {
    /// `None` marks a staged removal.
    staged: BTreeMap<String, Option<StagedFile>>,
    base_revision: u64,
    commit_option: CommitOption,
    closed: bool,
}

struct InMemoryObjectSession {
    object_id: String,
    storage: Arc<RwLock<Storage>>,
    inner: Mutex<SessionInner>,
}

impl InMemoryObjectSession {
    fn not_found(&self, subpath: &str) -> OcflError {
        OcflError::NotFound {
            object_id: self.object_id.clone(),
            subpath: subpath.to_string(),
        }
    }

    fn ensure_open(&self, inner: &SessionInner) -> OcflResult<()> {
        if inner.closed {
            return Err(OcflError::Closed {
                object_id: self.object_id.clone(),
            });
        }
        Ok(())
    }

    fn check_conflict(&self, inner: &SessionInner, storage: &Storage) -> OcflResult<()> {
        if !inner.staged.is_empty() && storage.revision(&self.object_id) != inner.base_revision {
            return Err(OcflError::Conflict {
                object_id: self.object_id.clone(),
            });
        }
        Ok(())
    }
}

fn validate_subpath(subpath: &str) -> OcflResult<()> {
    let reason = if subpath.is_empty() {
        "empty"
    } else if subpath.starts_with('/') || subpath.ends_with('/') {
        "leading or trailing slash"
    } else if subpath
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        "empty or relative segment"
    } else {
        return Ok(());
    };
    Err(OcflError::InvalidPath {
        subpath: subpath.to_string(),
        reason: reason.to_string(),
    })
}

impl ObjectSession for InMemoryObjectSession {
    fn object_id(&self) -> &str {
        &self.object_id
    }

    fn read(&self, subpath: &str, version: Option<&VersionId>) -> OcflResult<Bytes> {
        validate_subpath(subpath)?;
        let inner = self.inner.lock().expect("lock poisoned");
        self.ensure_open(&inner)?;

        if version.is_none() {
            if let Some(staged) = inner.staged.get(subpath) {
                return staged
                    .as_ref()
                    .map(|file| file.content.clone())
                    .ok_or_else(|| self.not_found(subpath));
            }
        }

        let storage = self.storage.read().expect("lock poisoned");
        let object = storage.objects.get(&self.object_id);
        let state = match version {
            None => object.and_then(StoredObject::current_state),
            Some(version) => {
                let found = object
                    .and_then(|o| o.versions.iter().find(|v| v.id == *version))
                    .ok_or_else(|| OcflError::VersionNotFound {
                        object_id: self.object_id.clone(),
                        version: version.clone(),
                    })?;
                Some(&found.state)
            }
        };
        let digest = state
            .and_then(|s| s.get(subpath))
            .ok_or_else(|| self.not_found(subpath))?;
        storage
            .blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| OcflError::Storage(format!("missing content blob {digest}")))
    }

    fn write(&self, subpath: &str, content: Bytes) -> OcflResult<WriteOutcome> {
        validate_subpath(subpath)?;
        let mut inner = self.inner.lock().expect("lock poisoned");
        self.ensure_open(&inner)?;

        let digest = blake3::hash(&content).to_hex().to_string();
        let outcome = WriteOutcome {
            size: content.len() as u64,
            digest: digest.clone(),
            time_written: Utc::now(),
        };
        inner
            .staged
            .insert(subpath.to_string(), Some(StagedFile { digest, content }));
        debug!(object_id = %self.object_id, subpath, size = outcome.size, "staged write");
        Ok(outcome)
    }

    fn delete(&self, subpath: &str) -> OcflResult<()> {
        validate_subpath(subpath)?;
        let mut inner = self.inner.lock().expect("lock poisoned");
        self.ensure_open(&inner)?;
        inner.staged.insert(subpath.to_string(), None);
        debug!(object_id = %self.object_id, subpath, "staged delete");
        Ok(())
    }

    fn list_versions(&self, subpath: Option<&str>) -> OcflResult<Vec<VersionInfo>> {
        if let Some(subpath) = subpath {
            validate_subpath(subpath)?;
        }
        let storage = self.storage.read().expect("lock poisoned");
        let Some(object) = storage.objects.get(&self.object_id) else {
            return Ok(Vec::new());
        };

        let info = |v: &StoredVersion| VersionInfo {
            version_id: v.id.clone(),
            created: v.created,
        };
        let Some(subpath) = subpath else {
            return Ok(object.versions.iter().map(info).collect());
        };

        let mut changed = Vec::new();
        let mut previous: Option<&String> = None;
        for version in &object.versions {
            let current = version.state.get(subpath);
            if current.is_some() && current != previous {
                changed.push(info(version));
            }
            previous = current;
        }
        Ok(changed)
    }

    fn default_commit_option(&self) -> CommitOption {
        self.inner.lock().expect("lock poisoned").commit_option
    }

    fn set_default_commit_option(&self, option: CommitOption) {
        self.inner.lock().expect("lock poisoned").commit_option = option;
    }

    fn prepare(&self) -> OcflResult<()> {
        let inner = self.inner.lock().expect("lock poisoned");
        self.ensure_open(&inner)?;
        let storage = self.storage.read().expect("lock poisoned");
        self.check_conflict(&inner, &storage)
    }

    fn commit(&self, option: CommitOption) -> OcflResult<CommittedVersion> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        self.ensure_open(&inner)?;
        let mut storage = self.storage.write().expect("lock poisoned");
        self.check_conflict(&inner, &storage)?;

        let has_head = storage
            .objects
            .get(&self.object_id)
            .is_some_and(|o| o.head.is_some());
        let nothing_to_fold = option == CommitOption::UnversionedHead || !has_head;
        if inner.staged.is_empty() && nothing_to_fold {
            inner.closed = true;
            debug!(object_id = %self.object_id, ?option, "nothing to commit");
            return Ok(CommittedVersion {
                object_id: self.object_id.clone(),
                option,
                version_id: None,
            });
        }

        let staged = std::mem::take(&mut inner.staged);
        let Storage { blobs, objects } = &mut *storage;
        let object = objects.entry(self.object_id.clone()).or_default();
        let mut state = object.current_state().cloned().unwrap_or_default();
        for (subpath, file) in staged {
            match file {
                Some(StagedFile { digest, content }) => {
                    blobs.entry(digest.clone()).or_insert(content);
                    state.insert(subpath, digest);
                }
                None => {
                    state.remove(&subpath);
                }
            }
        }

        let version_id = match option {
            CommitOption::NewVersion => {
                let id = VersionId::from_number(object.versions.len() + 1);
                object.versions.push(StoredVersion {
                    id: id.clone(),
                    created: Utc::now().trunc_subsecs(0),
                    state,
                });
                object.head = None;
                Some(id)
            }
            CommitOption::UnversionedHead => {
                object.head = Some(state);
                None
            }
        };
        object.revision += 1;
        inner.closed = true;

        debug!(
            object_id = %self.object_id,
            ?option,
            version = ?version_id,
            revision = object.revision,
            "committed object session"
        );
        Ok(CommittedVersion {
            object_id: self.object_id.clone(),
            option,
            version_id,
        })
    }

    fn close(&self) -> OcflResult<()> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if !inner.closed {
            let discarded = inner.staged.len();
            inner.staged.clear();
            inner.closed = true;
            debug!(object_id = %self.object_id, discarded, "closed object session");
        }
        Ok(())
    }
}
