use std::sync::Arc;

use bytes::Bytes;

use crate::error::OcflResult;
use crate::types::{CommitOption, CommittedVersion, VersionId, VersionInfo, WriteOutcome};

/// Staging area for one storage object.
///
/// All methods take `&self`: a session is shared by every caller working on
/// the same object inside one transaction, so implementations serialize
/// access internally.
///
/// Lifecycle: any number of reads and writes, then either `prepare` followed
/// by `commit`, or `close`. After `commit` or `close` every mutating call
/// fails with [`OcflError::Closed`](crate::OcflError::Closed).
pub trait ObjectSession: Send + Sync {
    /// Id of the storage object this session stages changes for.
    fn object_id(&self) -> &str;

    /// Read a file. With `version`, read it as of that version; otherwise
    /// read the staged state falling back to the object's current state.
    fn read(&self, subpath: &str, version: Option<&VersionId>) -> OcflResult<Bytes>;

    /// Stage a file write.
    fn write(&self, subpath: &str, content: Bytes) -> OcflResult<WriteOutcome>;

    /// Stage a file removal. Removing a missing file is not an error.
    fn delete(&self, subpath: &str) -> OcflResult<()>;

    /// Returns `true` if the file exists in the staged or current state.
    fn exists(&self, subpath: &str) -> OcflResult<bool> {
        match self.read(subpath, None) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Committed versions, oldest first. With `subpath`, only the versions
    /// in which that file changed.
    fn list_versions(&self, subpath: Option<&str>) -> OcflResult<Vec<VersionInfo>>;

    /// The option `commit` is called with by the persistence layer.
    fn default_commit_option(&self) -> CommitOption;

    fn set_default_commit_option(&self, option: CommitOption);

    /// Validate staged changes without making them durable.
    fn prepare(&self) -> OcflResult<()>;

    /// Make staged changes durable.
    fn commit(&self, option: CommitOption) -> OcflResult<CommittedVersion>;

    /// Discard staged changes and release the session. Idempotent.
    fn close(&self) -> OcflResult<()>;
}

/// Opens [`ObjectSession`]s by storage object id.
///
/// Opening a session for an object that does not exist yet is allowed; the
/// object comes into being on first commit.
pub trait ObjectSessionFactory: Send + Sync {
    fn new_session(&self, object_id: &str) -> OcflResult<Arc<dyn ObjectSession>>;
}
