//! Remote metadata sources.
//!
//! The comparator only needs to know whether the remote side holds a
//! resource and, for files, an opaque token that changes whenever the
//! remote content changes. Tokens are compared by equality and never
//! interpreted.

use crate::error::ReconcileResult;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use syncmeta_core::Synchronizer;
use syncmeta_store::{ResourceKind, WorkspacePath};

/// Opaque remote revision token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteToken(Bytes);

impl RemoteToken {
    /// Creates a token from raw bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The token a directory carries. Directories compare by existence only.
    #[must_use]
    pub fn directory() -> Self {
        Self(Bytes::new())
    }

    /// Creates the token a base revision corresponds to.
    #[must_use]
    pub fn from_revision(revision: &str) -> Self {
        Self(Bytes::copy_from_slice(revision.as_bytes()))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RemoteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for RemoteToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Read access to the remote side of a reconciliation.
pub trait RemoteMetadataSource: Send + Sync {
    /// Returns the remote token for `path`, or `None` if the remote does not
    /// hold it.
    fn remote_token(&self, path: &WorkspacePath) -> ReconcileResult<Option<RemoteToken>>;

    /// Returns the remote children of `dir`.
    fn remote_members(&self, dir: &WorkspacePath) -> ReconcileResult<Vec<WorkspacePath>>;

    /// Returns what the remote holds at `path`.
    ///
    /// The default treats every existing remote resource as a file.
    fn remote_kind(&self, path: &WorkspacePath) -> ReconcileResult<Option<ResourceKind>> {
        Ok(self.remote_token(path)?.map(|_| ResourceKind::File))
    }
}

#[derive(Debug, Clone)]
enum SnapshotEntry {
    File(RemoteToken),
    Directory,
}

/// In-memory remote state.
///
/// Adding a resource creates its missing parent directories. The workspace
/// root is implicit and never reported.
#[derive(Debug, Default)]
pub struct SnapshotRemote {
    entries: RwLock<BTreeMap<WorkspacePath, SnapshotEntry>>,
}

impl SnapshotRemote {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file with the given token.
    pub fn add_file(&self, path: &WorkspacePath, token: RemoteToken) {
        let mut entries = self.entries.write();
        Self::add_parents(&mut entries, path);
        entries.insert(path.clone(), SnapshotEntry::File(token));
    }

    /// Records a file whose token is a revision string.
    pub fn add_revision(&self, path: &WorkspacePath, revision: &str) {
        self.add_file(path, RemoteToken::from_revision(revision));
    }

    /// Records a directory.
    pub fn add_dir(&self, path: &WorkspacePath) {
        if path.is_root() {
            return;
        }
        let mut entries = self.entries.write();
        Self::add_parents(&mut entries, path);
        entries.insert(path.clone(), SnapshotEntry::Directory);
    }

    /// Removes `path` and everything below it.
    pub fn remove(&self, path: &WorkspacePath) {
        self.entries.write().retain(|p, _| !path.contains(p));
    }

    /// Returns the number of recorded resources.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn add_parents(entries: &mut BTreeMap<WorkspacePath, SnapshotEntry>, path: &WorkspacePath) {
        for ancestor in path.ancestors() {
            if !ancestor.is_root() {
                entries.entry(ancestor).or_insert(SnapshotEntry::Directory);
            }
        }
    }
}

impl RemoteMetadataSource for SnapshotRemote {
    fn remote_token(&self, path: &WorkspacePath) -> ReconcileResult<Option<RemoteToken>> {
        Ok(self.entries.read().get(path).map(|entry| match entry {
            SnapshotEntry::File(token) => token.clone(),
            SnapshotEntry::Directory => RemoteToken::directory(),
        }))
    }

    fn remote_members(&self, dir: &WorkspacePath) -> ReconcileResult<Vec<WorkspacePath>> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter(|p| p.parent().as_ref() == Some(dir))
            .cloned()
            .collect())
    }

    fn remote_kind(&self, path: &WorkspacePath) -> ReconcileResult<Option<ResourceKind>> {
        Ok(self.entries.read().get(path).map(|entry| match entry {
            SnapshotEntry::File(_) => ResourceKind::File,
            SnapshotEntry::Directory => ResourceKind::Directory,
        }))
    }
}

/// A remote that has not moved since the last update.
///
/// Reports exactly the base recorded in the cache, so every difference the
/// comparator finds is an outgoing change. Directories with a folder record
/// exist remotely even without an entry in their parent.
pub struct MirrorRemote {
    sync: Arc<Synchronizer>,
}

impl MirrorRemote {
    /// Creates a mirror of the session's base state.
    pub fn new(sync: Arc<Synchronizer>) -> Self {
        Self { sync }
    }
}

impl RemoteMetadataSource for MirrorRemote {
    fn remote_token(&self, path: &WorkspacePath) -> ReconcileResult<Option<RemoteToken>> {
        if path.is_root() {
            return Ok(None);
        }
        let Some(entry) = self.sync.get_resource_sync(path)? else {
            let managed = self.sync.is_managed_dir(path)?;
            return Ok(managed.then(RemoteToken::directory));
        };
        if entry.is_directory() {
            return Ok(Some(RemoteToken::directory()));
        }
        if entry.is_added() {
            return Ok(None);
        }
        Ok(entry.revision().map(RemoteToken::from_revision))
    }

    fn remote_members(&self, dir: &WorkspacePath) -> ReconcileResult<Vec<WorkspacePath>> {
        let children = self.sync.cache().get_children_sync(dir)?;
        Ok(children
            .iter()
            .filter(|entry| !entry.is_added())
            .map(|entry| dir.join(entry.name()))
            .collect())
    }

    fn remote_kind(&self, path: &WorkspacePath) -> ReconcileResult<Option<ResourceKind>> {
        if path.is_root() {
            return Ok(None);
        }
        match self.sync.get_resource_sync(path)? {
            Some(entry) if entry.is_directory() => Ok(Some(ResourceKind::Directory)),
            Some(entry) if entry.is_added() => Ok(None),
            Some(_) => Ok(Some(ResourceKind::File)),
            None => Ok(self
                .sync
                .is_managed_dir(path)?
                .then_some(ResourceKind::Directory)),
        }
    }
}
