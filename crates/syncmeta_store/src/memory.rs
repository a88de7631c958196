//! In-memory store and tree for testing.

use crate::error::{StoreError, StoreResult};
use crate::path::WorkspacePath;
use crate::store::{MetadataStore, StoreKey};
use crate::tree::{ResourceStat, WorkspaceTree};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// An in-memory metadata store.
///
/// This store keeps all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// It counts writes and deletes, and can be told to fail every write or
/// delete under a given directory, which is how flush recovery is tested.
///
/// # Example
///
/// ```rust
/// use syncmeta_store::{InMemoryStore, MetadataKind, MetadataStore, StoreKey, WorkspacePath};
///
/// let store = InMemoryStore::new();
/// let key = StoreKey::new(WorkspacePath::new("proj"), MetadataKind::FolderSync);
/// store.write(&key, b"Rroot\nPproj\n").unwrap();
/// assert_eq!(store.write_count(), 1);
/// store.delete(&key).unwrap();
/// assert!(store.read(&key).unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<StoreKey, Vec<u8>>>,
    failing: RwLock<HashSet<WorkspacePath>>,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns the number of successful deletes so far.
    #[must_use]
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns all stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<StoreKey> {
        let mut keys: Vec<_> = self.records.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Makes every write and delete for records owned by `dir` fail.
    pub fn fail_writes_for(&self, dir: WorkspacePath) {
        self.failing.write().insert(dir);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    fn check_failure(&self, key: &StoreKey) -> StoreResult<()> {
        if self.failing.read().contains(&key.path) {
            return Err(StoreError::injected(key));
        }
        Ok(())
    }
}

impl MetadataStore for InMemoryStore {
    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn write(&self, key: &StoreKey, data: &[u8]) -> StoreResult<()> {
        self.check_failure(key)?;
        self.records.write().insert(key.clone(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> StoreResult<()> {
        self.check_failure(key)?;
        self.records.write().remove(key);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// An in-memory workspace tree.
///
/// Adding a resource implicitly creates its parent directories, mirroring
/// what a real file system requires.
#[derive(Debug, Default)]
pub struct InMemoryTree {
    resources: RwLock<BTreeMap<WorkspacePath, ResourceStat>>,
}

impl InMemoryTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or touches) a file with the given modification time.
    pub fn add_file(&self, path: &WorkspacePath, modified: DateTime<Utc>) {
        let mut resources = self.resources.write();
        Self::ensure_parents(&mut resources, path);
        resources.insert(path.clone(), ResourceStat::file(modified));
    }

    /// Adds a directory.
    pub fn add_dir(&self, path: &WorkspacePath) {
        let mut resources = self.resources.write();
        Self::ensure_parents(&mut resources, path);
        resources.insert(path.clone(), ResourceStat::directory());
    }

    /// Removes a resource and everything below it.
    pub fn remove(&self, path: &WorkspacePath) {
        self.resources.write().retain(|p, _| !path.contains(p));
    }

    /// Returns the number of resources in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Returns true if the tree holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    fn ensure_parents(resources: &mut BTreeMap<WorkspacePath, ResourceStat>, path: &WorkspacePath) {
        for ancestor in path.ancestors() {
            if ancestor.is_root() {
                continue;
            }
            resources
                .entry(ancestor)
                .or_insert_with(ResourceStat::directory);
        }
    }
}

impl WorkspaceTree for InMemoryTree {
    fn stat(&self, path: &WorkspacePath) -> StoreResult<Option<ResourceStat>> {
        if path.is_root() {
            return Ok(Some(ResourceStat::directory()));
        }
        Ok(self.resources.read().get(path).copied())
    }

    fn list_children(&self, dir: &WorkspacePath) -> StoreResult<Vec<WorkspacePath>> {
        Ok(self
            .resources
            .read()
            .keys()
            .filter(|p| p.parent().as_ref() == Some(dir))
            .cloned()
            .collect())
    }
}
