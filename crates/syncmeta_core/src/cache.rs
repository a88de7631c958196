//! Write-back sync metadata cache.
//!
//! The cache lazily loads metadata from a [`MetadataStore`] at two
//! granularities: a directory's own folder record, and the entries of all of
//! a directory's direct children (one record for the whole group, plus its
//! permissions record). Writes land in memory and mark the record dirty;
//! nothing reaches the store until the outermost [`SyncMetadataCache::end_batch`].
//!
//! ## Flush recovery
//!
//! A flush never stops at the first failing record. Each failure is logged,
//! collected, and the affected cache state is purged so the next read goes
//! back to the store:
//! - a failing folder record purges its directory **and every descendant**
//! - a failing resource group or ignore record purges **that directory only**
//!
//! All failures come back together as [`CoreError::Flush`].

use crate::change_feed::ChangeFeed;
use crate::error::{CoreError, CoreResult, FlushFailure};
use crate::stats::{CacheStats, StatsSnapshot};
use parking_lot::Mutex;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use syncmeta_codec::{
    parse_entries_lenient, parse_ignore_patterns, parse_permissions, serialize_entries,
    serialize_ignore_patterns, serialize_permissions, FolderSyncEntry, ResourceSyncEntry,
};
use syncmeta_store::{
    MetadataKind, MetadataStore, StoreError, StoreKey, StoreResult, WorkspacePath, WorkspaceTree,
};
use tracing::{debug, warn};

/// A cached value. `None` is a valid value meaning "known not to exist".
#[derive(Debug, Clone)]
struct CachedMetadataEntry<T> {
    value: Option<T>,
    dirty: bool,
}

impl<T> CachedMetadataEntry<T> {
    fn clean(value: Option<T>) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    fn dirty(value: Option<T>) -> Self {
        Self { value, dirty: true }
    }
}

/// Entries of the direct children of one directory.
#[derive(Debug, Default)]
struct ResourceGroup {
    entries: BTreeMap<String, CachedMetadataEntry<ResourceSyncEntry>>,
    dirty: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    folders: BTreeMap<WorkspacePath, CachedMetadataEntry<FolderSyncEntry>>,
    groups: BTreeMap<WorkspacePath, ResourceGroup>,
    ignores: BTreeMap<WorkspacePath, CachedMetadataEntry<Vec<String>>>,
    batch_depth: usize,
}

#[derive(Default)]
struct FlushOutcome {
    changed: Vec<WorkspacePath>,
    failures: Vec<(StoreKey, StoreError)>,
}

/// The sync metadata cache.
///
/// Reads are safe from any thread. Mutations are expected to happen while
/// the caller holds the session's nested lock; the
/// [`Synchronizer`](crate::Synchronizer) enforces that.
pub struct SyncMetadataCache {
    store: Arc<dyn MetadataStore>,
    tree: Arc<dyn WorkspaceTree>,
    feed: Arc<ChangeFeed>,
    state: Mutex<CacheState>,
    stats: CacheStats,
}

impl SyncMetadataCache {
    /// Creates an empty cache over `store` and `tree`, publishing to `feed`.
    pub fn new(
        store: Arc<dyn MetadataStore>,
        tree: Arc<dyn WorkspaceTree>,
        feed: Arc<ChangeFeed>,
    ) -> Self {
        Self {
            store,
            tree,
            feed,
            state: Mutex::new(CacheState::default()),
            stats: CacheStats::new(),
        }
    }

    /// Returns the workspace tree the cache lists children from.
    pub fn tree(&self) -> &Arc<dyn WorkspaceTree> {
        &self.tree
    }

    /// Returns the sync entry of `path`, loading its parent's group if needed.
    ///
    /// The workspace root never has a resource entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be read from the store.
    pub fn get_resource_sync(&self, path: &WorkspacePath) -> CoreResult<Option<ResourceSyncEntry>> {
        let Some(parent) = path.parent() else {
            return Ok(None);
        };
        let mut state = self.state.lock();
        let group = self.load_group(&mut state, &parent)?;
        Ok(group
            .entries
            .get(path.name())
            .and_then(|cached| cached.value.clone()))
    }

    /// Sets or clears the sync entry of `path`.
    ///
    /// The parent's group is loaded first so siblings are preserved when the
    /// group is rewritten. Setting the current value again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error for the root, for an entry whose name differs from
    /// the path's last segment, or if the group cannot be loaded.
    pub fn set_resource_sync(
        &self,
        path: &WorkspacePath,
        entry: Option<ResourceSyncEntry>,
    ) -> CoreResult<()> {
        let Some(parent) = path.parent() else {
            return Err(CoreError::invalid_operation(
                "the workspace root has no resource sync entry",
            ));
        };
        if let Some(entry) = &entry {
            if entry.name() != path.name() {
                return Err(CoreError::invalid_operation(format!(
                    "entry {:?} stored under {path}",
                    entry.name()
                )));
            }
        }

        let mut state = self.state.lock();
        let group = self.load_group(&mut state, &parent)?;
        let current = group.entries.get(path.name()).and_then(|c| c.value.as_ref());
        if current == entry.as_ref() {
            return Ok(());
        }
        group
            .entries
            .insert(path.name().to_string(), CachedMetadataEntry::dirty(entry));
        group.dirty = true;
        Ok(())
    }

    /// Returns the sync entries of all direct children of `dir`, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be read from the store.
    pub fn get_children_sync(&self, dir: &WorkspacePath) -> CoreResult<Vec<ResourceSyncEntry>> {
        let mut state = self.state.lock();
        let group = self.load_group(&mut state, dir)?;
        Ok(group
            .entries
            .values()
            .filter_map(|cached| cached.value.clone())
            .collect())
    }

    /// Returns the folder record of `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or does not parse.
    /// A record that does not parse is not cached.
    pub fn get_folder_sync(&self, dir: &WorkspacePath) -> CoreResult<Option<FolderSyncEntry>> {
        let mut state = self.state.lock();
        if let Some(cached) = state.folders.get(dir) {
            self.stats.record_hit();
            return Ok(cached.value.clone());
        }
        self.stats.record_load();
        let key = StoreKey::new(dir.clone(), MetadataKind::FolderSync);
        let value = match self.store.read(&key)? {
            Some(bytes) => Some(FolderSyncEntry::parse(dir.name(), &bytes)?),
            None => None,
        };
        debug!(dir = %dir, managed = value.is_some(), "loaded folder sync");
        state
            .folders
            .insert(dir.clone(), CachedMetadataEntry::clean(value.clone()));
        Ok(value)
    }

    /// Sets or clears the folder record of `dir`.
    pub fn set_folder_sync(&self, dir: &WorkspacePath, folder: Option<FolderSyncEntry>) {
        let mut state = self.state.lock();
        if let Some(cached) = state.folders.get(dir) {
            if cached.value == folder {
                return;
            }
        }
        state
            .folders
            .insert(dir.clone(), CachedMetadataEntry::dirty(folder));
    }

    /// Returns the ignore patterns declared for `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or is not text.
    pub fn get_ignore_patterns(&self, dir: &WorkspacePath) -> CoreResult<Option<Vec<String>>> {
        let mut state = self.state.lock();
        self.load_ignores(&mut state, dir)
    }

    /// Sets or clears the ignore patterns of `dir`.
    pub fn set_ignore_patterns(&self, dir: &WorkspacePath, patterns: Option<Vec<String>>) {
        let mut state = self.state.lock();
        if let Some(cached) = state.ignores.get(dir) {
            if cached.value == patterns {
                return;
            }
        }
        state
            .ignores
            .insert(dir.clone(), CachedMetadataEntry::dirty(patterns));
    }

    /// Appends `pattern` to the ignore patterns of `dir` unless present.
    ///
    /// # Errors
    ///
    /// Returns an error if the current patterns cannot be loaded.
    pub fn add_ignore_pattern(&self, dir: &WorkspacePath, pattern: &str) -> CoreResult<()> {
        let mut state = self.state.lock();
        let mut patterns = self.load_ignores(&mut state, dir)?.unwrap_or_default();
        if patterns.iter().any(|p| p == pattern) {
            return Ok(());
        }
        patterns.push(pattern.to_string());
        state
            .ignores
            .insert(dir.clone(), CachedMetadataEntry::dirty(Some(patterns)));
        Ok(())
    }

    /// Lists the children of `dir` that exist in the workspace or still
    /// carry sync metadata.
    ///
    /// Children that no longer exist locally but still have an entry
    /// (pending deletions, deleted directories) are included; anything
    /// without metadata only appears if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree or the group cannot be read.
    pub fn list_children_with_sync(&self, dir: &WorkspacePath) -> CoreResult<Vec<WorkspacePath>> {
        let mut children: BTreeSet<WorkspacePath> =
            self.tree.list_children(dir)?.into_iter().collect();

        let mut state = self.state.lock();
        let group = self.load_group(&mut state, dir)?;
        for (name, cached) in &group.entries {
            if cached.value.is_some() {
                children.insert(dir.join(name));
            }
        }
        for (path, cached) in &state.folders {
            if cached.value.is_some() && path.parent().as_ref() == Some(dir) {
                children.insert(path.clone());
            }
        }
        Ok(children.into_iter().collect())
    }

    /// Opens a (possibly nested) batch.
    pub fn begin_batch(&self) {
        self.state.lock().batch_depth += 1;
    }

    /// Closes a batch. Closing the outermost batch flushes every dirty record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockProtocolViolation`] without a matching
    /// [`begin_batch`](Self::begin_batch), or [`CoreError::Flush`] listing
    /// every record that failed to persist.
    pub fn end_batch(&self) -> CoreResult<()> {
        let mut state = self.state.lock();
        if state.batch_depth == 0 {
            return Err(CoreError::lock_protocol("end_batch without matching begin_batch"));
        }
        state.batch_depth -= 1;
        if state.batch_depth > 0 {
            return Ok(());
        }

        let outcome = self.flush_locked(&mut state);
        drop(state);

        if let Some(sequence) = self.feed.publish(outcome.changed) {
            debug!(sequence, "published metadata change event");
        }
        if outcome.failures.is_empty() {
            Ok(())
        } else {
            Err(FlushFailure {
                failures: outcome.failures,
            }
            .into())
        }
    }

    /// Returns the current batch nesting depth.
    pub fn batch_depth(&self) -> usize {
        self.state.lock().batch_depth
    }

    /// Returns true if any record for `path` waits to be flushed.
    pub fn is_dirty(&self, path: &WorkspacePath) -> bool {
        let state = self.state.lock();
        let folder = state.folders.get(path).is_some_and(|c| c.dirty);
        let ignores = state.ignores.get(path).is_some_and(|c| c.dirty);
        let resource = path.parent().is_some_and(|parent| {
            state
                .groups
                .get(&parent)
                .and_then(|g| g.entries.get(path.name()))
                .is_some_and(|c| c.dirty)
        });
        folder || ignores || resource
    }

    /// Drops cached state for `dir` (and, if `deep`, every descendant
    /// directory) without touching the store. Pending writes in the purged
    /// scope are discarded.
    pub fn purge(&self, dir: &WorkspacePath, deep: bool) {
        let mut state = self.state.lock();
        Self::purge_locked(&mut state, dir, deep);
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn purge_locked(state: &mut CacheState, dir: &WorkspacePath, deep: bool) {
        if deep {
            state.folders.retain(|p, _| !dir.contains(p));
            state.groups.retain(|p, _| !dir.contains(p));
            state.ignores.retain(|p, _| !dir.contains(p));
        } else {
            state.folders.remove(dir);
            state.groups.remove(dir);
            state.ignores.remove(dir);
        }
        debug!(dir = %dir, deep, "purged cached metadata");
    }

    fn load_group<'a>(
        &self,
        state: &'a mut CacheState,
        dir: &WorkspacePath,
    ) -> CoreResult<&'a mut ResourceGroup> {
        match state.groups.entry(dir.clone()) {
            Entry::Occupied(occupied) => {
                self.stats.record_hit();
                Ok(occupied.into_mut())
            }
            Entry::Vacant(vacant) => {
                let group = self.read_group(dir)?;
                Ok(vacant.insert(group))
            }
        }
    }

    fn read_group(&self, dir: &WorkspacePath) -> CoreResult<ResourceGroup> {
        self.stats.record_load();
        let key = StoreKey::new(dir.clone(), MetadataKind::ResourceSyncGroup);
        let entries = match self.store.read(&key)? {
            Some(bytes) => {
                let parsed = parse_entries_lenient(&bytes)?;
                if !parsed.malformed.is_empty() {
                    warn!(
                        dir = %dir,
                        count = parsed.malformed.len(),
                        "skipping malformed entry lines"
                    );
                    for error in &parsed.malformed {
                        debug!(dir = %dir, %error, "malformed entry line");
                    }
                    self.stats.record_malformed(parsed.malformed.len() as u64);
                }
                parsed.entries
            }
            None => Vec::new(),
        };
        let mut permissions = self.read_permissions(dir)?;

        let mut group = ResourceGroup::default();
        for entry in entries {
            let entry = match permissions.remove(entry.name()) {
                Some(perm) => entry.with_permissions(Some(&perm)),
                None => entry,
            };
            group
                .entries
                .insert(entry.name().to_string(), CachedMetadataEntry::clean(Some(entry)));
        }
        debug!(dir = %dir, entries = group.entries.len(), "loaded resource sync group");
        Ok(group)
    }

    fn read_permissions(&self, dir: &WorkspacePath) -> CoreResult<BTreeMap<String, String>> {
        let key = StoreKey::new(dir.clone(), MetadataKind::Permissions);
        let Some(bytes) = self.store.read(&key)? else {
            return Ok(BTreeMap::new());
        };
        match parse_permissions(&bytes) {
            Ok(pairs) => Ok(pairs.into_iter().collect()),
            Err(error) => {
                warn!(dir = %dir, %error, "ignoring malformed permissions record");
                self.stats.record_malformed(1);
                Ok(BTreeMap::new())
            }
        }
    }

    fn load_ignores(
        &self,
        state: &mut CacheState,
        dir: &WorkspacePath,
    ) -> CoreResult<Option<Vec<String>>> {
        if let Some(cached) = state.ignores.get(dir) {
            self.stats.record_hit();
            return Ok(cached.value.clone());
        }
        self.stats.record_load();
        let key = StoreKey::new(dir.clone(), MetadataKind::IgnorePatterns);
        let value = match self.store.read(&key)? {
            Some(bytes) => Some(parse_ignore_patterns(&bytes)?),
            None => None,
        };
        state
            .ignores
            .insert(dir.clone(), CachedMetadataEntry::clean(value.clone()));
        Ok(value)
    }

    fn persist(&self, key: &StoreKey, bytes: Option<&[u8]>) -> StoreResult<()> {
        match bytes {
            Some(bytes) => {
                self.store.write(key, bytes)?;
                self.stats.record_write();
            }
            None => {
                self.store.delete(key)?;
                self.stats.record_delete();
            }
        }
        Ok(())
    }

    fn flush_locked(&self, state: &mut CacheState) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();
        let mut purge_deep = Vec::new();
        let mut purge_shallow = BTreeSet::new();

        for (dir, cached) in state.folders.iter_mut().filter(|(_, c)| c.dirty) {
            cached.dirty = false;
            let key = StoreKey::new(dir.clone(), MetadataKind::FolderSync);
            let bytes = cached.value.as_ref().map(FolderSyncEntry::to_bytes);
            if let Err(error) = self.persist(&key, bytes.as_deref()) {
                warn!(%key, %error, "folder sync flush failed, purging subtree");
                self.stats.record_failure();
                outcome.failures.push((key, error));
                purge_deep.push(dir.clone());
            }
            outcome.changed.push(dir.clone());
        }

        for (dir, group) in state.groups.iter_mut().filter(|(_, g)| g.dirty) {
            group.dirty = false;
            for (name, cached) in group.entries.iter_mut().filter(|(_, c)| c.dirty) {
                cached.dirty = false;
                outcome.changed.push(dir.join(name));
            }
            group.entries.retain(|_, cached| cached.value.is_some());

            let live: Vec<&ResourceSyncEntry> = group
                .entries
                .values()
                .filter_map(|cached| cached.value.as_ref())
                .collect();
            let entries = (!live.is_empty()).then(|| serialize_entries(live.iter().copied()));
            let permissions = serialize_permissions(live.iter().copied());
            let permissions = (!permissions.is_empty()).then_some(permissions);

            for (kind, bytes) in [
                (MetadataKind::ResourceSyncGroup, entries),
                (MetadataKind::Permissions, permissions),
            ] {
                let key = StoreKey::new(dir.clone(), kind);
                if let Err(error) = self.persist(&key, bytes.as_deref()) {
                    warn!(%key, %error, "resource sync flush failed, purging directory");
                    self.stats.record_failure();
                    outcome.failures.push((key, error));
                    purge_shallow.insert(dir.clone());
                }
            }
        }

        for (dir, cached) in state.ignores.iter_mut().filter(|(_, c)| c.dirty) {
            cached.dirty = false;
            let key = StoreKey::new(dir.clone(), MetadataKind::IgnorePatterns);
            let bytes = cached.value.as_deref().map(serialize_ignore_patterns);
            if let Err(error) = self.persist(&key, bytes.as_deref()) {
                warn!(%key, %error, "ignore patterns flush failed, purging directory");
                self.stats.record_failure();
                outcome.failures.push((key, error));
                purge_shallow.insert(dir.clone());
            }
            outcome.changed.push(dir.clone());
        }

        for dir in &purge_deep {
            Self::purge_locked(state, dir, true);
        }
        for dir in &purge_shallow {
            Self::purge_locked(state, dir, false);
        }

        if !outcome.changed.is_empty() {
            self.stats.record_flush();
            debug!(
                changed = outcome.changed.len(),
                failed = outcome.failures.len(),
                "flushed metadata"
            );
        }
        outcome
    }
}
