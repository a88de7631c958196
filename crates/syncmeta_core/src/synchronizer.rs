//! The synchronizer session: lock, cache and change feed bundled together.
//!
//! There is no global instance. A session is constructed explicitly and
//! shared by `Arc`; dropping the last handle ends the session.
//!
//! Every mutating operation wraps itself in acquire / begin batch / end
//! batch / release, so it can be called on its own or inside a larger
//! batch opened with [`Synchronizer::begin`]:
//!
//! ```rust,ignore
//! let ctx = sync.context();
//! let batch = sync.begin(ctx, &dir)?;
//! sync.set_resource_sync(ctx, &dir.join("a.c"), Some(a))?;
//! sync.set_resource_sync(ctx, &dir.join("b.c"), Some(b))?;
//! batch.finish()?; // one flush, one change event
//! ```

use crate::cache::SyncMetadataCache;
use crate::change_feed::{ChangeFeed, MetadataChangeEvent};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::lock::{ContextId, LockRule, NestedLock};
use crate::stats::StatsSnapshot;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use syncmeta_codec::{FolderSyncEntry, ResourceSyncEntry};
use syncmeta_store::{FileStore, FsTree, MetadataStore, WorkspacePath, WorkspaceTree};
use tracing::{debug, warn};

/// A sync metadata session.
pub struct Synchronizer {
    config: Config,
    lock: NestedLock,
    cache: SyncMetadataCache,
    feed: Arc<ChangeFeed>,
}

impl Synchronizer {
    /// Creates a session over the given store and workspace tree.
    pub fn new(config: Config, store: Arc<dyn MetadataStore>, tree: Arc<dyn WorkspaceTree>) -> Self {
        let feed = Arc::new(ChangeFeed::with_max_history(config.change_history));
        let cache = SyncMetadataCache::new(store, tree, Arc::clone(&feed));
        Self {
            lock: NestedLock::new(config.strict_nesting),
            config,
            cache,
            feed,
        }
    }

    /// Opens a file-backed session for the workspace at `root`.
    ///
    /// Metadata directories named [`Config::meta_dir`] are hidden from the
    /// workspace tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or is locked by
    /// another process.
    pub fn open(config: Config, root: &Path) -> CoreResult<Self> {
        let store = FileStore::open_with_meta_dir(root, &config.meta_dir)?;
        let tree = FsTree::new(root, &[config.meta_dir.as_str()]);
        debug!(root = %root.display(), meta_dir = %config.meta_dir, "opened file-backed session");
        Ok(Self::new(config, Arc::new(store), Arc::new(tree)))
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the metadata cache.
    pub fn cache(&self) -> &SyncMetadataCache {
        &self.cache
    }

    /// Returns the nested lock.
    pub fn lock(&self) -> &NestedLock {
        &self.lock
    }

    /// Returns the workspace tree.
    pub fn tree(&self) -> &Arc<dyn WorkspaceTree> {
        self.cache.tree()
    }

    /// Returns the change feed.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Subscribes to metadata change events.
    pub fn subscribe(&self) -> Receiver<MetadataChangeEvent> {
        self.feed.subscribe()
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.cache.stats()
    }

    /// Issues a fresh context handle.
    pub fn context(&self) -> ContextId {
        self.lock.context()
    }

    /// Acquires the lock for `path` and opens a batch.
    ///
    /// The returned guard ends the batch and releases the lock when
    /// finished or dropped. An outermost batch on the workspace root holds
    /// [`LockRule::Workspace`], so other contexts wait until it ends; on the
    /// root inside an open batch the null rule nests transparently.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadOnlyContext`] for read-only contexts, or a
    /// lock protocol violation for an uncontained nested rule.
    pub fn begin(&self, ctx: ContextId, path: &WorkspacePath) -> CoreResult<BatchGuard<'_>> {
        if self.lock.is_read_only(ctx) {
            return Err(CoreError::ReadOnlyContext {
                context: ctx.as_u64(),
            });
        }
        let rule = if path.is_root() && self.lock.rule(ctx).is_none() {
            self.lock.acquire_workspace(ctx)?
        } else {
            self.lock.acquire(ctx, path)?
        };
        self.cache.begin_batch();
        Ok(BatchGuard {
            sync: self,
            ctx,
            rule,
            finished: false,
        })
    }

    /// Returns the sync entry of `path`. Reads never take the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent's group cannot be loaded.
    pub fn get_resource_sync(&self, path: &WorkspacePath) -> CoreResult<Option<ResourceSyncEntry>> {
        self.cache.get_resource_sync(path)
    }

    /// Returns the folder record of `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded.
    pub fn get_folder_sync(&self, dir: &WorkspacePath) -> CoreResult<Option<FolderSyncEntry>> {
        self.cache.get_folder_sync(dir)
    }

    /// Returns true if `dir` has a folder record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded.
    pub fn is_managed_dir(&self, dir: &WorkspacePath) -> CoreResult<bool> {
        Ok(self.cache.get_folder_sync(dir)?.is_some())
    }

    /// Sets or clears the sync entry of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotManaged`] when setting an entry under a
    /// directory without a folder record, plus the errors of
    /// [`begin`](Self::begin) and the final flush.
    pub fn set_resource_sync(
        &self,
        ctx: ContextId,
        path: &WorkspacePath,
        entry: Option<ResourceSyncEntry>,
    ) -> CoreResult<()> {
        let batch = self.begin(ctx, path)?;
        if entry.is_some() {
            let parent = path.parent().unwrap_or_default();
            if !self.is_managed_dir(&parent)? {
                return Err(CoreError::not_managed(parent));
            }
        }
        self.cache.set_resource_sync(path, entry)?;
        batch.finish()
    }

    /// Clears the sync entry of `path`.
    ///
    /// # Errors
    ///
    /// See [`set_resource_sync`](Self::set_resource_sync).
    pub fn delete_resource_sync(&self, ctx: ContextId, path: &WorkspacePath) -> CoreResult<()> {
        self.set_resource_sync(ctx, path, None)
    }

    /// Sets or clears the folder record of `dir`.
    ///
    /// # Errors
    ///
    /// See [`begin`](Self::begin); also fails on flush errors.
    pub fn set_folder_sync(
        &self,
        ctx: ContextId,
        dir: &WorkspacePath,
        folder: Option<FolderSyncEntry>,
    ) -> CoreResult<()> {
        let batch = self.begin(ctx, dir)?;
        self.cache.set_folder_sync(dir, folder);
        batch.finish()
    }

    /// Appends an ignore pattern to `dir`.
    ///
    /// # Errors
    ///
    /// See [`begin`](Self::begin); also fails on load or flush errors.
    pub fn add_ignore_pattern(&self, ctx: ContextId, dir: &WorkspacePath, pattern: &str) -> CoreResult<()> {
        let batch = self.begin(ctx, dir)?;
        self.cache.add_ignore_pattern(dir, pattern)?;
        batch.finish()
    }

    /// Replaces or clears the ignore patterns of `dir`.
    ///
    /// # Errors
    ///
    /// See [`begin`](Self::begin); also fails on flush errors.
    pub fn set_ignore_patterns(
        &self,
        ctx: ContextId,
        dir: &WorkspacePath,
        patterns: Option<Vec<String>>,
    ) -> CoreResult<()> {
        let batch = self.begin(ctx, dir)?;
        self.cache.set_ignore_patterns(dir, patterns);
        batch.finish()
    }

    /// Records that the file at `path` was deleted locally.
    ///
    /// A local addition simply forgets its entry; a committed file keeps its
    /// entry with the deletion flag so the removal can be sent later.
    /// Directories and unmanaged paths are left alone.
    ///
    /// # Errors
    ///
    /// See [`set_resource_sync`](Self::set_resource_sync).
    pub fn handle_local_deletion(&self, ctx: ContextId, path: &WorkspacePath) -> CoreResult<()> {
        let batch = self.begin(ctx, path)?;
        match self.cache.get_resource_sync(path)? {
            Some(entry) if entry.is_directory() => {}
            Some(entry) if entry.is_added() => {
                debug!(path = %path, "forgetting deleted local addition");
                self.cache.set_resource_sync(path, None)?;
            }
            Some(entry) if !entry.is_deleted() => {
                self.cache.set_resource_sync(path, Some(entry.with_deleted(true)))?;
            }
            _ => {}
        }
        batch.finish()
    }

    /// Records that a file reappeared at `path`, undoing a pending deletion.
    ///
    /// # Errors
    ///
    /// See [`set_resource_sync`](Self::set_resource_sync).
    pub fn handle_local_creation(&self, ctx: ContextId, path: &WorkspacePath) -> CoreResult<()> {
        let batch = self.begin(ctx, path)?;
        if let Some(entry) = self.cache.get_resource_sync(path)? {
            if entry.is_deleted() {
                self.cache.set_resource_sync(path, Some(entry.with_deleted(false)))?;
            }
        }
        batch.finish()
    }

    /// Removes all sync metadata of `dir` and everything below it.
    ///
    /// # Errors
    ///
    /// See [`begin`](Self::begin); also fails on load or flush errors.
    pub fn unmanage(&self, ctx: ContextId, dir: &WorkspacePath) -> CoreResult<()> {
        let batch = self.begin(ctx, dir)?;
        self.unmanage_within(dir)?;
        batch.finish()
    }

    fn unmanage_within(&self, dir: &WorkspacePath) -> CoreResult<()> {
        for entry in self.cache.get_children_sync(dir)? {
            let child = dir.join(entry.name());
            if entry.is_directory() {
                self.unmanage_within(&child)?;
            }
            self.cache.set_resource_sync(&child, None)?;
        }
        self.cache.set_folder_sync(dir, None);
        self.cache.set_ignore_patterns(dir, None);
        debug!(dir = %dir, "unmanaged directory");
        Ok(())
    }
}

/// An open batch under a held lock.
///
/// [`finish`](Self::finish) ends the batch and releases the lock, returning
/// the flush result. Dropping an unfinished guard does the same and logs
/// any error, so early returns and panics never leave the lock held.
#[must_use = "dropping the guard immediately ends the batch"]
pub struct BatchGuard<'a> {
    sync: &'a Synchronizer,
    ctx: ContextId,
    rule: LockRule,
    finished: bool,
}

impl BatchGuard<'_> {
    /// Returns the context holding this batch.
    pub fn context(&self) -> ContextId {
        self.ctx
    }

    /// Returns the rule the lock was acquired under.
    pub fn rule(&self) -> &LockRule {
        &self.rule
    }

    /// Ends the batch and releases the lock.
    ///
    /// # Errors
    ///
    /// Returns the flush aggregate if this closed the outermost batch and
    /// records failed to persist.
    pub fn finish(mut self) -> CoreResult<()> {
        self.finished = true;
        self.close()
    }

    fn close(&self) -> CoreResult<()> {
        let flushed = self.sync.cache.end_batch();
        let released = self.sync.lock.release(self.ctx);
        flushed?;
        released.map(|_| ())
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(error) = self.close() {
            warn!(ctx = %self.ctx, %error, "batch ended by drop failed");
        }
    }
}
