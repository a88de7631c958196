//! Test fixtures and session helpers.
//!
//! Provides convenience functions for setting up synchronizer sessions over
//! in-memory or temporary file-backed workspaces, plus a matching remote
//! snapshot for reconciliation tests.

use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use syncmeta_codec::{FolderSyncEntry, ResourceSyncEntry};
use syncmeta_core::{Config, Synchronizer};
use syncmeta_reconcile::{
    CancelFlag, Depth, ReconcileConfig, ReconciliationSet, SnapshotRemote, SyncComparator,
};
use syncmeta_store::{InMemoryStore, InMemoryTree, WorkspacePath};
use tempfile::TempDir;

/// Repository root used by fixture folder records.
pub const TEST_ROOT: &str = ":local:/var/lib/cvsroot";

/// Returns the UTC time `secs` seconds after the epoch.
pub fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .expect("timestamp out of range")
}

/// An in-memory session with a scriptable workspace tree and remote.
pub struct TestSession {
    /// The synchronizer under test.
    pub sync: Arc<Synchronizer>,
    /// The backing store, for failure injection and write counts.
    pub store: Arc<InMemoryStore>,
    /// The workspace tree.
    pub tree: Arc<InMemoryTree>,
    /// The remote side used by [`TestSession::reconcile`].
    pub remote: SnapshotRemote,
}

impl TestSession {
    /// Creates an empty session with the default configuration.
    pub fn memory() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty session.
    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let tree = Arc::new(InMemoryTree::new());
        let sync = Arc::new(Synchronizer::new(config, store.clone(), tree.clone()));
        Self {
            sync,
            store,
            tree,
            remote: SnapshotRemote::new(),
        }
    }

    /// Checks out `dir`: creates it locally and remotely, records its folder
    /// and, below the top level, its directory entry.
    pub fn manage(&self, dir: &str) {
        let dir = WorkspacePath::new(dir);
        let ctx = self.sync.context();
        let folder = FolderSyncEntry::new(dir.name(), TEST_ROOT, dir.as_str())
            .expect("valid folder record");

        let batch = self.sync.begin(ctx, &dir).expect("begin batch");
        self.sync
            .set_folder_sync(ctx, &dir, Some(folder))
            .expect("set folder sync");
        if dir.depth() > 1 {
            let entry = ResourceSyncEntry::directory(dir.name()).expect("valid directory entry");
            self.sync
                .set_resource_sync(ctx, &dir, Some(entry))
                .expect("set directory entry");
        }
        batch.finish().expect("flush managed directory");

        self.tree.add_dir(&dir);
        self.remote.add_dir(&dir);
    }

    /// Checks out a file at `revision`, in sync on all three sides.
    pub fn track(&self, path: &str, revision: &str, secs: i64) {
        let path = WorkspacePath::new(path);
        let entry = ResourceSyncEntry::file(path.name(), revision, Some(timestamp(secs)), "", None)
            .expect("valid entry");
        self.sync
            .set_resource_sync(self.sync.context(), &path, Some(entry))
            .expect("set resource sync");
        self.tree.add_file(&path, timestamp(secs));
        self.remote.add_revision(&path, revision);
    }

    /// Modifies a file locally.
    pub fn touch(&self, path: &str, secs: i64) {
        self.tree.add_file(&WorkspacePath::new(path), timestamp(secs));
    }

    /// Deletes a resource locally without telling the synchronizer.
    pub fn remove_local(&self, path: &str) {
        self.tree.remove(&WorkspacePath::new(path));
    }

    /// Commits a new revision on the remote side.
    pub fn commit_remote(&self, path: &str, revision: &str) {
        self.remote.add_revision(&WorkspacePath::new(path), revision);
    }

    /// Makes every write and delete of records owned by `dir` fail.
    pub fn fail_writes_for(&self, dir: &str) {
        self.store.fail_writes_for(WorkspacePath::new(dir));
    }

    /// Builds a reconciliation set over the whole workspace.
    pub fn reconcile(&self) -> ReconciliationSet {
        let set = ReconciliationSet::new(ReconcileConfig::default());
        let comparator = SyncComparator::new(self.sync.cache(), &self.remote, set.config());
        set.recompute(
            &comparator,
            &WorkspacePath::root(),
            Depth::Infinite,
            &CancelFlag::new(),
        )
        .expect("recompute");
        set
    }
}

impl Deref for TestSession {
    type Target = Synchronizer;

    fn deref(&self) -> &Self::Target {
        &self.sync
    }
}

/// A temporary directory for file-backed sessions.
pub struct TempWorkspace {
    /// The temporary directory (removed on drop).
    pub dir: TempDir,
}

impl TempWorkspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the workspace root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file, creating parent directories.
    pub fn write_file(&self, relative: &str, contents: &[u8]) {
        let path = WorkspacePath::new(relative).to_fs_path(self.path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directories");
        }
        fs::write(path, contents).expect("Failed to write file");
    }

    /// Creates a directory and its parents.
    pub fn create_dir(&self, relative: &str) {
        fs::create_dir_all(WorkspacePath::new(relative).to_fs_path(self.path()))
            .expect("Failed to create directory");
    }

    /// Opens a file-backed session on the workspace.
    pub fn open(&self) -> Synchronizer {
        Synchronizer::open(Config::default(), self.path()).expect("Failed to open session")
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test with a fresh in-memory session.
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&TestSession) -> R,
{
    let session = TestSession::memory();
    f(&session)
}

/// Runs a test with a temporary file-backed workspace.
pub fn with_temp_workspace<F, R>(f: F) -> R
where
    F: FnOnce(&TempWorkspace) -> R,
{
    let workspace = TempWorkspace::new();
    f(&workspace)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a session with one top-level project of in-sync files
    /// `f0.c`, `f1.c`, ...
    pub fn checked_out_project(name: &str, files: usize) -> TestSession {
        let session = TestSession::memory();
        session.manage(name);
        for i in 0..files {
            session.track(&format!("{name}/f{i}.c"), "1.1", 1_000);
        }
        session
    }

    /// Creates a session with a project tree `depth` levels deep, `fanout`
    /// subdirectories per directory and `files` in-sync files in each.
    pub fn project_tree(depth: usize, fanout: usize, files: usize) -> TestSession {
        let session = TestSession::memory();
        let mut level = vec!["proj".to_string()];
        for current in 0..=depth {
            let mut next = Vec::new();
            for dir in &level {
                session.manage(dir);
                for i in 0..files {
                    session.track(&format!("{dir}/f{i}.c"), "1.1", 1_000);
                }
                if current < depth {
                    next.extend((0..fanout).map(|i| format!("{dir}/d{i}")));
                }
            }
            level = next;
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncmeta_reconcile::SyncDirection;

    #[test]
    fn test_checked_out_project_is_in_sync() {
        let session = scenarios::checked_out_project("p", 3);
        assert!(session.reconcile().is_empty());
        assert_eq!(session.cache().get_children_sync(&WorkspacePath::new("p")).unwrap().len(), 3);
    }

    #[test]
    fn test_local_and_remote_edits_show_up() {
        let session = scenarios::checked_out_project("p", 2);
        session.touch("p/f0.c", 2_000);
        session.commit_remote("p/f1.c", "1.2");

        let set = session.reconcile();
        assert_eq!(set.count(SyncDirection::Outgoing), 1);
        assert_eq!(set.count(SyncDirection::Incoming), 1);
    }

    #[test]
    fn test_project_tree_shape() {
        let session = scenarios::project_tree(2, 2, 1);
        assert!(session.is_managed_dir(&WorkspacePath::new("proj/d1/d0")).unwrap());
        let sub = session
            .get_resource_sync(&WorkspacePath::new("proj/d1"))
            .unwrap()
            .unwrap();
        assert!(sub.is_directory());
        assert!(session.reconcile().is_empty());
    }

    #[test]
    fn test_temp_workspace_session() {
        with_temp_workspace(|ws| {
            ws.write_file("p/a.c", b"int a;");
            let sync = ws.open();
            assert_eq!(
                sync.cache().list_children_with_sync(&WorkspacePath::new("p")).unwrap(),
                vec![WorkspacePath::new("p/a.c")]
            );
        });
    }
}
