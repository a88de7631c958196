//! Integration tests for recomputing a reconciliation set over a session.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use syncmeta_codec::{FolderSyncEntry, ResourceSyncEntry};
use syncmeta_core::{Config, Synchronizer};
use syncmeta_reconcile::{
    CancelFlag, ChangeKind, Depth, MirrorRemote, ReconcileConfig, ReconcileError,
    ReconcileResult, ReconciliationNode, ReconciliationSet, RemoteMetadataSource, RemoteToken,
    SetMember, SnapshotRemote, SyncComparator, SyncDirection,
};
use syncmeta_store::{InMemoryStore, InMemoryTree, ResourceKind, WorkspacePath};

const ROOT: &str = ":pserver:anon@cvs.example.org:/cvsroot";

fn path(p: &str) -> WorkspacePath {
    WorkspacePath::new(p)
}

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

struct Workspace {
    tree: Arc<InMemoryTree>,
    sync: Arc<Synchronizer>,
    remote: SnapshotRemote,
}

/// A project `p` with a subdirectory, one local edit, one remote edit, one
/// unmarked local deletion and one remote addition.
fn workspace() -> Workspace {
    let tree = Arc::new(InMemoryTree::new());
    let sync = Arc::new(Synchronizer::new(
        Config::default(),
        Arc::new(InMemoryStore::new()),
        tree.clone(),
    ));
    let remote = SnapshotRemote::new();
    let ctx = sync.context();

    let batch = sync.begin(ctx, &WorkspacePath::root()).unwrap();
    for dir in ["p", "p/sub"] {
        let dir = path(dir);
        let folder = FolderSyncEntry::new(dir.name(), ROOT, dir.as_str()).unwrap();
        sync.set_folder_sync(ctx, &dir, Some(folder)).unwrap();
        tree.add_dir(&dir);
        remote.add_dir(&dir);
    }
    for (file, local, remote_rev) in [
        ("p/a.c", Some(100), Some("1.1")),
        ("p/b.c", Some(200), Some("1.1")),
        ("p/gone.c", None, Some("1.1")),
        ("p/sub/c.c", Some(100), Some("1.2")),
    ] {
        let file = path(file);
        let entry = ResourceSyncEntry::file(file.name(), "1.1", Some(t(100)), "", None).unwrap();
        sync.set_resource_sync(ctx, &file, Some(entry)).unwrap();
        if let Some(secs) = local {
            tree.add_file(&file, t(secs));
        }
        if let Some(rev) = remote_rev {
            remote.add_revision(&file, rev);
        }
    }
    remote.add_revision(&path("p/new.c"), "1.1");
    batch.finish().unwrap();

    Workspace { tree, sync, remote }
}

fn recompute(ws: &Workspace, set: &ReconciliationSet, at: &str, depth: Depth) {
    let comparator = SyncComparator::new(ws.sync.cache(), &ws.remote, set.config());
    set.recompute(&comparator, &path(at), depth, &CancelFlag::new())
        .unwrap();
}

fn verdict(set: &ReconciliationSet, p: &str) -> Option<(SyncDirection, ChangeKind)> {
    set.node(&path(p)).map(|n| (n.direction, n.change))
}

#[test]
fn full_recompute_finds_every_difference() {
    let ws = workspace();
    let set = ReconciliationSet::default();
    let rx = set.subscribe();

    let comparator = SyncComparator::new(ws.sync.cache(), &ws.remote, set.config());
    let summary = set
        .recompute(&comparator, &WorkspacePath::root(), Depth::Infinite, &CancelFlag::new())
        .unwrap();
    assert_eq!(summary.out_of_sync, 4);
    assert_eq!(summary.errors, 0);

    assert_eq!(
        verdict(&set, "p/b.c"),
        Some((SyncDirection::Outgoing, ChangeKind::Change))
    );
    assert_eq!(
        verdict(&set, "p/gone.c"),
        Some((SyncDirection::Outgoing, ChangeKind::Deletion))
    );
    assert_eq!(
        verdict(&set, "p/new.c"),
        Some((SyncDirection::Incoming, ChangeKind::Addition))
    );
    assert_eq!(
        verdict(&set, "p/sub/c.c"),
        Some((SyncDirection::Incoming, ChangeKind::Change))
    );
    assert!(set.node(&path("p/a.c")).is_none());
    assert!(set.node(&path("p")).is_none());

    assert_eq!(
        set.members(&WorkspacePath::root()),
        vec![SetMember::Container(path("p"))]
    );
    assert_eq!(
        set.members(&path("p")).last(),
        Some(&SetMember::Container(path("p/sub")))
    );

    let event = rx.try_recv().unwrap();
    assert_eq!(event.added.len(), 4);
    assert_eq!(event.added_roots, vec![path("p")]);
    assert!(rx.try_recv().is_err());
}

#[test]
fn recompute_sweeps_resolved_and_vanished_nodes() {
    let ws = workspace();
    let set = ReconciliationSet::default();
    recompute(&ws, &set, "", Depth::Infinite);
    let rx = set.subscribe();

    // Commit the local edit and drop the remote addition.
    let ctx = ws.sync.context();
    let committed = ResourceSyncEntry::file("b.c", "1.2", Some(t(200)), "", None).unwrap();
    ws.sync
        .set_resource_sync(ctx, &path("p/b.c"), Some(committed))
        .unwrap();
    ws.remote.add_revision(&path("p/b.c"), "1.2");
    ws.remote.remove(&path("p/new.c"));

    recompute(&ws, &set, "p", Depth::One);
    let event = rx.try_recv().unwrap();
    assert_eq!(event.removed, vec![path("p/b.c"), path("p/new.c")]);
    assert!(event.removed_roots.is_empty());
    assert_eq!(set.len(), 2);
}

#[test]
fn resolving_everything_reports_removed_root() {
    let ws = workspace();
    let set = ReconciliationSet::default();
    recompute(&ws, &set, "", Depth::Infinite);
    let rx = set.subscribe();

    let ctx = ws.sync.context();
    let batch = ws.sync.begin(ctx, &path("p")).unwrap();
    let b = ResourceSyncEntry::file("b.c", "1.1", Some(t(200)), "", None).unwrap();
    ws.sync.set_resource_sync(ctx, &path("p/b.c"), Some(b)).unwrap();
    ws.sync.delete_resource_sync(ctx, &path("p/gone.c")).unwrap();
    batch.finish().unwrap();
    ws.remote.remove(&path("p/gone.c"));
    ws.remote.remove(&path("p/new.c"));
    ws.remote.add_revision(&path("p/sub/c.c"), "1.1");

    recompute(&ws, &set, "", Depth::Infinite);
    assert!(set.is_empty());
    let event = rx.try_recv().unwrap();
    assert_eq!(event.removed.len(), 4);
    assert_eq!(event.removed_roots, vec![path("p")]);
    assert!(!set.has_members(&WorkspacePath::root()));
}

#[test]
fn depth_zero_touches_only_the_path() {
    let ws = workspace();
    let set = ReconciliationSet::default();

    recompute(&ws, &set, "p/b.c", Depth::Zero);
    assert_eq!(set.len(), 1);

    recompute(&ws, &set, "p", Depth::Zero);
    assert_eq!(set.len(), 1);
    assert!(set.node(&path("p/b.c")).is_some());
}

#[test]
fn locally_created_directory_is_outgoing_addition() {
    let ws = workspace();
    ws.tree.add_file(&path("p/fresh/x.c"), t(5));
    let set = ReconciliationSet::default();

    recompute(&ws, &set, "p", Depth::Infinite);
    assert_eq!(
        verdict(&set, "p/fresh"),
        Some((SyncDirection::Outgoing, ChangeKind::Addition))
    );
    assert_eq!(
        verdict(&set, "p/fresh/x.c"),
        Some((SyncDirection::Outgoing, ChangeKind::Addition))
    );
    assert!(matches!(
        set.members(&path("p/fresh")).as_slice(),
        [SetMember::Node(_)]
    ));
}

#[test]
fn ignored_unversioned_resources_are_not_reported() {
    let ws = workspace();
    let ctx = ws.sync.context();
    ws.sync
        .set_ignore_patterns(ctx, &path("p"), Some(vec!["*.o".into(), "build".into()]))
        .unwrap();
    ws.tree.add_file(&path("p/a.o"), t(5));
    ws.tree.add_file(&path("p/build/out.c"), t(5));
    ws.tree.add_file(&path("p/keep.c"), t(5));
    ws.tree.add_file(&path("p/sub/z.o"), t(5));
    // A matching name with a remote counterpart is still reconciled.
    ws.remote.add_revision(&path("p/lib.o"), "1.1");
    let set = ReconciliationSet::default();

    recompute(&ws, &set, "", Depth::Infinite);
    assert_eq!(verdict(&set, "p/a.o"), None);
    assert_eq!(verdict(&set, "p/build"), None);
    assert_eq!(verdict(&set, "p/build/out.c"), None);
    assert_eq!(
        verdict(&set, "p/keep.c"),
        Some((SyncDirection::Outgoing, ChangeKind::Addition))
    );
    assert_eq!(
        verdict(&set, "p/lib.o"),
        Some((SyncDirection::Incoming, ChangeKind::Addition))
    );
    // Patterns apply to the declaring directory only.
    assert_eq!(
        verdict(&set, "p/sub/z.o"),
        Some((SyncDirection::Outgoing, ChangeKind::Addition))
    );
}

/// Sets the cancel flag after a number of token lookups.
struct CancellingRemote {
    inner: SnapshotRemote,
    cancel: CancelFlag,
    remaining: AtomicUsize,
}

impl RemoteMetadataSource for CancellingRemote {
    fn remote_token(&self, path: &WorkspacePath) -> ReconcileResult<Option<RemoteToken>> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.cancel.cancel();
        }
        self.inner.remote_token(path)
    }

    fn remote_members(&self, dir: &WorkspacePath) -> ReconcileResult<Vec<WorkspacePath>> {
        self.inner.remote_members(dir)
    }

    fn remote_kind(&self, path: &WorkspacePath) -> ReconcileResult<Option<ResourceKind>> {
        self.inner.remote_kind(path)
    }
}

#[test]
fn cancellation_keeps_partial_progress() {
    let ws = workspace();
    let cancel = CancelFlag::new();
    let remote = CancellingRemote {
        inner: ws.remote,
        cancel: cancel.clone(),
        // p, p/a.c, p/b.c
        remaining: AtomicUsize::new(3),
    };
    let set = ReconciliationSet::default();
    set.add(ReconciliationNode {
        path: path("p/zzz.c"),
        direction: SyncDirection::Incoming,
        change: ChangeKind::Deletion,
        local: None,
        base: None,
        remote: None,
    });
    let rx = set.subscribe();

    let comparator = SyncComparator::new(ws.sync.cache(), &remote, set.config());
    let err = set
        .recompute(&comparator, &WorkspacePath::root(), Depth::Infinite, &cancel)
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled));

    assert!(set.node(&path("p/b.c")).is_some());
    assert!(set.node(&path("p/new.c")).is_none());
    // Stale nodes are only swept by a completed walk.
    assert!(set.node(&path("p/zzz.c")).is_some());

    let event = rx.try_recv().unwrap();
    assert_eq!(event.added, vec![path("p/b.c")]);
}

#[test]
fn cancelled_before_start_changes_nothing() {
    let ws = workspace();
    let set = ReconciliationSet::default();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let comparator = SyncComparator::new(ws.sync.cache(), &ws.remote, set.config());
    let err = set
        .recompute(&comparator, &WorkspacePath::root(), Depth::Infinite, &cancel)
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(set.is_empty());
    assert_eq!(set.latest_sequence(), 0);
}

/// Fails token lookups for one path.
struct FlakyRemote {
    inner: SnapshotRemote,
    broken: WorkspacePath,
}

impl RemoteMetadataSource for FlakyRemote {
    fn remote_token(&self, path: &WorkspacePath) -> ReconcileResult<Option<RemoteToken>> {
        if *path == self.broken {
            return Err(ReconcileError::remote("connection reset"));
        }
        self.inner.remote_token(path)
    }

    fn remote_members(&self, dir: &WorkspacePath) -> ReconcileResult<Vec<WorkspacePath>> {
        self.inner.remote_members(dir)
    }

    fn remote_kind(&self, path: &WorkspacePath) -> ReconcileResult<Option<ResourceKind>> {
        self.inner.remote_kind(path)
    }
}

#[test]
fn classification_errors_omit_only_that_resource() {
    let ws = workspace();
    let remote = FlakyRemote {
        inner: ws.remote,
        broken: path("p/b.c"),
    };
    let set = ReconciliationSet::default();

    let comparator = SyncComparator::new(ws.sync.cache(), &remote, set.config());
    let summary = set
        .recompute(&comparator, &WorkspacePath::root(), Depth::Infinite, &CancelFlag::new())
        .unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.out_of_sync, 3);
    assert!(set.node(&path("p/b.c")).is_none());
    assert!(set.node(&path("p/sub/c.c")).is_some());
}

#[test]
fn mirror_remote_reports_only_outgoing_changes() {
    let ws = workspace();
    let remote = MirrorRemote::new(Arc::clone(&ws.sync));
    let set = ReconciliationSet::new(ReconcileConfig::default());

    let comparator = SyncComparator::new(ws.sync.cache(), &remote, set.config());
    set.recompute(&comparator, &WorkspacePath::root(), Depth::Infinite, &CancelFlag::new())
        .unwrap();

    assert_eq!(set.count(SyncDirection::Incoming), 0);
    assert_eq!(set.count(SyncDirection::Conflicting), 0);
    assert_eq!(set.count(SyncDirection::Outgoing), 2);
    assert!(set.node(&path("p/b.c")).is_some());
    assert!(set.node(&path("p/gone.c")).is_some());
}
