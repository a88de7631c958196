//! Three-way classification of a single resource.

use crate::config::ReconcileConfig;
use crate::error::ReconcileResult;
use crate::ignore::IgnoreMatcher;
use crate::remote::{RemoteMetadataSource, RemoteToken};
use serde::Serialize;
use std::fmt;
use syncmeta_codec::{FileKind, ResourceSyncEntry};
use syncmeta_core::SyncMetadataCache;
use syncmeta_store::{ResourceKind, ResourceStat, WorkspacePath};
use tracing::trace;

/// Which side changed relative to the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyncDirection {
    /// Only the remote side changed.
    Incoming,
    /// Only the local side changed.
    Outgoing,
    /// Both sides changed.
    Conflicting,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => f.pad("incoming"),
            Self::Outgoing => f.pad("outgoing"),
            Self::Conflicting => f.pad("conflicting"),
        }
    }
}

/// What kind of change a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    /// The resource did not exist in the base.
    Addition,
    /// The resource disappeared from at least one side.
    Deletion,
    /// The resource exists everywhere but differs.
    Change,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addition => f.pad("addition"),
            Self::Deletion => f.pad("deletion"),
            Self::Change => f.pad("change"),
        }
    }
}

/// One out-of-sync resource with the inputs it was classified from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationNode {
    /// The resource.
    pub path: WorkspacePath,
    /// Which side changed.
    pub direction: SyncDirection,
    /// Addition, deletion or change.
    pub change: ChangeKind,
    /// What the working copy holds.
    pub local: Option<ResourceStat>,
    /// The recorded base.
    pub base: Option<ResourceSyncEntry>,
    /// The remote token.
    pub remote: Option<RemoteToken>,
}

/// Outcome of classifying one path.
#[derive(Debug, Clone)]
pub struct Classification {
    /// The node, or `None` when the resource is in sync.
    pub node: Option<ReconciliationNode>,
    /// Whether the resource is a directory on any side.
    pub is_container: bool,
}

/// Classifies resources by comparing local, base and remote state.
pub struct SyncComparator<'a> {
    cache: &'a SyncMetadataCache,
    remote: &'a dyn RemoteMetadataSource,
    detect_pseudo_conflicts: bool,
}

impl<'a> SyncComparator<'a> {
    /// Creates a comparator over a cache and a remote source.
    pub fn new(
        cache: &'a SyncMetadataCache,
        remote: &'a dyn RemoteMetadataSource,
        config: &ReconcileConfig,
    ) -> Self {
        Self {
            cache,
            remote,
            detect_pseudo_conflicts: config.detect_pseudo_conflicts,
        }
    }

    /// Returns the cache the comparator reads.
    pub fn cache(&self) -> &SyncMetadataCache {
        self.cache
    }

    /// Returns the remote source.
    pub fn remote(&self) -> &dyn RemoteMetadataSource {
        self.remote
    }

    /// Returns the union of local, phantom and remote children of `dir`.
    pub fn children(&self, dir: &WorkspacePath) -> ReconcileResult<Vec<WorkspacePath>> {
        let mut children = self.cache.list_children_with_sync(dir)?;
        children.extend(self.remote.remote_members(dir)?);
        children.sort();
        children.dedup();
        Ok(children)
    }

    /// Classifies `path`, returning `None` when it is in sync.
    pub fn classify(&self, path: &WorkspacePath) -> ReconcileResult<Option<ReconciliationNode>> {
        Ok(self.classify_full(path)?.node)
    }

    /// Classifies `path` and reports whether it is a directory.
    ///
    /// The workspace root is always an in-sync container. A local resource
    /// with no base, no folder record and no remote counterpart whose name
    /// matches an ignore pattern of its parent is in sync and not walked.
    pub fn classify_full(&self, path: &WorkspacePath) -> ReconcileResult<Classification> {
        if path.is_root() {
            return Ok(Classification {
                node: None,
                is_container: true,
            });
        }

        let local = self.cache.tree().stat(path)?;
        let base = self.cache.get_resource_sync(path)?;
        let remote = self.remote.remote_token(path)?;
        if local.is_some() && base.is_none() && remote.is_none() && self.is_ignored(path)? {
            trace!(path = %path, "ignored unversioned resource");
            return Ok(Classification {
                node: None,
                is_container: false,
            });
        }
        let remote_kind = match remote {
            Some(_) => self.remote.remote_kind(path)?,
            None => None,
        };

        let is_container = local.is_some_and(|stat| stat.is_directory())
            || base.as_ref().is_some_and(ResourceSyncEntry::is_directory)
            || remote_kind == Some(ResourceKind::Directory);

        let verdict = if is_container {
            let managed = base.as_ref().is_some_and(ResourceSyncEntry::is_directory)
                || self.cache.get_folder_sync(path)?.is_some();
            self.classify_directory(local.is_some(), managed, remote.is_some())
        } else {
            self.classify_file(local.as_ref(), base.as_ref(), remote.as_ref())
        };

        let node = verdict.map(|(direction, change)| ReconciliationNode {
            path: path.clone(),
            direction,
            change,
            local,
            base,
            remote,
        });
        Ok(Classification { node, is_container })
    }

    /// Returns true if the parent's ignore patterns cover `path` and no
    /// folder record claims it.
    fn is_ignored(&self, path: &WorkspacePath) -> ReconcileResult<bool> {
        let Some(parent) = path.parent() else {
            return Ok(false);
        };
        let Some(patterns) = self.cache.get_ignore_patterns(&parent)? else {
            return Ok(false);
        };
        if !IgnoreMatcher::new(&patterns).is_match(path.name()) {
            return Ok(false);
        }
        Ok(self.cache.get_folder_sync(path)?.is_none())
    }

    fn classify_directory(
        &self,
        local: bool,
        base: bool,
        remote: bool,
    ) -> Option<(SyncDirection, ChangeKind)> {
        let local_changed = local != base;
        let remote_changed = remote != base;
        let direction = match (local_changed, remote_changed) {
            (false, false) => return None,
            (true, false) => SyncDirection::Outgoing,
            (false, true) => SyncDirection::Incoming,
            (true, true) if self.detect_pseudo_conflicts && local == remote => return None,
            (true, true) => SyncDirection::Conflicting,
        };
        let change = match direction {
            SyncDirection::Outgoing if local => ChangeKind::Addition,
            SyncDirection::Incoming if remote => ChangeKind::Addition,
            SyncDirection::Conflicting if !base => ChangeKind::Addition,
            _ => ChangeKind::Deletion,
        };
        Some((direction, change))
    }

    fn classify_file(
        &self,
        local: Option<&ResourceStat>,
        base: Option<&ResourceSyncEntry>,
        remote: Option<&RemoteToken>,
    ) -> Option<(SyncDirection, ChangeKind)> {
        let local_changed = local_changed(local, base);
        let base_token = base
            .filter(|entry| !entry.is_added())
            .and_then(ResourceSyncEntry::revision)
            .map(RemoteToken::from_revision);
        let remote_changed = base_token.as_ref() != remote;

        let local_gone = local.is_none() || base.is_some_and(ResourceSyncEntry::is_deleted);
        let base_known = base_token.is_some();

        let direction = match (local_changed, remote_changed) {
            (false, false) => return None,
            (true, false) => SyncDirection::Outgoing,
            (false, true) => SyncDirection::Incoming,
            (true, true) if self.detect_pseudo_conflicts && local_gone && remote.is_none() => {
                return None
            }
            (true, true) => SyncDirection::Conflicting,
        };

        let change = match direction {
            SyncDirection::Outgoing => {
                if local_gone {
                    ChangeKind::Deletion
                } else if !base_known {
                    ChangeKind::Addition
                } else {
                    ChangeKind::Change
                }
            }
            SyncDirection::Incoming => {
                if remote.is_none() {
                    ChangeKind::Deletion
                } else if !base_known {
                    ChangeKind::Addition
                } else {
                    ChangeKind::Change
                }
            }
            SyncDirection::Conflicting => {
                if !base_known {
                    ChangeKind::Addition
                } else if local_gone || remote.is_none() {
                    ChangeKind::Deletion
                } else {
                    ChangeKind::Change
                }
            }
        };
        Some((direction, change))
    }
}

/// Returns true if the working copy differs from the recorded base.
///
/// Added, deleted, dummy and merged entries always count as changed; a
/// regular entry is unchanged while its timestamp matches the file.
fn local_changed(local: Option<&ResourceStat>, base: Option<&ResourceSyncEntry>) -> bool {
    match (local, base) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(stat), Some(entry)) => {
            if entry.is_added() || entry.is_deleted() || stat.is_directory() {
                return true;
            }
            if entry.file_kind() != Some(FileKind::Regular) {
                return true;
            }
            entry.timestamp() != stat.modified
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::SnapshotRemote;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use syncmeta_codec::FolderSyncEntry;
    use syncmeta_core::{ChangeFeed, SyncMetadataCache};
    use syncmeta_store::{InMemoryStore, InMemoryTree};

    struct Fixture {
        tree: Arc<InMemoryTree>,
        cache: SyncMetadataCache,
        remote: SnapshotRemote,
    }

    impl Fixture {
        fn new() -> Self {
            let tree = Arc::new(InMemoryTree::new());
            let cache = SyncMetadataCache::new(
                Arc::new(InMemoryStore::new()),
                tree.clone(),
                Arc::new(ChangeFeed::new()),
            );
            cache
                .set_folder_sync(
                    &path("p"),
                    Some(FolderSyncEntry::new("p", ":local:/repo", "p").unwrap()),
                );
            Self {
                tree,
                cache,
                remote: SnapshotRemote::new(),
            }
        }

        fn base(&self, entry: ResourceSyncEntry) {
            let path = path("p").join(entry.name());
            self.cache.set_resource_sync(&path, Some(entry)).unwrap();
        }

        fn classify(&self, p: &str) -> Option<ReconciliationNode> {
            self.classify_with(p, &ReconcileConfig::default())
        }

        fn classify_with(&self, p: &str, config: &ReconcileConfig) -> Option<ReconciliationNode> {
            SyncComparator::new(&self.cache, &self.remote, config)
                .classify(&path(p))
                .unwrap()
        }
    }

    fn path(p: &str) -> WorkspacePath {
        WorkspacePath::new(p)
    }

    fn t(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn regular(name: &str, rev: &str, secs: i64) -> ResourceSyncEntry {
        ResourceSyncEntry::file(name, rev, Some(t(secs)), "", None).unwrap()
    }

    fn verdict(node: Option<ReconciliationNode>) -> Option<(SyncDirection, ChangeKind)> {
        node.map(|n| (n.direction, n.change))
    }

    #[test]
    fn unchanged_file_is_in_sync() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/a.c"), t(100));
        fx.base(regular("a.c", "1.1", 100));
        fx.remote.add_revision(&path("p/a.c"), "1.1");

        assert!(fx.classify("p/a.c").is_none());
    }

    #[test]
    fn modified_file_is_outgoing_change() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/a.c"), t(200));
        fx.base(regular("a.c", "1.1", 100));
        fx.remote.add_revision(&path("p/a.c"), "1.1");

        let node = fx.classify("p/a.c").unwrap();
        assert_eq!(node.direction, SyncDirection::Outgoing);
        assert_eq!(node.change, ChangeKind::Change);
        assert_eq!(node.base.unwrap().revision(), Some("1.1"));
    }

    #[test]
    fn new_remote_revision_is_incoming() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/a.c"), t(100));
        fx.base(regular("a.c", "1.1", 100));
        fx.remote.add_revision(&path("p/a.c"), "1.2");

        assert_eq!(
            verdict(fx.classify("p/a.c")),
            Some((SyncDirection::Incoming, ChangeKind::Change))
        );
    }

    #[test]
    fn both_modified_is_conflict() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/a.c"), t(300));
        fx.base(regular("a.c", "1.1", 100));
        fx.remote.add_revision(&path("p/a.c"), "1.2");

        assert_eq!(
            verdict(fx.classify("p/a.c")),
            Some((SyncDirection::Conflicting, ChangeKind::Change))
        );
    }

    #[test]
    fn added_entry_is_outgoing_addition() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/new.c"), t(100));
        fx.base(ResourceSyncEntry::added("new.c", "").unwrap());

        assert_eq!(
            verdict(fx.classify("p/new.c")),
            Some((SyncDirection::Outgoing, ChangeKind::Addition))
        );
    }

    #[test]
    fn unmanaged_local_file_is_outgoing_addition() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/stray.c"), t(100));

        assert_eq!(
            verdict(fx.classify("p/stray.c")),
            Some((SyncDirection::Outgoing, ChangeKind::Addition))
        );
    }

    #[test]
    fn remote_only_file_is_incoming_addition() {
        let fx = Fixture::new();
        fx.remote.add_revision(&path("p/b.c"), "1.1");

        assert_eq!(
            verdict(fx.classify("p/b.c")),
            Some((SyncDirection::Incoming, ChangeKind::Addition))
        );
    }

    #[test]
    fn remote_removal_is_incoming_deletion() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/a.c"), t(100));
        fx.base(regular("a.c", "1.1", 100));

        assert_eq!(
            verdict(fx.classify("p/a.c")),
            Some((SyncDirection::Incoming, ChangeKind::Deletion))
        );
    }

    #[test]
    fn local_deletion_is_outgoing_deletion() {
        let fx = Fixture::new();
        fx.base(regular("a.c", "1.1", 100).with_deleted(true));
        fx.remote.add_revision(&path("p/a.c"), "1.1");

        assert_eq!(
            verdict(fx.classify("p/a.c")),
            Some((SyncDirection::Outgoing, ChangeKind::Deletion))
        );
    }

    #[test]
    fn both_deleted_is_pseudo_conflict() {
        let fx = Fixture::new();
        fx.base(regular("a.c", "1.1", 100).with_deleted(true));

        assert!(fx.classify("p/a.c").is_none());

        let strict = ReconcileConfig::default().detect_pseudo_conflicts(false);
        assert_eq!(
            verdict(fx.classify_with("p/a.c", &strict)),
            Some((SyncDirection::Conflicting, ChangeKind::Deletion))
        );
    }

    #[test]
    fn dummy_and_merged_entries_are_local_changes() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/a.c"), t(100));
        fx.tree.add_file(&path("p/b.c"), t(100));
        fx.base(regular("a.c", "1.1", 100).with_file_kind(FileKind::Dummy));
        fx.base(regular("b.c", "1.1", 100).with_file_kind(FileKind::Merged));
        fx.remote.add_revision(&path("p/a.c"), "1.1");
        fx.remote.add_revision(&path("p/b.c"), "1.1");

        assert_eq!(
            fx.classify("p/a.c").unwrap().direction,
            SyncDirection::Outgoing
        );
        assert_eq!(
            fx.classify("p/b.c").unwrap().direction,
            SyncDirection::Outgoing
        );
    }

    #[test]
    fn directories_compare_by_existence() {
        let fx = Fixture::new();
        fx.tree.add_dir(&path("p"));
        fx.remote.add_dir(&path("p"));
        assert!(fx.classify("p").is_none());

        fx.remote.add_dir(&path("q"));
        assert_eq!(
            verdict(fx.classify("q")),
            Some((SyncDirection::Incoming, ChangeKind::Addition))
        );

        fx.tree.add_dir(&path("r"));
        assert_eq!(
            verdict(fx.classify("r")),
            Some((SyncDirection::Outgoing, ChangeKind::Addition))
        );

        // Created on both sides without a base: existence agrees.
        fx.tree.add_dir(&path("q"));
        assert!(fx.classify("q").is_none());
        let strict = ReconcileConfig::default().detect_pseudo_conflicts(false);
        assert_eq!(
            verdict(fx.classify_with("q", &strict)),
            Some((SyncDirection::Conflicting, ChangeKind::Addition))
        );
    }

    #[test]
    fn root_is_never_classified() {
        let fx = Fixture::new();
        let comparator = SyncComparator::new(&fx.cache, &fx.remote, &ReconcileConfig::default());
        let outcome = comparator.classify_full(&WorkspacePath::root()).unwrap();
        assert!(outcome.node.is_none());
        assert!(outcome.is_container);
    }

    #[test]
    fn children_union_local_phantom_and_remote() {
        let fx = Fixture::new();
        fx.tree.add_file(&path("p/local.c"), t(1));
        fx.base(regular("phantom.c", "1.1", 1));
        fx.remote.add_revision(&path("p/remote.c"), "1.1");
        fx.remote.add_revision(&path("p/local.c"), "1.1");

        let comparator = SyncComparator::new(&fx.cache, &fx.remote, &ReconcileConfig::default());
        assert_eq!(
            comparator.children(&path("p")).unwrap(),
            vec![path("p/local.c"), path("p/phantom.c"), path("p/remote.c")]
        );
    }
}
