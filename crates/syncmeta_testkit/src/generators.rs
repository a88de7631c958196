//! Property-based test generators using proptest.
//!
//! Provides strategies for generating entry lines, workspace layouts and
//! session operations that satisfy the encoding rules of the codec.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use syncmeta_codec::{FileKind, ResourceSyncEntry, Tag};
use syncmeta_store::WorkspacePath;

/// Strategy for generating valid resource names.
pub fn entry_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_.-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating dotted revisions such as `1.4` or `1.2.2.1`.
pub fn revision_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(1u32..200, 1..3).prop_map(|pairs| {
        let mut parts = vec!["1".to_string()];
        for (i, n) in pairs.into_iter().enumerate() {
            if i > 0 {
                parts.push("2".to_string());
            }
            parts.push(n.to_string());
        }
        parts.join(".")
    })
}

/// Strategy for generating sticky tags.
pub fn tag_strategy() -> impl Strategy<Value = Tag> {
    let name = prop::string::string_regex("[A-Za-z][A-Za-z0-9_-]{0,11}")
        .expect("Invalid regex")
        .boxed();
    prop_oneof![
        name.clone().prop_map(Tag::Branch),
        name.prop_map(Tag::Version),
        (2000u32..2030, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| Tag::Date(format!("{y}.{m:02}.{d:02}.00.00.00"))),
    ]
}

/// Strategy for generating entry timestamps with whole-second precision.
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .expect("timestamp in range")
    })
}

/// Strategy for generating the timestamp state of a file entry.
///
/// Only combinations that the timestamp field can represent are produced:
/// plain files carry a date, dummy and merged files carry none.
pub fn file_stamp_strategy() -> impl Strategy<Value = (Option<DateTime<Utc>>, FileKind)> {
    prop_oneof![
        4 => timestamp_strategy().prop_map(|t| (Some(t), FileKind::Regular)),
        1 => Just((None, FileKind::Dummy)),
        1 => Just((None, FileKind::Merged)),
        1 => timestamp_strategy().prop_map(|t| (Some(t), FileKind::MergedWithConflicts)),
    ]
}

/// Strategy for generating file entries of every flavor.
pub fn file_entry_strategy() -> impl Strategy<Value = ResourceSyncEntry> {
    (
        entry_name_strategy(),
        revision_strategy(),
        file_stamp_strategy(),
        prop::sample::select(vec!["", "-kb", "-ko", "-kkv"]),
        prop::option::of(tag_strategy()),
        any::<bool>(),
    )
        .prop_map(|(name, revision, (timestamp, kind), mode, tag, deleted)| {
            ResourceSyncEntry::file(&name, &revision, timestamp, mode, tag)
                .expect("generated entry is valid")
                .with_file_kind(kind)
                .with_deleted(deleted)
        })
}

/// Strategy for generating file, added-file and directory entries.
pub fn resource_entry_strategy() -> impl Strategy<Value = ResourceSyncEntry> {
    prop_oneof![
        6 => file_entry_strategy(),
        1 => entry_name_strategy()
            .prop_map(|name| ResourceSyncEntry::added(&name, "").expect("generated entry is valid")),
        2 => entry_name_strategy()
            .prop_map(|name| ResourceSyncEntry::directory(&name).expect("generated entry is valid")),
    ]
}

/// Strategy for generating entry groups with unique names.
pub fn entry_group_strategy(max_entries: usize) -> impl Strategy<Value = Vec<ResourceSyncEntry>> {
    prop::collection::vec(resource_entry_strategy(), 0..max_entries).prop_map(|entries| {
        let mut seen = std::collections::BTreeSet::new();
        entries
            .into_iter()
            .filter(|entry| seen.insert(entry.name().to_string()))
            .collect()
    })
}

/// Strategy for generating workspace paths from a small alphabet, so that
/// generated paths share ancestors often.
pub fn workspace_path_strategy(max_depth: usize) -> impl Strategy<Value = WorkspacePath> {
    prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 1..=max_depth.max(1))
        .prop_map(|segments| WorkspacePath::new(&segments.join("/")))
}

/// Strategy for generating a set of file paths, each at least two levels
/// deep, with no path being an ancestor of another.
pub fn leaf_set_strategy(max_leaves: usize) -> impl Strategy<Value = Vec<WorkspacePath>> {
    prop::collection::vec(
        (workspace_path_strategy(3), entry_name_strategy()),
        1..max_leaves.max(2),
    )
    .prop_map(|pairs| {
        let mut leaves: Vec<WorkspacePath> = pairs
            .into_iter()
            .map(|(dir, name)| dir.join(&format!("{name}.f")))
            .collect();
        leaves.sort();
        leaves.dedup();
        leaves
    })
}

/// A scripted session operation.
#[derive(Debug, Clone)]
pub enum SessionOperation {
    /// Set a file entry
    Track {
        /// File path
        path: WorkspacePath,
        /// Revision
        revision: String,
    },
    /// Clear an entry
    Forget {
        /// File path
        path: WorkspacePath,
    },
    /// Read an entry
    Read {
        /// File path
        path: WorkspacePath,
    },
    /// Discard cached state
    Purge {
        /// Directory
        dir: WorkspacePath,
        /// Whether descendants are purged too
        deep: bool,
    },
}

/// Strategy for generating session operations on files directly below one
/// of the given managed directories.
pub fn session_operation_strategy(
    dirs: Vec<WorkspacePath>,
) -> impl Strategy<Value = SessionOperation> {
    let dir = prop::sample::select(dirs);
    let file = (dir.clone(), prop::sample::select(vec!["a.c", "b.c", "c.h", "d.txt"]))
        .prop_map(|(dir, name)| dir.join(name));
    prop_oneof![
        4 => (file.clone(), revision_strategy())
            .prop_map(|(path, revision)| SessionOperation::Track { path, revision }),
        2 => file.clone().prop_map(|path| SessionOperation::Forget { path }),
        2 => file.prop_map(|path| SessionOperation::Read { path }),
        1 => (dir, any::<bool>()).prop_map(|(dir, deep)| SessionOperation::Purge { dir, deep }),
    ]
}

/// Strategy for generating a sequence of session operations.
pub fn session_sequence_strategy(
    dirs: Vec<WorkspacePath>,
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<SessionOperation>> {
    prop::collection::vec(session_operation_strategy(dirs), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
