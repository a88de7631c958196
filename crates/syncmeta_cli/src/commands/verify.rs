//! Verify command implementation.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use syncmeta_codec::{parse_entries_lenient, parse_ignore_patterns, parse_permissions, FolderSyncEntry};
use syncmeta_store::{
    FileStore, FsTree, MetadataKind, MetadataStore, StoreKey, StoreResult, WorkspacePath,
    WorkspaceTree,
};

/// One problem found in a metadata record.
#[derive(Debug, Serialize)]
pub struct Issue {
    /// The record, as `dir#File`.
    pub record: String,
    /// What is wrong with it.
    pub message: String,
}

/// Verification result.
#[derive(Debug, Default, Serialize)]
pub struct VerifyResult {
    /// Number of directories visited.
    pub dirs_checked: usize,
    /// Number of records read.
    pub records_checked: usize,
    /// Number of entry lines that parsed.
    pub valid_entries: usize,
    /// Problems found.
    pub issues: Vec<Issue>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, key: &StoreKey, message: impl Into<String>) {
        self.issues.push(Issue {
            record: key.to_string(),
            message: message.into(),
        });
    }
}

/// Runs the verify command.
pub fn run(root: &Path, meta_dir: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying workspace at {:?}", root);
    println!();

    let result = verify_workspace(root, meta_dir)?;

    println!("Directories checked: {}", result.dirs_checked);
    println!("Records checked:     {}", result.records_checked);
    println!("Valid entries:       {}", result.valid_entries);
    for issue in &result.issues {
        println!("  ERROR {}: {}", issue.record, issue.message);
    }

    println!();
    if result.is_ok() {
        println!("✓ Workspace verification passed");
        Ok(())
    } else {
        println!("✗ Workspace verification failed");
        Err("Verification failed".into())
    }
}

/// Reads every metadata record below `root` and reports malformed content.
pub fn verify_workspace(root: &Path, meta_dir: &str) -> StoreResult<VerifyResult> {
    let store = FileStore::open_with_meta_dir(root, meta_dir)?;
    let tree = FsTree::new(root, &[meta_dir]);
    let mut result = VerifyResult::default();

    let mut dirs = vec![WorkspacePath::root()];
    while let Some(dir) = dirs.pop() {
        result.dirs_checked += 1;
        verify_dir(&store, &dir, &mut result)?;
        for child in tree.list_children(&dir)? {
            if tree.stat(&child)?.is_some_and(|stat| stat.is_directory()) {
                dirs.push(child);
            }
        }
    }
    Ok(result)
}

fn verify_dir(
    store: &dyn MetadataStore,
    dir: &WorkspacePath,
    result: &mut VerifyResult,
) -> StoreResult<()> {
    let key = |kind| StoreKey::new(dir.clone(), kind);

    let folder_key = key(MetadataKind::FolderSync);
    let managed = match store.read(&folder_key)? {
        Some(bytes) => {
            result.records_checked += 1;
            if let Err(e) = FolderSyncEntry::parse(dir.name(), &bytes) {
                result.issue(&folder_key, e.to_string());
            }
            true
        }
        None => false,
    };

    let entries_key = key(MetadataKind::ResourceSyncGroup);
    let mut names = BTreeSet::new();
    if let Some(bytes) = store.read(&entries_key)? {
        result.records_checked += 1;
        match parse_entries_lenient(&bytes) {
            Ok(parsed) => {
                result.valid_entries += parsed.entries.len();
                for error in parsed.malformed {
                    result.issue(&entries_key, error.to_string());
                }
                names.extend(parsed.entries.iter().map(|e| e.name().to_string()));
                if !managed && !parsed.entries.is_empty() {
                    result.issue(&entries_key, "entries recorded without a folder record");
                }
            }
            Err(e) => result.issue(&entries_key, e.to_string()),
        }
    }

    let permissions_key = key(MetadataKind::Permissions);
    if let Some(bytes) = store.read(&permissions_key)? {
        result.records_checked += 1;
        match parse_permissions(&bytes) {
            Ok(lines) => {
                for (name, _) in lines.iter().filter(|(name, _)| !names.contains(name)) {
                    result.issue(&permissions_key, format!("permissions for unknown entry {name:?}"));
                }
            }
            Err(e) => result.issue(&permissions_key, e.to_string()),
        }
    }

    let ignore_key = key(MetadataKind::IgnorePatterns);
    if let Some(bytes) = store.read(&ignore_key)? {
        result.records_checked += 1;
        if let Err(e) = parse_ignore_patterns(&bytes) {
            result.issue(&ignore_key, e.to_string());
        }
    }

    Ok(())
}
