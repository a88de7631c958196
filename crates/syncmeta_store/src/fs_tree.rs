//! Workspace tree over the local file system.

use crate::error::StoreResult;
use crate::path::WorkspacePath;
use crate::tree::{ResourceKind, ResourceStat, WorkspaceTree};
use chrono::{DateTime, SubsecRound, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A [`WorkspaceTree`] reading a directory on disk.
///
/// Metadata directories (by name) are hidden from listings.
#[derive(Debug, Clone)]
pub struct FsTree {
    root: PathBuf,
    hidden: Vec<String>,
}

impl FsTree {
    /// Creates a tree rooted at `root`, hiding entries named `hidden`.
    #[must_use]
    pub fn new(root: &Path, hidden: &[&str]) -> Self {
        Self {
            root: root.to_path_buf(),
            hidden: hidden.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorkspaceTree for FsTree {
    fn stat(&self, path: &WorkspacePath) -> StoreResult<Option<ResourceStat>> {
        let metadata = match fs::metadata(path.to_fs_path(&self.root)) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if metadata.is_dir() {
            return Ok(Some(ResourceStat::directory()));
        }
        let modified = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).trunc_subsecs(0));
        Ok(Some(ResourceStat {
            kind: ResourceKind::File,
            modified,
        }))
    }

    fn list_children(&self, dir: &WorkspacePath) -> StoreResult<Vec<WorkspacePath>> {
        let entries = match fs::read_dir(dir.to_fs_path(&self.root)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut children = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if self.hidden.iter().any(|h| *h == name) {
                continue;
            }
            children.push(dir.join(&name));
        }
        children.sort();
        Ok(children)
    }
}
