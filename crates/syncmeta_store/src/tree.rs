//! Workspace tree contract.

use crate::error::StoreResult;
use crate::path::WorkspacePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a workspace resource is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A regular file.
    File,
    /// A directory (container).
    Directory,
}

/// What the working copy currently holds at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStat {
    /// File or directory.
    pub kind: ResourceKind,
    /// Modification time truncated to whole seconds; `None` for directories
    /// or when the platform cannot report it.
    pub modified: Option<DateTime<Utc>>,
}

impl ResourceStat {
    /// Creates a file stat.
    #[must_use]
    pub fn file(modified: DateTime<Utc>) -> Self {
        Self {
            kind: ResourceKind::File,
            modified: Some(modified),
        }
    }

    /// Creates a directory stat.
    #[must_use]
    pub fn directory() -> Self {
        Self {
            kind: ResourceKind::Directory,
            modified: None,
        }
    }

    /// Returns true for directories.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == ResourceKind::Directory
    }
}

/// Read-only view of the working copy.
///
/// The metadata cache only needs to enumerate children and check existence;
/// it never creates or deletes workspace resources itself.
pub trait WorkspaceTree: Send + Sync {
    /// Returns the current state of `path`, or `None` if nothing exists there.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be queried.
    fn stat(&self, path: &WorkspacePath) -> StoreResult<Option<ResourceStat>>;

    /// Lists the direct children of `dir`. A missing directory has no children.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    fn list_children(&self, dir: &WorkspacePath) -> StoreResult<Vec<WorkspacePath>>;
}
