//! Workspace-relative resource paths.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A normalised, `/`-separated path relative to the workspace root.
///
/// The workspace root itself is the empty path. Normalisation drops empty
/// and `.` segments and resolves `..` against the preceding segment, so
/// `"/proj//src/./a.c"`, `"proj/lib/../src/a.c"` and `"proj/src/a.c"` are
/// equal. No normalised path ever leaves the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspacePath(String);

impl WorkspacePath {
    /// Returns the workspace root.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Creates a normalised path. A `..` at the root stays at the root.
    #[must_use]
    pub fn new(path: &str) -> Self {
        let (segments, _) = Self::resolve(path);
        Self(segments.join("/"))
    }

    /// Creates a normalised path, refusing one that climbs above the root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PathEscapesRoot`] if a `..` segment has no
    /// segment left to cancel.
    pub fn parse(path: &str) -> StoreResult<Self> {
        let (segments, escapes) = Self::resolve(path);
        if escapes {
            return Err(StoreError::PathEscapesRoot(path.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    fn resolve(path: &str) -> (Vec<&str>, bool) {
        let mut segments = Vec::new();
        let mut escapes = false;
        for segment in path.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => escapes |= segments.pop().is_none(),
                _ => segments.push(segment),
            }
        }
        (segments, escapes)
    }

    /// Returns true for the workspace root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last segment, or `""` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<WorkspacePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Appends a single child name.
    #[must_use]
    pub fn join(&self, name: &str) -> WorkspacePath {
        if self.is_root() {
            Self::new(name)
        } else {
            Self::new(&format!("{}/{}", self.0, name))
        }
    }

    /// Returns the number of segments (0 for the root).
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.split('/').count()
        }
    }

    /// Iterates over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Returns true if `self` equals `other` or is one of its ancestors.
    #[must_use]
    pub fn contains(&self, other: &WorkspacePath) -> bool {
        if self.is_root() || self == other {
            return true;
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &WorkspacePath) -> bool {
        self != other && self.contains(other)
    }

    /// Returns the chain of parents, nearest first, ending with the root.
    #[must_use]
    pub fn ancestors(&self) -> Vec<WorkspacePath> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            out.push(path);
        }
        out
    }

    /// Resolves the path against a file system base directory.
    #[must_use]
    pub fn to_fs_path(&self, base: &Path) -> PathBuf {
        self.segments().fold(base.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

impl fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for WorkspacePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl TryFrom<String> for WorkspacePath {
    type Error = StoreError;

    fn try_from(path: String) -> StoreResult<Self> {
        Self::parse(&path)
    }
}

impl From<WorkspacePath> for String {
    fn from(path: WorkspacePath) -> Self {
        path.0
    }
}
