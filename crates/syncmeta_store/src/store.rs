//! Metadata store trait definition.

use crate::error::StoreResult;
use crate::path::WorkspacePath;
use std::fmt;

/// The kind of metadata record kept for a directory.
///
/// Resource entries of siblings are stored together in one
/// [`MetadataKind::ResourceSyncGroup`] record owned by their parent directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKind {
    /// The directory's own folder sync record (root, repository, tag).
    FolderSync,
    /// Entry lines for all direct children of the directory.
    ResourceSyncGroup,
    /// Permission lines for the direct children of the directory.
    Permissions,
    /// Ignore patterns declared for the directory.
    IgnorePatterns,
}

impl MetadataKind {
    /// Returns the file name used by file-backed stores.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            MetadataKind::FolderSync => "Folder",
            MetadataKind::ResourceSyncGroup => "Entries",
            MetadataKind::Permissions => "Entries.Extra",
            MetadataKind::IgnorePatterns => "Ignore",
        }
    }
}

/// Identifies one metadata record: a directory path plus a record kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    /// The directory owning the record.
    pub path: WorkspacePath,
    /// The kind of record.
    pub kind: MetadataKind,
}

impl StoreKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(path: WorkspacePath, kind: MetadataKind) -> Self {
        Self { path, kind }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.kind.file_name())
    }
}

/// A persistent store for opaque metadata records.
///
/// Stores never interpret the bytes they hold; the codec owns the format.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write`, or
///   `None` if the record was never written or has been deleted
/// - `write` replaces the record atomically: readers observe the old or the
///   new bytes, never a mix
/// - `delete` of a missing record succeeds
/// - Stores must be `Send + Sync` for concurrent access
pub trait MetadataStore: Send + Sync {
    /// Reads a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium fails.
    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically replaces a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be written.
    fn write(&self, key: &StoreKey, data: &[u8]) -> StoreResult<()>;

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but could not be removed.
    fn delete(&self, key: &StoreKey) -> StoreResult<()>;
}
