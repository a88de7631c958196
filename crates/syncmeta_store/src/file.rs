//! File-based metadata store.
//!
//! Records live in a metadata directory inside each workspace directory:
//!
//! ```text
//! <workspace>/<dir>/
//! └─ .syncmeta/
//!    ├─ Entries         # entry lines of the direct children
//!    ├─ Entries.Extra   # permission lines
//!    ├─ Folder          # folder sync record
//!    └─ Ignore          # ignore patterns
//! ```
//!
//! The workspace root's metadata directory additionally holds a `LOCK` file
//! so only one process mutates the store at a time.

use crate::error::{StoreError, StoreResult};
use crate::path::WorkspacePath;
use crate::store::{MetadataStore, StoreKey};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default name of the per-directory metadata directory.
pub const DEFAULT_META_DIR: &str = ".syncmeta";

const LOCK_FILE: &str = "LOCK";

/// A metadata store backed by per-directory metadata files.
///
/// # Durability
///
/// Every `write` goes to a uniquely named temporary file that is synced and
/// then renamed over the record, so readers never see a torn record.
///
/// # Example
///
/// ```no_run
/// use syncmeta_store::{FileStore, MetadataKind, MetadataStore, StoreKey, WorkspacePath};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("workspace")).unwrap();
/// let key = StoreKey::new(WorkspacePath::new("proj"), MetadataKind::ResourceSyncGroup);
/// store.write(&key, b"/a.c/1.1//-kkv/\n").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    meta_dir: String,
    _lock_file: File,
}

impl FileStore {
    /// Opens the store rooted at `root` using [`DEFAULT_META_DIR`].
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory, the lock file cannot
    /// be created, or another process holds the lock.
    pub fn open(root: &Path) -> StoreResult<Self> {
        Self::open_with_meta_dir(root, DEFAULT_META_DIR)
    }

    /// Opens the store with a custom metadata directory name.
    ///
    /// # Errors
    ///
    /// See [`FileStore::open`].
    pub fn open_with_meta_dir(root: &Path, meta_dir: &str) -> StoreResult<Self> {
        if !root.is_dir() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("workspace root is not a directory: {}", root.display()),
            )));
        }

        let lock_dir = root.join(meta_dir);
        fs::create_dir_all(&lock_dir)?;
        let lock_path = lock_dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(lock_path));
        }

        debug!(root = %root.display(), meta_dir, "opened metadata store");

        Ok(Self {
            root: root.to_path_buf(),
            meta_dir: meta_dir.to_string(),
            _lock_file: lock_file,
        })
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the metadata directory name.
    #[must_use]
    pub fn meta_dir(&self) -> &str {
        &self.meta_dir
    }

    /// Returns the metadata directory for a workspace directory.
    #[must_use]
    pub fn meta_dir_for(&self, dir: &WorkspacePath) -> PathBuf {
        dir.to_fs_path(&self.root).join(&self.meta_dir)
    }

    fn record_path(&self, key: &StoreKey) -> PathBuf {
        self.meta_dir_for(&key.path).join(key.kind.file_name())
    }
}

impl MetadataStore for FileStore {
    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.record_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &StoreKey, data: &[u8]) -> StoreResult<()> {
        let target = self.record_path(key);
        let dir = self.meta_dir_for(&key.path);
        fs::create_dir_all(&dir)?;

        let temp = dir.join(format!(
            ".{}.{}.tmp",
            key.kind.file_name(),
            uuid::Uuid::new_v4().simple()
        ));
        {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> StoreResult<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        // Drop the metadata directory once its last record is gone.
        if !key.path.is_root() {
            let _ = fs::remove_dir(self.meta_dir_for(&key.path));
        }
        Ok(())
    }
}
