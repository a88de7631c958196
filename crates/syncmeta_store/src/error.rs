//! Error types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing metadata records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored record could not be interpreted by the store itself.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// A failure injected by a test store.
    #[error("injected failure for {key}")]
    Injected {
        /// The key the failure was injected for.
        key: String,
    },

    /// Another process holds the store lock.
    #[error("metadata store locked: {}", .0.display())]
    Locked(PathBuf),

    /// A path climbs above the workspace root.
    #[error("path escapes the workspace root: {0:?}")]
    PathEscapesRoot(String),
}

impl StoreError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an injected failure error.
    pub fn injected(key: impl ToString) -> Self {
        Self::Injected {
            key: key.to_string(),
        }
    }
}
