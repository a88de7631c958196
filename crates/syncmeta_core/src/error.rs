//! Error types for syncmeta core.

use syncmeta_store::{StoreError, StoreKey};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in cache, lock and synchronizer operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Metadata codec error.
    #[error("codec error: {0}")]
    Codec(#[from] syncmeta_codec::CodecError),

    /// Unmatched acquire/release or begin/end, or a nested rule that is not
    /// contained in the outer one. Always a caller bug.
    #[error("lock protocol violation: {message}")]
    LockProtocolViolation {
        /// What the caller did wrong.
        message: String,
    },

    /// A mutation was attempted from a context registered as read-only.
    #[error("context {context} is read-only")]
    ReadOnlyContext {
        /// The offending context.
        context: u64,
    },

    /// One or more records failed to persist during a flush.
    #[error(transparent)]
    Flush(#[from] FlushFailure),

    /// The resource has no sync metadata.
    #[error("not managed: {path}")]
    NotManaged {
        /// The resource path.
        path: String,
    },

    /// Operation not permitted for the given arguments.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a lock protocol violation error.
    pub fn lock_protocol(message: impl Into<String>) -> Self {
        Self::LockProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a not managed error.
    pub fn not_managed(path: impl ToString) -> Self {
        Self::NotManaged {
            path: path.to_string(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the flush aggregate, if this is a flush error.
    pub fn as_flush(&self) -> Option<&FlushFailure> {
        match self {
            CoreError::Flush(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Every record that failed to persist during one flush.
///
/// The rest of the flush went through; the cache state of each failed
/// record was purged so it is reloaded from the store on next access.
#[derive(Debug, Error)]
#[error("{} metadata record(s) failed to flush", .failures.len())]
pub struct FlushFailure {
    /// The failed records and their errors, in flush order.
    pub failures: Vec<(StoreKey, StoreError)>,
}

impl FlushFailure {
    /// Returns the number of failed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Iterates over the failed keys.
    pub fn keys(&self) -> impl Iterator<Item = &StoreKey> {
        self.failures.iter().map(|(key, _)| key)
    }
}
