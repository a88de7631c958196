//! Error types for reconciliation.

use syncmeta_core::CoreError;
use syncmeta_store::StoreError;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that can occur while classifying or recomputing.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Cache or lock error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Workspace tree or backing store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The remote metadata source failed.
    #[error("remote error: {message}")]
    Remote {
        /// Error message.
        message: String,
    },

    /// `end_input` without a matching `begin_input`.
    #[error("unbalanced input batch")]
    UnbalancedInput,

    /// The recompute was cancelled; nodes visited so far are kept.
    #[error("reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    /// Creates a remote error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Returns true if this error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
