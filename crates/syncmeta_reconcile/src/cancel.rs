//! Cooperative cancellation.

use crate::error::{ReconcileError, ReconcileResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag checked between resources.
///
/// Clones share the same flag, so a handle can be moved to another thread
/// and cancelled while a recompute is running.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Cancelled` if cancellation was requested.
    pub fn check(&self) -> ReconcileResult<()> {
        if self.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(flag.check().is_ok());

        handle.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(ReconcileError::Cancelled)));

        flag.reset();
        assert!(!handle.is_cancelled());
    }
}
