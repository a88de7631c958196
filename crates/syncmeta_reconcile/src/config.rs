//! Reconciliation configuration.

/// Configuration for a reconciliation set and its comparator.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Whether conflicts where both sides reached the same state are dropped.
    ///
    /// Covers files deleted on both sides and directories whose existence
    /// agrees on both sides.
    pub detect_pseudo_conflicts: bool,

    /// Number of set change events kept for polling.
    pub event_history: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            detect_pseudo_conflicts: true,
            event_history: 256,
        }
    }
}

impl ReconcileConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets pseudo-conflict detection.
    #[must_use]
    pub const fn detect_pseudo_conflicts(mut self, value: bool) -> Self {
        self.detect_pseudo_conflicts = value;
        self
    }

    /// Sets the event history size.
    #[must_use]
    pub const fn event_history(mut self, events: usize) -> Self {
        self.event_history = events;
        self
    }
}
