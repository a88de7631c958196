//! Cache statistics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache counters.
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Store reads performed to populate the cache.
    loads: AtomicU64,
    /// Reads answered from memory.
    hits: AtomicU64,
    /// Outermost batches that flushed at least one record.
    flushes: AtomicU64,
    /// Records written by flushes.
    records_written: AtomicU64,
    /// Records deleted by flushes.
    records_deleted: AtomicU64,
    /// Records that failed to persist.
    flush_failures: AtomicU64,
    /// Entry or permission lines skipped while loading.
    malformed_lines: AtomicU64,
}

impl CacheStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self, lines: u64) {
        self.malformed_lines.fetch_add(lines, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            loads: self.loads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Store reads performed to populate the cache.
    pub loads: u64,
    /// Reads answered from memory.
    pub hits: u64,
    /// Outermost batches that flushed at least one record.
    pub flushes: u64,
    /// Records written by flushes.
    pub records_written: u64,
    /// Records deleted by flushes.
    pub records_deleted: u64,
    /// Records that failed to persist.
    pub flush_failures: u64,
    /// Entry or permission lines skipped while loading.
    pub malformed_lines: u64,
}
