//! Change feed for observing flushed metadata.
//!
//! Every flush that persisted at least one record emits exactly one
//! [`MetadataChangeEvent`] listing all affected resource paths. Folder
//! records are reported under their directory path alongside resource
//! paths, so listeners see one flat list.
//!
//! # Usage
//!
//! ```rust,ignore
//! let rx = synchronizer.subscribe();
//! std::thread::spawn(move || {
//!     while let Ok(event) = rx.recv() {
//!         println!("sync state changed: {:?}", event.paths);
//!     }
//! });
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use syncmeta_store::WorkspacePath;

/// One flush's worth of changed paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataChangeEvent {
    /// Monotonic sequence number, starting at 1.
    pub sequence: u64,
    /// Affected paths, sorted and deduplicated.
    pub paths: Vec<WorkspacePath>,
}

impl MetadataChangeEvent {
    /// Returns true if `path` is listed.
    #[must_use]
    pub fn affects(&self, path: &WorkspacePath) -> bool {
        self.paths.binary_search(path).is_ok()
    }
}

/// Distributes metadata change events to subscribers.
///
/// Thread-safe; events keep flush order and are also kept in a bounded
/// history for catch-up polling.
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<MetadataChangeEvent>>>,
    history: RwLock<Vec<MetadataChangeEvent>>,
    max_history: usize,
    next_sequence: AtomicU64,
}

impl ChangeFeed {
    /// Creates a change feed with the default history limit.
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a change feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> Receiver<MetadataChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publishes one event for `paths` and returns its sequence number.
    ///
    /// Returns `None` without publishing when `paths` is empty.
    pub fn publish(&self, mut paths: Vec<WorkspacePath>) -> Option<u64> {
        if paths.is_empty() {
            return None;
        }
        paths.sort();
        paths.dedup();
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let event = MetadataChangeEvent { sequence, paths };

        {
            let mut history = self.history.write();
            history.push(event.clone());
            if history.len() > self.max_history {
                let to_remove = history.len() - self.max_history;
                history.drain(0..to_remove);
            }
        }

        // Disconnected subscribers are dropped here.
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        Some(sequence)
    }

    /// Returns events with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<MetadataChangeEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest published sequence number, 0 if none.
    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst) - 1
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
