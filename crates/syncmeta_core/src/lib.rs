//! # syncmeta Core
//!
//! Write-back sync metadata cache, nested lock and synchronizer session.
//!
//! This crate provides:
//! - [`SyncMetadataCache`]: lazily loaded, batch-flushed metadata with
//!   partial-failure recovery
//! - [`NestedLock`]: reentrant per-context exclusive lock with
//!   container-granular rules
//! - [`Synchronizer`]: an explicitly constructed session tying the two
//!   together, with self-wrapping mutations and RAII batch guards
//! - [`ChangeFeed`]: one [`MetadataChangeEvent`] per flush
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use syncmeta_codec::{FolderSyncEntry, ResourceSyncEntry};
//! use syncmeta_core::{Config, Synchronizer};
//! use syncmeta_store::{InMemoryStore, InMemoryTree, WorkspacePath};
//!
//! let sync = Synchronizer::new(
//!     Config::default(),
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(InMemoryTree::new()),
//! );
//! let ctx = sync.context();
//! let dir = WorkspacePath::new("proj");
//!
//! let batch = sync.begin(ctx, &dir).unwrap();
//! let folder = FolderSyncEntry::new("proj", ":local:/repo", "proj").unwrap();
//! sync.set_folder_sync(ctx, &dir, Some(folder)).unwrap();
//! let entry = ResourceSyncEntry::file("a.c", "1.1", None, "", None).unwrap();
//! sync.set_resource_sync(ctx, &dir.join("a.c"), Some(entry)).unwrap();
//! batch.finish().unwrap();
//!
//! assert!(sync.get_resource_sync(&dir.join("a.c")).unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod change_feed;
mod config;
mod error;
mod lock;
mod stats;
mod synchronizer;

pub use cache::SyncMetadataCache;
pub use change_feed::{ChangeFeed, MetadataChangeEvent};
pub use config::Config;
pub use error::{CoreError, CoreResult, FlushFailure};
pub use lock::{ContextId, LockRule, NestedLock};
pub use stats::{CacheStats, StatsSnapshot};
pub use synchronizer::{BatchGuard, Synchronizer};
