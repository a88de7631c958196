//! # syncmeta store
//!
//! Backing store and workspace tree contracts for syncmeta.
//!
//! This crate provides the lowest-level abstractions the metadata cache
//! consumes. Stores are **opaque blob stores** keyed by a workspace path and a
//! metadata kind - they do not interpret the bytes they hold. The workspace
//! tree is the read-only view of the working copy (children and file stats).
//!
//! ## Design Principles
//!
//! - Stores only read, write (atomic replace) and delete whole records
//! - No knowledge of the entry-line format; the codec owns interpretation
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Implementations
//!
//! - [`InMemoryStore`] / [`InMemoryTree`] - For testing and ephemeral sessions
//! - [`FileStore`] / [`FsTree`] - Metadata directories on the local file system
//!
//! ## Example
//!
//! ```rust
//! use syncmeta_store::{InMemoryStore, MetadataKind, MetadataStore, StoreKey, WorkspacePath};
//!
//! let store = InMemoryStore::new();
//! let key = StoreKey::new(WorkspacePath::new("proj/src"), MetadataKind::ResourceSyncGroup);
//! store.write(&key, b"/main.rs/1.1//-kb/\n").unwrap();
//! assert_eq!(store.read(&key).unwrap().as_deref(), Some(&b"/main.rs/1.1//-kb/\n"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod fs_tree;
mod memory;
mod path;
mod store;
mod tree;

pub use error::{StoreError, StoreResult};
pub use file::{FileStore, DEFAULT_META_DIR};
pub use fs_tree::FsTree;
pub use memory::{InMemoryStore, InMemoryTree};
pub use path::WorkspacePath;
pub use store::{MetadataKind, MetadataStore, StoreKey};
pub use tree::{ResourceKind, ResourceStat, WorkspaceTree};
