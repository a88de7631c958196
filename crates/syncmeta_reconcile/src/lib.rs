//! # syncmeta Reconcile
//!
//! Three-way reconciliation of working copy, recorded base and remote.
//!
//! This crate provides:
//! - [`SyncComparator`]: classifies one resource from its local stat, its
//!   recorded base entry and the remote token
//! - [`IgnoreMatcher`]: per-directory ignore patterns, applied to
//!   unversioned resources
//! - [`ReconciliationSet`]: out-of-sync nodes with a membership index and
//!   batched change events
//! - [`SnapshotRemote`] and [`MirrorRemote`]: remote sources for tests and
//!   for offline status
//!
//! ## Architecture
//!
//! Recompute walks a subtree through the comparator, which reads the cache
//! for local and base state and the [`RemoteMetadataSource`] for the remote
//! side. Each resource found out of sync becomes a [`ReconciliationNode`];
//! the set links it into the membership index and reports the shallowest
//! newly indexed directory as an added root.
//!
//! ## Key Invariants
//!
//! - Only out-of-sync resources are stored; absence means in sync
//! - Every indexed directory except the workspace root is a member of its
//!   parent's index entry
//! - One event per outermost input batch, never an empty one
//! - Cancellation keeps the nodes already updated and skips the stale sweep

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod compare;
mod config;
mod error;
mod event;
mod ignore;
mod remote;
mod set;

pub use cancel::CancelFlag;
pub use compare::{ChangeKind, Classification, ReconciliationNode, SyncComparator, SyncDirection};
pub use config::ReconcileConfig;
pub use error::{ReconcileError, ReconcileResult};
pub use event::SetChangeEvent;
pub use ignore::IgnoreMatcher;
pub use remote::{MirrorRemote, RemoteMetadataSource, RemoteToken, SnapshotRemote};
pub use set::{Depth, RecomputeSummary, ReconciliationSet, SetMember};
