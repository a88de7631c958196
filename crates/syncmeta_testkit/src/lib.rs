//! # syncmeta Testkit
//!
//! Test utilities for syncmeta.
//!
//! This crate provides:
//! - Session fixtures over in-memory or temporary file-backed workspaces
//! - Property-based test generators using proptest
//! - Concurrent batch stress runs for the nested lock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncmeta_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_session() {
//!     with_session(|session| {
//!         session.manage("proj");
//!         session.track("proj/a.c", "1.1", 100);
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
