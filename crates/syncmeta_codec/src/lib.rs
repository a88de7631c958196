//! # syncmeta Codec
//!
//! Entry-line metadata model and codec.
//!
//! Every tracked directory stores three small text records:
//! - an entries record, one line per tracked child (file or directory)
//! - an optional permissions record, one line per child with explicit permissions
//! - a folder record binding the directory to a repository location
//!
//! The formats are line oriented and bit exact; the line sent to the remote
//! is the stored line with its timestamp field emptied.
//!
//! ## Usage
//!
//! ```
//! use syncmeta_codec::ResourceSyncEntry;
//!
//! let entry = ResourceSyncEntry::parse("/foo.txt/1.3/Thu Jan 01 00:00:00 1970/-kb/").unwrap();
//! assert_eq!(entry.revision(), Some("1.3"));
//! assert_eq!(entry.to_entry_line(false), "/foo.txt/1.3//-kb/");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod error;
mod folder;
mod group;
mod tag;
mod timestamp;

pub use entry::{
    FileKind, FileSync, ResourceSyncEntry, SyncKind, ADDED_REVISION, DEFAULT_PERMISSIONS,
    DELETED_PREFIX, DIRECTORY_PREFIX, SEPARATOR,
};
pub use error::{CodecError, CodecResult};
pub use folder::FolderSyncEntry;
pub use group::{
    parse_entries, parse_entries_lenient, parse_ignore_patterns, parse_permissions,
    serialize_entries, serialize_ignore_patterns, serialize_permissions, ParsedEntries,
};
pub use tag::Tag;
pub use timestamp::{
    decode_timestamp, encode_timestamp, format_entry_date, parse_entry_date, ENTRY_DATE_FORMAT,
    TIMESTAMP_DUMMY, TIMESTAMP_MERGED, TIMESTAMP_MERGED_WITH_CONFLICT, TIMESTAMP_SERVER_MERGED,
    TIMESTAMP_SERVER_MERGED_WITH_CONFLICT,
};
