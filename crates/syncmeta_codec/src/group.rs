//! Codecs for whole-directory records: entries, permissions, ignore patterns.

use crate::entry::ResourceSyncEntry;
use crate::error::{CodecError, CodecResult};

/// Result of leniently parsing an entries record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEntries {
    /// Entries that parsed successfully, in record order.
    pub entries: Vec<ResourceSyncEntry>,
    /// One error per line that did not parse.
    pub malformed: Vec<CodecError>,
}

fn as_text(bytes: &[u8]) -> CodecResult<&str> {
    std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Lines worth parsing: non-empty and not the bare `D` listing marker.
fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty() && *l != "D")
}

/// Parses an entries record, failing on the first malformed line.
///
/// # Errors
///
/// Returns the first line's error, or [`CodecError::InvalidUtf8`].
pub fn parse_entries(bytes: &[u8]) -> CodecResult<Vec<ResourceSyncEntry>> {
    content_lines(as_text(bytes)?)
        .map(ResourceSyncEntry::parse)
        .collect()
}

/// Parses an entries record, collecting malformed lines instead of failing.
///
/// A malformed line only costs its own resource its sync state.
///
/// # Errors
///
/// Returns [`CodecError::InvalidUtf8`] if the record is not text.
pub fn parse_entries_lenient(bytes: &[u8]) -> CodecResult<ParsedEntries> {
    let mut parsed = ParsedEntries::default();
    for line in content_lines(as_text(bytes)?) {
        match ResourceSyncEntry::parse(line) {
            Ok(entry) => parsed.entries.push(entry),
            Err(e) => parsed.malformed.push(e),
        }
    }
    Ok(parsed)
}

/// Serializes entries, one line each, timestamps included.
#[must_use]
pub fn serialize_entries<'a>(entries: impl IntoIterator<Item = &'a ResourceSyncEntry>) -> Vec<u8> {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_entry_line(true));
        out.push('\n');
    }
    out.into_bytes()
}

/// Parses a permissions record into `(name, permissions)` pairs.
///
/// # Errors
///
/// Returns the first malformed line's error, or [`CodecError::InvalidUtf8`].
pub fn parse_permissions(bytes: &[u8]) -> CodecResult<Vec<(String, String)>> {
    content_lines(as_text(bytes)?)
        .map(ResourceSyncEntry::parse_permissions_line)
        .collect()
}

/// Serializes the permission lines of entries with explicit permissions.
///
/// Returns an empty record when no entry overrides the default.
#[must_use]
pub fn serialize_permissions<'a>(
    entries: impl IntoIterator<Item = &'a ResourceSyncEntry>,
) -> Vec<u8> {
    let mut out = String::new();
    for entry in entries.into_iter().filter(|e| e.explicit_permissions().is_some()) {
        out.push_str(&entry.to_permissions_line());
        out.push('\n');
    }
    out.into_bytes()
}

/// Parses an ignore-patterns record: one pattern per line, blanks skipped.
///
/// # Errors
///
/// Returns [`CodecError::InvalidUtf8`] if the record is not text.
pub fn parse_ignore_patterns(bytes: &[u8]) -> CodecResult<Vec<String>> {
    Ok(as_text(bytes)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Serializes ignore patterns, one per line.
#[must_use]
pub fn serialize_ignore_patterns(patterns: &[String]) -> Vec<u8> {
    let mut out = String::new();
    for pattern in patterns {
        out.push_str(pattern);
        out.push('\n');
    }
    out.into_bytes()
}
