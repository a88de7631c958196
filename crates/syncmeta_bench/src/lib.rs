//! Benchmark utilities.

use chrono::{DateTime, TimeZone, Utc};
use syncmeta_codec::{serialize_entries, ResourceSyncEntry, Tag};

/// Deterministic modification time for the `i`-th generated entry.
pub fn entry_time(i: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + i as i64 * 37, 0)
        .single()
        .unwrap_or_default()
}

/// Generate a group of file entries with a mix of tags, keyword modes and
/// directory lines.
pub fn generate_entries(count: usize) -> Vec<ResourceSyncEntry> {
    (0..count)
        .filter_map(|i| {
            if i % 10 == 9 {
                return ResourceSyncEntry::directory(&format!("dir{i}")).ok();
            }
            let mode = if i % 4 == 0 { "-kb" } else { "" };
            let tag = (i % 3 == 0).then(|| Tag::Branch("release-1".to_string()));
            ResourceSyncEntry::file(
                &format!("file{i}.c"),
                &format!("1.{}", i % 97 + 1),
                Some(entry_time(i)),
                mode,
                tag,
            )
            .ok()
        })
        .collect()
}

/// Generate the bytes of an entries record holding `count` lines.
pub fn generate_entries_record(count: usize) -> Vec<u8> {
    serialize_entries(&generate_entries(count))
}
