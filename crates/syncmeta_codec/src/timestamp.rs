//! Timestamp field encodings.
//!
//! The timestamp field of an entry line is overloaded: besides a plain date
//! it can carry merge markers written by the client or sent by the server.

use crate::entry::FileKind;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Date format of the timestamp field, e.g. `Thu Jan 01 00:00:00 1970`.
pub const ENTRY_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Written when the timestamp is unknown.
pub const TIMESTAMP_DUMMY: &str = "dummy timestamp";
/// Written for a merged file that has since been saved.
pub const TIMESTAMP_MERGED: &str = "Result of merge";
/// Written for a merged file that still holds conflict markers; followed by the date.
pub const TIMESTAMP_MERGED_WITH_CONFLICT: &str = "Result of merge+";
/// Sent to the server for a merged file that was modified after the merge.
pub const TIMESTAMP_SERVER_MERGED: &str = "+modified";
/// Sent to the server for a merged file left untouched since the merge.
pub const TIMESTAMP_SERVER_MERGED_WITH_CONFLICT: &str = "+=";

/// Formats a date in the entry-line format.
#[must_use]
pub fn format_entry_date(date: &DateTime<Utc>) -> String {
    date.format(ENTRY_DATE_FORMAT).to_string()
}

/// Parses an entry-line date. Single-digit days may be space padded.
#[must_use]
pub fn parse_entry_date(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), ENTRY_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decodes a timestamp field into a timestamp and the file kind it implies.
///
/// Unparseable dates degrade to [`FileKind::Dummy`] instead of failing.
#[must_use]
pub fn decode_timestamp(field: &str) -> (Option<DateTime<Utc>>, FileKind) {
    if field.is_empty() {
        return (None, FileKind::Regular);
    }
    if field == TIMESTAMP_SERVER_MERGED_WITH_CONFLICT {
        return (None, FileKind::MergedWithConflicts);
    }
    if field.contains(TIMESTAMP_SERVER_MERGED) {
        return (None, FileKind::Merged);
    }
    if let Some(idx) = field.find(TIMESTAMP_MERGED_WITH_CONFLICT) {
        let date = &field[idx + TIMESTAMP_MERGED_WITH_CONFLICT.len()..];
        return (parse_entry_date(date), FileKind::MergedWithConflicts);
    }
    if field.contains(TIMESTAMP_MERGED) {
        return (None, FileKind::Merged);
    }
    match parse_entry_date(field) {
        Some(date) => (Some(date), FileKind::Regular),
        None => (None, FileKind::Dummy),
    }
}

/// Encodes the timestamp field written to the local entries record.
#[must_use]
pub fn encode_timestamp(timestamp: Option<&DateTime<Utc>>, kind: FileKind) -> String {
    match kind {
        FileKind::Regular => timestamp
            .map(format_entry_date)
            .unwrap_or_else(|| TIMESTAMP_DUMMY.to_string()),
        FileKind::Dummy => TIMESTAMP_DUMMY.to_string(),
        FileKind::Merged => TIMESTAMP_MERGED.to_string(),
        FileKind::MergedWithConflicts => format!(
            "{}{}",
            TIMESTAMP_MERGED_WITH_CONFLICT,
            timestamp.map(format_entry_date).unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_formats_zero_padded() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(format_entry_date(&epoch), "Thu Jan 01 00:00:00 1970");
        assert_eq!(parse_entry_date("Thu Jan 01 00:00:00 1970"), Some(epoch));
    }

    #[test]
    fn parses_space_padded_day() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(parse_entry_date("Thu Jan  1 00:00:00 1970"), Some(epoch));
    }

    #[test]
    fn decode_variants() {
        assert_eq!(decode_timestamp(""), (None, FileKind::Regular));
        assert_eq!(decode_timestamp("+="), (None, FileKind::MergedWithConflicts));
        assert_eq!(decode_timestamp("+modified"), (None, FileKind::Merged));
        assert_eq!(decode_timestamp("Result of merge"), (None, FileKind::Merged));
        assert_eq!(decode_timestamp("dummy timestamp"), (None, FileKind::Dummy));
        assert_eq!(decode_timestamp("Initial a.c"), (None, FileKind::Dummy));

        let (ts, kind) = decode_timestamp("Result of merge+Thu Jan 01 00:00:00 1970");
        assert_eq!(kind, FileKind::MergedWithConflicts);
        assert_eq!(ts, Some(Utc.timestamp_opt(0, 0).unwrap()));
    }

    #[test]
    fn encode_variants() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(encode_timestamp(None, FileKind::Regular), TIMESTAMP_DUMMY);
        assert_eq!(
            encode_timestamp(Some(&epoch), FileKind::MergedWithConflicts),
            "Result of merge+Thu Jan 01 00:00:00 1970"
        );
        assert_eq!(encode_timestamp(Some(&epoch), FileKind::Merged), "Result of merge");
    }
}
