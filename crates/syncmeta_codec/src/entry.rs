//! Resource sync entries and the entry-line format.
//!
//! ```text
//! D/name////                                             directory line
//! /name/[-]revision/timestamp/keyword-mode/[tag]         file line
//! /name/permissions                                      permissions line
//! ```

use crate::error::{CodecError, CodecResult};
use crate::tag::Tag;
use crate::timestamp::{
    decode_timestamp, encode_timestamp, TIMESTAMP_SERVER_MERGED,
    TIMESTAMP_SERVER_MERGED_WITH_CONFLICT,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field separator of entry lines.
pub const SEPARATOR: char = '/';
/// Prefix of directory lines.
pub const DIRECTORY_PREFIX: &str = "D/";
/// Prefix marking a revision as deleted.
pub const DELETED_PREFIX: char = '-';
/// Revision of a locally added, never committed file.
pub const ADDED_REVISION: &str = "0";
/// Permissions assumed when none are recorded.
pub const DEFAULT_PERMISSIONS: &str = "u=rw,g=rw,o=r";

/// How the timestamp of a file entry should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// A plain timestamp (or none) captured after an update or commit.
    Regular,
    /// The timestamp is unknown; the file never compares time-equal.
    Dummy,
    /// The file is the result of a merge and was modified afterwards.
    Merged,
    /// The file is the result of a merge that left conflict markers.
    MergedWithConflicts,
}

/// Sync state of a file entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSync {
    /// Base revision; [`ADDED_REVISION`] for local additions.
    pub revision: String,
    /// The file is scheduled for removal.
    pub deleted: bool,
    /// Modification time captured when the entry was written.
    pub timestamp: Option<DateTime<Utc>>,
    /// Interpretation of the timestamp.
    pub kind: FileKind,
}

/// Files carry revision state; directories carry nothing beyond their name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncKind {
    /// A file line.
    File(FileSync),
    /// A directory line.
    Directory,
}

/// Sync metadata of one tracked resource, as recorded in its parent's entries.
///
/// Entries are values: holders never mutate them in place, they build a new
/// entry with the `with_*` methods and store it through the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSyncEntry {
    name: String,
    kind: SyncKind,
    keyword_mode: String,
    tag: Option<Tag>,
    permissions: Option<String>,
}

fn validate_name(name: &str) -> CodecResult<()> {
    if name.is_empty() {
        return Err(CodecError::invalid_field("name", name, "must not be empty"));
    }
    if is_dot_segment(name) {
        return Err(CodecError::invalid_field("name", name, "must not be '.' or '..'"));
    }
    if name.contains(SEPARATOR) || name.contains(['\n', '\r']) {
        return Err(CodecError::invalid_field(
            "name",
            name,
            "must not contain '/' or line breaks",
        ));
    }
    Ok(())
}

fn is_dot_segment(name: &str) -> bool {
    name == "." || name == ".."
}

fn validate_keyword_mode(keyword_mode: &str) -> CodecResult<()> {
    if keyword_mode.contains(SEPARATOR) || keyword_mode.contains(['\n', '\r']) {
        return Err(CodecError::invalid_field(
            "keyword_mode",
            keyword_mode,
            "must not contain '/' or line breaks",
        ));
    }
    Ok(())
}

fn validate_tag(tag: Option<&Tag>) -> CodecResult<()> {
    tag.map_or(Ok(()), Tag::validate)
}

fn validate_revision(revision: &str) -> CodecResult<()> {
    if revision.is_empty() {
        return Err(CodecError::invalid_field("revision", revision, "must not be empty"));
    }
    if revision.starts_with(DELETED_PREFIX) || revision.contains(SEPARATOR) {
        return Err(CodecError::invalid_field(
            "revision",
            revision,
            "must not start with '-' or contain '/'",
        ));
    }
    Ok(())
}

impl ResourceSyncEntry {
    /// Creates a file entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the name, revision, keyword mode or tag cannot be
    /// encoded.
    pub fn file(
        name: &str,
        revision: &str,
        timestamp: Option<DateTime<Utc>>,
        keyword_mode: &str,
        tag: Option<Tag>,
    ) -> CodecResult<Self> {
        validate_name(name)?;
        validate_revision(revision)?;
        validate_keyword_mode(keyword_mode)?;
        validate_tag(tag.as_ref())?;
        Ok(Self {
            name: name.to_string(),
            kind: SyncKind::File(FileSync {
                revision: revision.to_string(),
                deleted: false,
                timestamp,
                kind: FileKind::Regular,
            }),
            keyword_mode: keyword_mode.to_string(),
            tag,
            permissions: None,
        })
    }

    /// Creates the entry of a locally added file.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or keyword mode cannot be encoded.
    pub fn added(name: &str, keyword_mode: &str) -> CodecResult<Self> {
        Ok(Self::file(name, ADDED_REVISION, None, keyword_mode, None)?.with_file_kind(FileKind::Dummy))
    }

    /// Creates a directory entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot be encoded.
    pub fn directory(name: &str) -> CodecResult<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            kind: SyncKind::Directory,
            keyword_mode: String::new(),
            tag: None,
            permissions: None,
        })
    }

    /// Parses an entry line.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEntryLine`] if the line has the wrong
    /// number of fields, an empty or dot-segment name, or an empty revision.
    /// A directory line must be exactly `D/name////`.
    pub fn parse(line: &str) -> CodecResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix(DIRECTORY_PREFIX) {
            let (name, tail) = rest.split_once(SEPARATOR).unwrap_or((rest, ""));
            if name.is_empty() {
                return Err(CodecError::malformed_line(line, "empty directory name"));
            }
            if is_dot_segment(name) {
                return Err(CodecError::malformed_line(line, "dot-segment directory name"));
            }
            if tail != "///" {
                return Err(CodecError::malformed_line(
                    line,
                    "directory line must end with four empty fields",
                ));
            }
            return Ok(Self {
                name: name.to_string(),
                kind: SyncKind::Directory,
                keyword_mode: String::new(),
                tag: None,
                permissions: None,
            });
        }

        let Some(rest) = line.strip_prefix(SEPARATOR) else {
            return Err(CodecError::malformed_line(line, "missing leading '/'"));
        };
        let fields: Vec<&str> = rest.split(SEPARATOR).collect();
        if fields.len() != 5 {
            return Err(CodecError::malformed_line(
                line,
                format!("expected 5 fields, found {}", fields.len()),
            ));
        }

        let name = fields[0];
        if name.is_empty() {
            return Err(CodecError::malformed_line(line, "empty name"));
        }
        if is_dot_segment(name) {
            return Err(CodecError::malformed_line(line, "dot-segment name"));
        }

        let (deleted, revision) = match fields[1].strip_prefix(DELETED_PREFIX) {
            Some(revision) => (true, revision),
            None => (false, fields[1]),
        };
        if revision.is_empty() {
            return Err(CodecError::malformed_line(line, "empty revision"));
        }

        let (timestamp, kind) = decode_timestamp(fields[2]);

        Ok(Self {
            name: name.to_string(),
            kind: SyncKind::File(FileSync {
                revision: revision.to_string(),
                deleted,
                timestamp,
                kind,
            }),
            keyword_mode: fields[3].to_string(),
            tag: Tag::parse(fields[4]),
            permissions: None,
        })
    }

    /// Serializes the entry line.
    ///
    /// With `include_timestamp = false` the timestamp field is left empty,
    /// which is the exact line sent to the remote.
    #[must_use]
    pub fn to_entry_line(&self, include_timestamp: bool) -> String {
        match &self.kind {
            SyncKind::Directory => format!("{DIRECTORY_PREFIX}{}////", self.name),
            SyncKind::File(file) => {
                let timestamp = if include_timestamp {
                    encode_timestamp(file.timestamp.as_ref(), file.kind)
                } else {
                    String::new()
                };
                self.file_line(file, &timestamp)
            }
        }
    }

    /// Serializes the line sent to the server for a file whose current
    /// on-disk modification time is `current_mtime`.
    ///
    /// Merged files report `+=` while they still hold untouched conflict
    /// markers and `+modified` otherwise; everything else omits the timestamp.
    #[must_use]
    pub fn to_server_entry_line(&self, current_mtime: Option<DateTime<Utc>>) -> String {
        match (&self.kind, current_mtime) {
            (SyncKind::File(file), Some(mtime)) if self.is_merged() => {
                let marker = if self.needs_merge(mtime) {
                    TIMESTAMP_SERVER_MERGED_WITH_CONFLICT
                } else {
                    TIMESTAMP_SERVER_MERGED
                };
                self.file_line(file, marker)
            }
            _ => self.to_entry_line(false),
        }
    }

    fn file_line(&self, file: &FileSync, timestamp: &str) -> String {
        let deleted = if file.deleted { "-" } else { "" };
        let tag = self.tag.as_ref().map(Tag::to_field).unwrap_or_default();
        format!(
            "/{}/{}{}/{}/{}/{}",
            self.name, deleted, file.revision, timestamp, self.keyword_mode, tag
        )
    }

    /// Serializes the permissions line, using the default when unset.
    #[must_use]
    pub fn to_permissions_line(&self) -> String {
        format!("/{}/{}", self.name, self.permissions())
    }

    /// Parses a permissions line into `(name, permissions)`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedPermissions`] unless the line is
    /// `/name/permissions` with a non-empty name.
    pub fn parse_permissions_line(line: &str) -> CodecResult<(String, String)> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(rest) = line.strip_prefix(SEPARATOR) else {
            return Err(CodecError::malformed_permissions(line, "missing leading '/'"));
        };
        let Some((name, permissions)) = rest.split_once(SEPARATOR) else {
            return Err(CodecError::malformed_permissions(line, "missing separator"));
        };
        if name.is_empty() {
            return Err(CodecError::malformed_permissions(line, "empty name"));
        }
        Ok((name.to_string(), permissions.to_string()))
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sync kind.
    #[must_use]
    pub fn kind(&self) -> &SyncKind {
        &self.kind
    }

    /// Returns the file state, or `None` for directories.
    #[must_use]
    pub fn file_sync(&self) -> Option<&FileSync> {
        match &self.kind {
            SyncKind::File(file) => Some(file),
            SyncKind::Directory => None,
        }
    }

    /// Returns the revision without the deletion prefix.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.file_sync().map(|f| f.revision.as_str())
    }

    /// Returns the recorded timestamp.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.file_sync().and_then(|f| f.timestamp)
    }

    /// Returns the file kind.
    #[must_use]
    pub fn file_kind(&self) -> Option<FileKind> {
        self.file_sync().map(|f| f.kind)
    }

    /// Returns the keyword substitution mode.
    #[must_use]
    pub fn keyword_mode(&self) -> &str {
        &self.keyword_mode
    }

    /// Returns the sticky tag.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// Returns the permissions, falling back to [`DEFAULT_PERMISSIONS`].
    #[must_use]
    pub fn permissions(&self) -> &str {
        self.permissions.as_deref().unwrap_or(DEFAULT_PERMISSIONS)
    }

    /// Returns the permissions only if explicitly recorded.
    #[must_use]
    pub fn explicit_permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    /// Returns true for directory entries.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, SyncKind::Directory)
    }

    /// Returns true if the file is scheduled for removal.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.file_sync().is_some_and(|f| f.deleted)
    }

    /// Returns true for local additions. Deleted entries are never added.
    #[must_use]
    pub fn is_added(&self) -> bool {
        self.file_sync()
            .is_some_and(|f| !f.deleted && f.revision == ADDED_REVISION)
    }

    /// Returns true for either merge state.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        matches!(
            self.file_kind(),
            Some(FileKind::Merged | FileKind::MergedWithConflicts)
        )
    }

    /// Returns true if the file still holds the conflict markers of a merge,
    /// i.e. it is merged-with-conflicts and untouched since.
    #[must_use]
    pub fn needs_merge(&self, current_mtime: DateTime<Utc>) -> bool {
        self.file_kind() == Some(FileKind::MergedWithConflicts)
            && self.timestamp() == Some(current_mtime)
    }

    /// Returns a copy with the deletion flag set or cleared.
    ///
    /// Directory entries are returned unchanged.
    #[must_use]
    pub fn with_deleted(mut self, deleted: bool) -> Self {
        if let SyncKind::File(file) = &mut self.kind {
            file.deleted = deleted;
        }
        self
    }

    /// Returns a copy at a new revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the revision cannot be encoded.
    pub fn with_revision(mut self, revision: &str) -> CodecResult<Self> {
        validate_revision(revision)?;
        if let SyncKind::File(file) = &mut self.kind {
            file.revision = revision.to_string();
        }
        Ok(self)
    }

    /// Returns a copy with a fresh timestamp; clears any merge state.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        if let SyncKind::File(file) = &mut self.kind {
            file.timestamp = timestamp;
            file.kind = FileKind::Regular;
        }
        self
    }

    /// Returns a copy with a different file kind.
    #[must_use]
    pub fn with_file_kind(mut self, kind: FileKind) -> Self {
        if let SyncKind::File(file) = &mut self.kind {
            file.kind = kind;
        }
        self
    }

    /// Returns a copy with a different sticky tag.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidField`] if the tag cannot be encoded.
    pub fn with_tag(mut self, tag: Option<Tag>) -> CodecResult<Self> {
        validate_tag(tag.as_ref())?;
        self.tag = tag;
        Ok(self)
    }

    /// Returns a copy with a different keyword mode.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidField`] if the mode contains `/` or a
    /// line break.
    pub fn with_keyword_mode(mut self, keyword_mode: &str) -> CodecResult<Self> {
        validate_keyword_mode(keyword_mode)?;
        self.keyword_mode = keyword_mode.to_string();
        Ok(self)
    }

    /// Returns a copy with explicit permissions (or none).
    #[must_use]
    pub fn with_permissions(mut self, permissions: Option<&str>) -> Self {
        self.permissions = permissions.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(0, 0).unwrap()
    }

    #[test]
    fn parse_regular_file_line() {
        let entry = ResourceSyncEntry::parse("/foo.txt/1.3/Thu Jan 01 00:00:00 1970/-kb/").unwrap();
        assert_eq!(entry.name(), "foo.txt");
        assert_eq!(entry.revision(), Some("1.3"));
        assert!(!entry.is_deleted());
        assert_eq!(entry.keyword_mode(), "-kb");
        assert_eq!(entry.tag(), None);
        assert_eq!(entry.file_kind(), Some(FileKind::Regular));
        assert_eq!(entry.timestamp(), Some(epoch()));
        assert_eq!(entry.to_entry_line(false), "/foo.txt/1.3//-kb/");
    }

    #[test]
    fn parse_deleted_revision() {
        let entry = ResourceSyncEntry::parse("/bar.txt/-1.2/dummy timestamp//").unwrap();
        assert_eq!(entry.revision(), Some("1.2"));
        assert!(entry.is_deleted());
        assert!(!entry.is_added());
        assert_eq!(entry.to_entry_line(false), "/bar.txt/-1.2///");
    }

    #[test]
    fn deleted_added_revision_is_not_added() {
        let entry = ResourceSyncEntry::parse("/x/-0///").unwrap();
        assert!(entry.is_deleted());
        assert!(!entry.is_added());
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let err = ResourceSyncEntry::parse("/onlyname/").unwrap_err();
        assert!(matches!(err, CodecError::MalformedEntryLine { .. }));
        assert!(ResourceSyncEntry::parse("/a/1.1/ts/-kb/T/extra").is_err());
    }

    #[test]
    fn empty_name_or_revision_is_malformed() {
        assert!(matches!(
            ResourceSyncEntry::parse("//1.1///"),
            Err(CodecError::MalformedEntryLine { .. })
        ));
        assert!(matches!(
            ResourceSyncEntry::parse("/a////"),
            Err(CodecError::MalformedEntryLine { .. })
        ));
        assert!(matches!(
            ResourceSyncEntry::parse("/a/-///"),
            Err(CodecError::MalformedEntryLine { .. })
        ));
    }

    #[test]
    fn missing_leading_separator_is_malformed() {
        assert!(ResourceSyncEntry::parse("a/1.1///").is_err());
        assert!(ResourceSyncEntry::parse("").is_err());
    }

    #[test]
    fn directory_lines() {
        let entry = ResourceSyncEntry::parse("D/src////").unwrap();
        assert!(entry.is_directory());
        assert_eq!(entry.name(), "src");
        assert_eq!(entry.to_entry_line(true), "D/src////");
        assert!(ResourceSyncEntry::parse("D/////").is_err());
    }

    #[test]
    fn directory_line_tail_must_be_empty_fields() {
        for line in ["D/src/junk", "D/src", "D/src///", "D/src/////", "D/src/1.1///"] {
            assert!(
                matches!(
                    ResourceSyncEntry::parse(line),
                    Err(CodecError::MalformedEntryLine { .. })
                ),
                "{line}"
            );
        }
    }

    #[test]
    fn dot_segment_names_are_refused() {
        assert!(ResourceSyncEntry::file("..", "1.1", None, "", None).is_err());
        assert!(ResourceSyncEntry::file(".", "1.1", None, "", None).is_err());
        assert!(ResourceSyncEntry::directory("..").is_err());
        assert!(ResourceSyncEntry::file(".cvsignore", "1.1", None, "", None).is_ok());
        assert!(ResourceSyncEntry::parse("/../1.1///").is_err());
        assert!(ResourceSyncEntry::parse("D/..////").is_err());
        assert!(ResourceSyncEntry::parse("D/.////").is_err());
    }

    #[test]
    fn keyword_mode_and_tag_must_fit_the_line() {
        assert!(ResourceSyncEntry::file("a", "1.1", None, "-kb\n/x/1.1///", None).is_err());
        assert!(ResourceSyncEntry::file("a", "1.1", None, "-k/b", None).is_err());
        assert!(ResourceSyncEntry::file("a", "1.1", None, "", Some(Tag::Branch("x/y".into()))).is_err());
        assert!(
            ResourceSyncEntry::file("a", "1.1", None, "", Some(Tag::Version("v\nD/evil////".into())))
                .is_err()
        );

        let entry = ResourceSyncEntry::file("a", "1.1", None, "-kb", None).unwrap();
        assert!(entry.clone().with_tag(Some(Tag::Branch("a/b".into()))).is_err());
        assert!(entry.clone().with_keyword_mode("-kb\n").is_err());
        let entry = entry
            .with_tag(Some(Tag::Branch("dev".into())))
            .unwrap()
            .with_keyword_mode("-ko")
            .unwrap();
        assert_eq!(entry.to_entry_line(false), "/a/1.1//-ko/Tdev");
    }

    #[test]
    fn unparseable_date_degrades_to_dummy() {
        let entry = ResourceSyncEntry::parse("/a.c/1.1/not a date//").unwrap();
        assert_eq!(entry.file_kind(), Some(FileKind::Dummy));
        assert_eq!(entry.timestamp(), None);
    }

    #[test]
    fn merge_markers() {
        let merged = ResourceSyncEntry::parse("/a.c/1.4/Result of merge//").unwrap();
        assert_eq!(merged.file_kind(), Some(FileKind::Merged));

        let conflicted =
            ResourceSyncEntry::parse("/a.c/1.4/Result of merge+Thu Jan 01 00:00:00 1970//").unwrap();
        assert_eq!(conflicted.file_kind(), Some(FileKind::MergedWithConflicts));
        assert_eq!(conflicted.timestamp(), Some(epoch()));
        assert_eq!(
            conflicted.to_entry_line(true),
            "/a.c/1.4/Result of merge+Thu Jan 01 00:00:00 1970//"
        );

        let server = ResourceSyncEntry::parse("/a.c/1.4/+=//").unwrap();
        assert_eq!(server.file_kind(), Some(FileKind::MergedWithConflicts));
        let server = ResourceSyncEntry::parse("/a.c/1.4/+modified//").unwrap();
        assert_eq!(server.file_kind(), Some(FileKind::Merged));
    }

    #[test]
    fn server_line_compares_mtime() {
        let conflicted =
            ResourceSyncEntry::parse("/a.c/1.4/Result of merge+Thu Jan 01 00:00:00 1970/-kkv/").unwrap();
        assert_eq!(
            conflicted.to_server_entry_line(Some(epoch())),
            "/a.c/1.4/+=/-kkv/"
        );
        let later = Utc.timestamp_opt(60, 0).unwrap();
        assert_eq!(
            conflicted.to_server_entry_line(Some(later)),
            "/a.c/1.4/+modified/-kkv/"
        );
        assert_eq!(conflicted.to_server_entry_line(None), "/a.c/1.4//-kkv/");

        let regular = ResourceSyncEntry::file("b.c", "1.1", Some(epoch()), "", None).unwrap();
        assert_eq!(regular.to_server_entry_line(Some(epoch())), "/b.c/1.1///");
    }

    #[test]
    fn tag_round_trip() {
        let entry = ResourceSyncEntry::parse("/a.c/1.2.2.1/dummy timestamp/-kkv/Tdev").unwrap();
        assert_eq!(entry.tag(), Some(&Tag::Branch("dev".into())));
        assert_eq!(entry.to_entry_line(false), "/a.c/1.2.2.1//-kkv/Tdev");
    }

    #[test]
    fn added_entry() {
        let entry = ResourceSyncEntry::added("new.c", "-kb").unwrap();
        assert!(entry.is_added());
        assert_eq!(entry.to_entry_line(true), "/new.c/0/dummy timestamp/-kb/");
    }

    #[test]
    fn constructor_validation() {
        assert!(ResourceSyncEntry::file("", "1.1", None, "", None).is_err());
        assert!(ResourceSyncEntry::file("a/b", "1.1", None, "", None).is_err());
        assert!(ResourceSyncEntry::file("a", "", None, "", None).is_err());
        assert!(ResourceSyncEntry::file("a", "-1.1", None, "", None).is_err());
        assert!(ResourceSyncEntry::directory("").is_err());
    }

    #[test]
    fn permissions_lines() {
        let entry = ResourceSyncEntry::file("a.sh", "1.1", None, "", None).unwrap();
        assert_eq!(entry.to_permissions_line(), "/a.sh/u=rw,g=rw,o=r");
        let entry = entry.with_permissions(Some("u=rwx,g=rx,o=rx"));
        assert_eq!(entry.to_permissions_line(), "/a.sh/u=rwx,g=rx,o=rx");
        assert_eq!(
            ResourceSyncEntry::parse_permissions_line("/a.sh/u=rwx").unwrap(),
            ("a.sh".to_string(), "u=rwx".to_string())
        );
        assert!(ResourceSyncEntry::parse_permissions_line("/a.sh").is_err());
        assert!(ResourceSyncEntry::parse_permissions_line("//x").is_err());
    }

    #[test]
    fn with_timestamp_clears_merge_state() {
        let entry = ResourceSyncEntry::parse("/a.c/1.4/Result of merge//").unwrap();
        let entry = entry.with_timestamp(Some(epoch()));
        assert_eq!(entry.file_kind(), Some(FileKind::Regular));
        assert_eq!(entry.timestamp(), Some(epoch()));
    }
}
