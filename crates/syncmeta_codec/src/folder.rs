//! Folder sync records.
//!
//! A folder record binds a workspace directory to a repository location:
//!
//! ```text
//! R<root location>
//! P<repository-relative path>
//! G<tag field>        optional
//! S                   optional, marks a static (non-recursive) directory
//! ```

use crate::error::{CodecError, CodecResult};
use crate::tag::Tag;
use serde::{Deserialize, Serialize};

/// Repository binding of a workspace directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSyncEntry {
    name: String,
    root: String,
    repository: String,
    tag: Option<Tag>,
    is_static: bool,
}

impl FolderSyncEntry {
    /// Creates a folder record.
    ///
    /// A repository given as an absolute path below the root's directory is
    /// stored relative to the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root or repository is empty or spans lines.
    pub fn new(name: &str, root: &str, repository: &str) -> CodecResult<Self> {
        if root.is_empty() || root.contains('\n') {
            return Err(CodecError::invalid_field("root", root, "must be a single non-empty line"));
        }
        if repository.is_empty() || repository.contains('\n') {
            return Err(CodecError::invalid_field(
                "repository",
                repository,
                "must be a single non-empty line",
            ));
        }
        let repository = Self::relative_repository(root, repository);
        Ok(Self {
            name: name.to_string(),
            root: root.to_string(),
            repository,
            tag: None,
            is_static: false,
        })
    }

    fn relative_repository(root: &str, repository: &str) -> String {
        let root_dir = root.rsplit(':').next().unwrap_or(root).trim_end_matches('/');
        if !root_dir.is_empty() {
            if let Some(rest) = repository.strip_prefix(root_dir) {
                if let Some(relative) = rest.strip_prefix('/') {
                    if !relative.is_empty() {
                        return relative.to_string();
                    }
                }
            }
        }
        repository.to_string()
    }

    /// Parses the stored record of directory `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedFolderSync`] if the root or repository
    /// line is missing or an unknown line is present.
    pub fn parse(name: &str, bytes: &[u8]) -> CodecResult<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        let mut root = None;
        let mut repository = None;
        let mut tag = None;
        let mut is_static = false;

        for line in text.lines().filter(|l| !l.is_empty()) {
            let mut chars = line.chars();
            let marker = chars.next();
            let value = chars.as_str();
            match marker {
                Some('R') => root = Some(value),
                Some('P') => repository = Some(value),
                Some('G') => tag = Tag::parse(value),
                Some('S') => is_static = true,
                _ => {
                    return Err(CodecError::malformed_folder(format!(
                        "unknown record line {line:?}"
                    )))
                }
            }
        }

        let root = root.ok_or_else(|| CodecError::malformed_folder("missing root line"))?;
        let repository =
            repository.ok_or_else(|| CodecError::malformed_folder("missing repository line"))?;
        if root.is_empty() || repository.is_empty() {
            return Err(CodecError::malformed_folder("empty root or repository"));
        }

        Ok(Self {
            name: name.to_string(),
            root: root.to_string(),
            repository: repository.to_string(),
            tag,
            is_static,
        })
    }

    /// Serializes the record.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("R{}\nP{}\n", self.root, self.repository);
        if let Some(tag) = &self.tag {
            out.push('G');
            out.push_str(&tag.to_field());
            out.push('\n');
        }
        if self.is_static {
            out.push_str("S\n");
        }
        out.into_bytes()
    }

    /// Returns the directory name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the root location.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns the repository path relative to the root.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the full remote location of the directory.
    #[must_use]
    pub fn remote_location(&self) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), self.repository)
    }

    /// Returns the sticky tag.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// Returns true for static (non-recursive) directories.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Returns true if both records point at the same remote location.
    #[must_use]
    pub fn is_same_mapping(&self, other: &FolderSyncEntry) -> bool {
        self.root == other.root && self.repository == other.repository
    }

    /// Returns a copy with a different sticky tag.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidField`] if the tag would break its
    /// record line.
    pub fn with_tag(mut self, tag: Option<Tag>) -> CodecResult<Self> {
        if let Some(tag) = &tag {
            tag.validate()?;
        }
        self.tag = tag;
        Ok(self)
    }

    /// Returns a copy with the static flag set or cleared.
    #[must_use]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Returns the record for a subdirectory `name`: same root, repository
    /// extended by the name, tag and static flag inherited.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            root: self.root.clone(),
            repository: format!("{}/{}", self.repository, name),
            tag: self.tag.clone(),
            is_static: false,
        }
    }
}
