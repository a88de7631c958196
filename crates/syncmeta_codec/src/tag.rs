//! Sticky tags.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sticky tag pinning a resource or directory to a line of history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// A branch; encoded as `T<name>`.
    Branch(String),
    /// A version (non-branch) tag; encoded as `N<name>`.
    Version(String),
    /// A date; encoded as `D<date>`.
    Date(String),
}

impl Tag {
    /// Parses the tag field of an entry line. An empty field means no tag.
    ///
    /// Fields without a known prefix are read as version tags.
    #[must_use]
    pub fn parse(field: &str) -> Option<Tag> {
        let mut chars = field.chars();
        let prefix = chars.next()?;
        let rest = chars.as_str();
        Some(match prefix {
            'T' => Tag::Branch(rest.to_string()),
            'N' => Tag::Version(rest.to_string()),
            'D' => Tag::Date(rest.to_string()),
            _ => Tag::Version(field.to_string()),
        })
    }

    /// Returns the entry-line encoding.
    #[must_use]
    pub fn to_field(&self) -> String {
        match self {
            Tag::Branch(name) => format!("T{name}"),
            Tag::Version(name) => format!("N{name}"),
            Tag::Date(date) => format!("D{date}"),
        }
    }

    /// Returns the tag name or date text.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Tag::Branch(name) | Tag::Version(name) | Tag::Date(name) => name,
        }
    }

    /// Checks that the tag fits in an entry-line field and on a folder
    /// record line.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidField`] if the name contains `/`, a
    /// carriage return or a newline.
    pub fn validate(&self) -> CodecResult<()> {
        let name = self.name();
        if name.contains(['/', '\n', '\r']) {
            return Err(CodecError::invalid_field(
                "tag",
                name,
                "must not contain '/' or line breaks",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
