//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while parsing or building metadata records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An entry line does not follow the entry-line grammar.
    #[error("malformed entry line {line:?}: {reason}")]
    MalformedEntryLine {
        /// The offending line.
        line: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A permissions line does not follow `/name/permissions`.
    #[error("malformed permissions line {line:?}: {reason}")]
    MalformedPermissions {
        /// The offending line.
        line: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A folder sync record is missing fields or has unknown ones.
    #[error("malformed folder sync record: {reason}")]
    MalformedFolderSync {
        /// What is wrong with the record.
        reason: String,
    },

    /// A name, revision or other field cannot be represented in an entry line.
    #[error("invalid field {field} {value:?}: {reason}")]
    InvalidField {
        /// The field name.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A stored record is not valid UTF-8.
    #[error("invalid UTF-8 in metadata record")]
    InvalidUtf8,
}

impl CodecError {
    /// Creates a malformed entry line error.
    pub fn malformed_line(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEntryLine {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed permissions line error.
    pub fn malformed_permissions(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPermissions {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed folder sync error.
    pub fn malformed_folder(reason: impl Into<String>) -> Self {
        Self::MalformedFolderSync {
            reason: reason.into(),
        }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason,
        }
    }

    /// Returns true for errors describing unusable metadata content.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, CodecError::InvalidField { .. })
    }
}
