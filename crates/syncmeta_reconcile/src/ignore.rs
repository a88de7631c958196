//! Ignore patterns declared per directory.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

/// The compiled ignore patterns of one directory, matched against the
/// names of its children.
///
/// A `!` pattern clears every pattern before it. Patterns that fail to
/// compile are logged and skipped.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    set: GlobSet,
    len: usize,
}

impl IgnoreMatcher {
    /// Compiles `patterns`.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let start = patterns
            .iter()
            .rposition(|pattern| pattern.as_ref().trim() == "!")
            .map_or(0, |idx| idx + 1);

        let mut builder = GlobSetBuilder::new();
        let mut len = 0;
        for pattern in &patterns[start..] {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match GlobBuilder::new(pattern)
                .literal_separator(true)
                .backslash_escape(true)
                .build()
            {
                Ok(glob) => {
                    builder.add(glob);
                    len += 1;
                }
                Err(error) => warn!(pattern, %error, "skipping ignore pattern"),
            }
        }

        let set = builder.build().unwrap_or_else(|error| {
            warn!(%error, "ignore patterns failed to compile");
            GlobSet::empty()
        });
        Self { set, len }
    }

    /// Returns true if no pattern is in effect.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if a child called `name` is ignored.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.set.is_match(name)
    }
}
