//! Session configuration.

use syncmeta_store::DEFAULT_META_DIR;

/// Configuration for a synchronizer session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the per-directory metadata directory of file-backed sessions.
    pub meta_dir: String,

    /// Number of metadata change events kept for polling.
    pub change_history: usize,

    /// Whether a nested lock request outside the outer rule is an error.
    ///
    /// When disabled the request is logged and granted under the outer rule.
    pub strict_nesting: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta_dir: DEFAULT_META_DIR.to_string(),
            change_history: 1024,
            strict_nesting: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metadata directory name.
    #[must_use]
    pub fn meta_dir(mut self, name: impl Into<String>) -> Self {
        self.meta_dir = name.into();
        self
    }

    /// Sets the change event history size.
    #[must_use]
    pub const fn change_history(mut self, events: usize) -> Self {
        self.change_history = events;
        self
    }

    /// Sets whether nested rules must be contained in the outer rule.
    #[must_use]
    pub const fn strict_nesting(mut self, value: bool) -> Self {
        self.strict_nesting = value;
        self
    }
}
