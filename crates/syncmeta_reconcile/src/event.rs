//! Set change events.

use serde::Serialize;
use std::collections::BTreeSet;
use syncmeta_store::WorkspacePath;

/// Changes to a reconciliation set over one input batch.
///
/// `added`, `removed` and `changed` are disjoint node paths. The root
/// collections name the shallowest directories that entered or left the
/// membership index; the workspace root is never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetChangeEvent {
    /// Monotonic sequence number, starting at 1.
    pub sequence: u64,
    /// Nodes that entered the set.
    pub added: Vec<WorkspacePath>,
    /// Nodes that left the set.
    pub removed: Vec<WorkspacePath>,
    /// Nodes whose classification was replaced.
    pub changed: Vec<WorkspacePath>,
    /// Directories that became indexed.
    pub added_roots: Vec<WorkspacePath>,
    /// Directories that stopped being indexed.
    pub removed_roots: Vec<WorkspacePath>,
}

impl SetChangeEvent {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.added_roots.is_empty()
            && self.removed_roots.is_empty()
    }
}

/// Accumulates changes until the outermost input batch ends.
///
/// Opposite operations on the same path within one batch cancel out.
#[derive(Debug, Default)]
pub(crate) struct EventBuilder {
    added: BTreeSet<WorkspacePath>,
    removed: BTreeSet<WorkspacePath>,
    changed: BTreeSet<WorkspacePath>,
    added_roots: BTreeSet<WorkspacePath>,
    removed_roots: BTreeSet<WorkspacePath>,
}

impl EventBuilder {
    pub(crate) fn added(&mut self, path: &WorkspacePath) {
        if self.removed.remove(path) {
            self.changed.insert(path.clone());
        } else {
            self.added.insert(path.clone());
        }
    }

    pub(crate) fn removed(&mut self, path: &WorkspacePath) {
        if self.added.remove(path) {
            return;
        }
        self.changed.remove(path);
        self.removed.insert(path.clone());
    }

    pub(crate) fn changed(&mut self, path: &WorkspacePath) {
        if !self.added.contains(path) {
            self.changed.insert(path.clone());
        }
    }

    pub(crate) fn added_root(&mut self, path: &WorkspacePath) {
        if self.removed_roots.remove(path) {
            return;
        }
        Self::insert_root(&mut self.added_roots, path);
    }

    pub(crate) fn removed_root(&mut self, path: &WorkspacePath) {
        if self.added_roots.remove(path) {
            return;
        }
        // Listeners never saw a root added in this batch.
        if self.added_roots.iter().any(|root| root.is_ancestor_of(path)) {
            return;
        }
        Self::insert_root(&mut self.removed_roots, path);
    }

    /// Inserts `path` unless an ancestor is already listed, dropping listed
    /// descendants.
    fn insert_root(roots: &mut BTreeSet<WorkspacePath>, path: &WorkspacePath) {
        if roots.iter().any(|root| root.contains(path)) {
            return;
        }
        roots.retain(|root| !path.is_ancestor_of(root));
        roots.insert(path.clone());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.added_roots.is_empty()
            && self.removed_roots.is_empty()
    }

    /// Drains the builder into an event with the given sequence number.
    pub(crate) fn take(&mut self, sequence: u64) -> SetChangeEvent {
        let builder = std::mem::take(self);
        SetChangeEvent {
            sequence,
            added: builder.added.into_iter().collect(),
            removed: builder.removed.into_iter().collect(),
            changed: builder.changed.into_iter().collect(),
            added_roots: builder.added_roots.into_iter().collect(),
            removed_roots: builder.removed_roots.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> WorkspacePath {
        WorkspacePath::new(p)
    }

    #[test]
    fn add_then_remove_cancels() {
        let mut builder = EventBuilder::default();
        builder.added(&path("p/a.c"));
        builder.added_root(&path("p"));
        builder.removed(&path("p/a.c"));
        builder.removed_root(&path("p"));
        assert!(builder.is_empty());
    }

    #[test]
    fn nested_roots_collapse_to_ancestor() {
        let mut builder = EventBuilder::default();
        builder.added_root(&path("p/sub"));
        builder.added_root(&path("p"));
        builder.added_root(&path("p/other"));
        builder.removed_root(&path("p/sub"));

        let event = builder.take(1);
        assert_eq!(event.added_roots, vec![path("p")]);
        assert!(event.removed_roots.is_empty());
    }

    #[test]
    fn remove_then_add_is_a_change() {
        let mut builder = EventBuilder::default();
        builder.removed(&path("p/a.c"));
        builder.added(&path("p/a.c"));

        let event = builder.take(1);
        assert_eq!(event.changed, vec![path("p/a.c")]);
        assert!(event.added.is_empty());
        assert!(event.removed.is_empty());
    }

    #[test]
    fn change_of_new_node_stays_added() {
        let mut builder = EventBuilder::default();
        builder.added(&path("p/a.c"));
        builder.changed(&path("p/a.c"));

        let event = builder.take(7);
        assert_eq!(event.sequence, 7);
        assert_eq!(event.added, vec![path("p/a.c")]);
        assert!(event.changed.is_empty());
        assert!(builder.is_empty());
    }
}
