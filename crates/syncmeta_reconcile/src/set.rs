//! The reconciliation set.
//!
//! Holds one [`ReconciliationNode`] per out-of-sync resource together with a
//! membership index mapping each directory to the immediate children that
//! are out of sync or contain out-of-sync descendants. Resources absent from
//! the set are in sync.
//!
//! Mutations are grouped into input batches. Each outermost batch produces at
//! most one [`SetChangeEvent`]; opposite operations on the same path inside a
//! batch cancel out.

use crate::cancel::CancelFlag;
use crate::compare::{ReconciliationNode, SyncComparator, SyncDirection};
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::event::{EventBuilder, SetChangeEvent};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use syncmeta_store::WorkspacePath;
use tracing::{debug, warn};

/// How far below the starting path a recompute walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    /// Only the path itself.
    Zero,
    /// The path and its immediate children.
    One,
    /// The path and everything below it.
    Infinite,
}

/// One indexed child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetMember {
    /// The child is itself out of sync.
    Node(ReconciliationNode),
    /// The child is in sync but contains out-of-sync descendants.
    Container(WorkspacePath),
}

impl SetMember {
    /// Returns the member's path.
    #[must_use]
    pub fn path(&self) -> &WorkspacePath {
        match self {
            Self::Node(node) => &node.path,
            Self::Container(path) => path,
        }
    }
}

/// Counters reported by [`ReconciliationSet::recompute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    /// Resources classified.
    pub visited: usize,
    /// Resources found out of sync.
    pub out_of_sync: usize,
    /// Nodes removed, either now in sync or no longer present.
    pub removed: usize,
    /// Resources omitted because classification failed.
    pub errors: usize,
}

#[derive(Debug, Default)]
struct SetState {
    nodes: BTreeMap<WorkspacePath, ReconciliationNode>,
    /// Directory to indexed immediate children. Entries are never empty.
    parents: BTreeMap<WorkspacePath, BTreeSet<WorkspacePath>>,
    pending: EventBuilder,
    input_depth: usize,
}

impl SetState {
    fn insert(&mut self, node: ReconciliationNode) {
        if let Some(existing) = self.nodes.get_mut(&node.path) {
            if *existing != node {
                self.pending.changed(&node.path);
                *existing = node;
            }
            return;
        }
        let path = node.path.clone();
        self.nodes.insert(path.clone(), node);
        self.pending.added(&path);
        self.link(&path);
    }

    fn remove(&mut self, path: &WorkspacePath) -> bool {
        if self.nodes.remove(path).is_none() {
            return false;
        }
        self.pending.removed(path);
        self.unlink(path);
        true
    }

    /// Records `path` in its parents, reporting the shallowest directory
    /// that was not indexed before.
    fn link(&mut self, path: &WorkspacePath) {
        let mut child = path.clone();
        let mut indexed = Vec::new();
        while let Some(parent) = child.parent() {
            let known = self.parents.contains_key(&parent);
            self.parents.entry(parent.clone()).or_default().insert(child);
            if known {
                break;
            }
            indexed.push(parent.clone());
            child = parent;
        }
        if let Some(top) = indexed.iter().rev().find(|dir| !dir.is_root()) {
            self.pending.added_root(top);
        }
    }

    /// Drops `path` from its parents while nothing below still needs it.
    fn unlink(&mut self, path: &WorkspacePath) {
        let mut child = path.clone();
        let mut unindexed = Vec::new();
        loop {
            if self.nodes.contains_key(&child) || self.parents.contains_key(&child) {
                break;
            }
            let Some(parent) = child.parent() else {
                break;
            };
            let Some(children) = self.parents.get_mut(&parent) else {
                break;
            };
            children.remove(&child);
            if !children.is_empty() {
                break;
            }
            self.parents.remove(&parent);
            unindexed.push(parent.clone());
            child = parent;
        }
        if let Some(top) = unindexed.iter().rev().find(|dir| !dir.is_root()) {
            self.pending.removed_root(top);
        }
    }
}

/// Out-of-sync resources and their membership index.
///
/// Thread-safe: recompute is the single writer, queries may run
/// concurrently and observe partially recomputed state.
pub struct ReconciliationSet {
    config: ReconcileConfig,
    state: RwLock<SetState>,
    subscribers: Mutex<Vec<Sender<SetChangeEvent>>>,
    history: RwLock<VecDeque<SetChangeEvent>>,
    next_sequence: AtomicU64,
}

impl ReconciliationSet {
    /// Creates an empty set.
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            state: RwLock::new(SetState::default()),
            subscribers: Mutex::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Subscribes to all future change events.
    pub fn subscribe(&self) -> Receiver<SetChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Returns delivered events with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<SetChangeEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the sequence number of the last delivered event, 0 if none.
    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst) - 1
    }

    /// Opens an input batch. Batches nest.
    pub fn begin_input(&self) {
        self.state.write().input_depth += 1;
    }

    /// Closes an input batch, delivering the accumulated event when the
    /// outermost batch ends.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedInput` if no batch is open.
    pub fn end_input(&self) -> ReconcileResult<()> {
        let event = {
            let mut state = self.state.write();
            if state.input_depth == 0 {
                return Err(ReconcileError::UnbalancedInput);
            }
            state.input_depth -= 1;
            self.take_event(&mut state)
        };
        if let Some(event) = event {
            self.deliver(event);
        }
        Ok(())
    }

    /// Adds or replaces a node.
    pub fn add(&self, node: ReconciliationNode) {
        self.mutate(|state| state.insert(node));
    }

    /// Removes the node at `path`, returning true if it was present.
    pub fn remove(&self, path: &WorkspacePath) -> bool {
        self.mutate(|state| state.remove(path))
    }

    /// Removes every node.
    pub fn clear(&self) {
        self.mutate(|state| {
            let paths: Vec<_> = state.nodes.keys().cloned().collect();
            for path in &paths {
                state.remove(path);
            }
        });
    }

    /// Reclassifies `path` to `depth` and brings the set in line.
    ///
    /// Walks the union of local, phantom and remote children. Nodes in the
    /// walked scope that were not visited are removed. Resources that fail
    /// to classify are logged and omitted. All changes are delivered as one
    /// event.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if `cancel` is set before the walk completes;
    /// nodes updated so far are kept and stale nodes are not swept.
    pub fn recompute(
        &self,
        comparator: &SyncComparator<'_>,
        path: &WorkspacePath,
        depth: Depth,
        cancel: &CancelFlag,
    ) -> ReconcileResult<RecomputeSummary> {
        self.begin_input();
        let result = self.walk(comparator, path, depth, cancel);
        let closed = self.end_input();
        let summary = result?;
        closed?;
        debug!(
            path = %path,
            visited = summary.visited,
            out_of_sync = summary.out_of_sync,
            removed = summary.removed,
            errors = summary.errors,
            "recomputed reconciliation set"
        );
        Ok(summary)
    }

    /// Returns the indexed children of `dir`.
    pub fn members(&self, dir: &WorkspacePath) -> Vec<SetMember> {
        let state = self.state.read();
        let Some(children) = state.parents.get(dir) else {
            return Vec::new();
        };
        children
            .iter()
            .map(|child| match state.nodes.get(child) {
                Some(node) => SetMember::Node(node.clone()),
                None => SetMember::Container(child.clone()),
            })
            .collect()
    }

    /// Returns every node, ordered by path.
    pub fn all_out_of_sync(&self) -> Vec<ReconciliationNode> {
        self.state.read().nodes.values().cloned().collect()
    }

    /// Returns the nodes at or below `dir`, ordered by path.
    pub fn out_of_sync_under(&self, dir: &WorkspacePath) -> Vec<ReconciliationNode> {
        self.state
            .read()
            .nodes
            .values()
            .filter(|node| dir.contains(&node.path))
            .cloned()
            .collect()
    }

    /// Returns the node at `path`.
    pub fn node(&self, path: &WorkspacePath) -> Option<ReconciliationNode> {
        self.state.read().nodes.get(path).cloned()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Returns true if everything is in sync.
    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    /// Returns the number of nodes with the given direction.
    pub fn count(&self, direction: SyncDirection) -> usize {
        self.state
            .read()
            .nodes
            .values()
            .filter(|node| node.direction == direction)
            .count()
    }

    /// Returns true if `dir` has indexed children.
    pub fn has_members(&self, dir: &WorkspacePath) -> bool {
        self.state.read().parents.contains_key(dir)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut SetState) -> R) -> R {
        let (result, event) = {
            let mut state = self.state.write();
            let result = f(&mut state);
            let event = self.take_event(&mut state);
            (result, event)
        };
        if let Some(event) = event {
            self.deliver(event);
        }
        result
    }

    fn take_event(&self, state: &mut SetState) -> Option<SetChangeEvent> {
        if state.input_depth > 0 || state.pending.is_empty() {
            return None;
        }
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        Some(state.pending.take(sequence))
    }

    fn deliver(&self, event: SetChangeEvent) {
        {
            let mut history = self.history.write();
            history.push_back(event.clone());
            while history.len() > self.config.event_history {
                history.pop_front();
            }
        }
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn walk(
        &self,
        comparator: &SyncComparator<'_>,
        path: &WorkspacePath,
        depth: Depth,
        cancel: &CancelFlag,
    ) -> ReconcileResult<RecomputeSummary> {
        let mut walk = Walk::default();

        cancel.check()?;
        let is_container = self.visit(comparator, path, &mut walk) == Some(true);

        match depth {
            Depth::Zero => {}
            Depth::One => {
                if is_container {
                    if let Some(children) = Self::list(comparator, path, &mut walk) {
                        for child in children {
                            cancel.check()?;
                            self.visit(comparator, &child, &mut walk);
                        }
                    }
                }
            }
            Depth::Infinite => {
                let mut dirs = if is_container { vec![path.clone()] } else { Vec::new() };
                while let Some(dir) = dirs.pop() {
                    let Some(children) = Self::list(comparator, &dir, &mut walk) else {
                        continue;
                    };
                    for child in children {
                        cancel.check()?;
                        if self.visit(comparator, &child, &mut walk) == Some(true) {
                            dirs.push(child);
                        }
                    }
                }
            }
        }

        let in_scope = |candidate: &WorkspacePath| match depth {
            Depth::Zero => candidate == path,
            Depth::One => candidate == path || candidate.parent().as_ref() == Some(path),
            Depth::Infinite => path.contains(candidate),
        };
        let stale: Vec<WorkspacePath> = self
            .state
            .read()
            .nodes
            .keys()
            .filter(|&candidate| in_scope(candidate))
            .filter(|&candidate| !walk.visited.contains(candidate))
            .filter(|&candidate| !walk.unknown.iter().any(|dir| dir.is_ancestor_of(candidate)))
            .cloned()
            .collect();
        for candidate in stale {
            if self.remove(&candidate) {
                walk.summary.removed += 1;
            }
        }
        Ok(walk.summary)
    }

    /// Classifies one resource and applies the outcome. Returns whether the
    /// resource is a directory, or `None` if classification failed.
    fn visit(
        &self,
        comparator: &SyncComparator<'_>,
        path: &WorkspacePath,
        walk: &mut Walk,
    ) -> Option<bool> {
        walk.visited.insert(path.clone());
        walk.summary.visited += 1;
        match comparator.classify_full(path) {
            Ok(outcome) => {
                match outcome.node {
                    Some(node) => {
                        walk.summary.out_of_sync += 1;
                        self.add(node);
                    }
                    None => {
                        if self.remove(path) {
                            walk.summary.removed += 1;
                        }
                    }
                }
                Some(outcome.is_container)
            }
            Err(err) => {
                warn!(path = %path, error = %err, "omitting resource from reconciliation");
                walk.summary.errors += 1;
                walk.unknown.push(path.clone());
                if self.remove(path) {
                    walk.summary.removed += 1;
                }
                None
            }
        }
    }

    fn list(
        comparator: &SyncComparator<'_>,
        dir: &WorkspacePath,
        walk: &mut Walk,
    ) -> Option<Vec<WorkspacePath>> {
        match comparator.children(dir) {
            Ok(children) => Some(children),
            Err(err) => {
                warn!(path = %dir, error = %err, "cannot list children for reconciliation");
                walk.summary.errors += 1;
                walk.unknown.push(dir.clone());
                None
            }
        }
    }
}

impl Default for ReconciliationSet {
    fn default() -> Self {
        Self::new(ReconcileConfig::default())
    }
}

#[derive(Default)]
struct Walk {
    visited: BTreeSet<WorkspacePath>,
    /// Directories whose subtree could not be walked.
    unknown: Vec<WorkspacePath>,
    summary: RecomputeSummary,
}
