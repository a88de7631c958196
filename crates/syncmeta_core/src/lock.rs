//! Nested, reentrant, per-context exclusive lock.
//!
//! Contexts are logical execution handles issued by [`NestedLock::context`];
//! they replace thread identity, so one context may be carried across
//! threads and two contexts on one thread are strangers to each other.
//!
//! Each acquire maps the requested path to a [`LockRule`]:
//! - the workspace root maps to [`LockRule::Null`], which never conflicts
//!   and contains nothing
//! - a top-level path maps to itself
//! - any deeper path maps to its parent container, so the siblings stored
//!   together in one record are protected as a unit
//!
//! A context's first non-null rule takes the single exclusive primitive;
//! later acquires nest inside it and must be contained in it. The primitive
//! is handed back when the context releases that rule.
//!
//! [`NestedLock::acquire_workspace`] takes the primitive under
//! [`LockRule::Workspace`], which contains every rule. Batches opened on the
//! root use it, so no other context can write while they are open.

use crate::error::{CoreError, CoreResult};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use syncmeta_store::WorkspacePath;
use tracing::{trace, warn};

/// A logical execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Returns the raw id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// The scope a lock acquisition covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockRule {
    /// The root sentinel. Never conflicts, contains nothing.
    Null,
    /// A container and everything below it.
    Container(WorkspacePath),
    /// The whole workspace. Contains every rule.
    Workspace,
}

impl LockRule {
    /// Returns the rule protecting `path`.
    ///
    /// A top-level path maps to itself whatever its kind. For a top-level
    /// file that rule does not cover the root record holding its entry;
    /// writers of that record still exclude each other through the single
    /// primitive, and a root batch holds [`LockRule::Workspace`].
    #[must_use]
    pub fn for_path(path: &WorkspacePath) -> Self {
        match path.depth() {
            0 => LockRule::Null,
            1 => LockRule::Container(path.clone()),
            _ => match path.parent() {
                Some(parent) => LockRule::Container(parent),
                None => LockRule::Null,
            },
        }
    }

    /// Returns true for the root sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, LockRule::Null)
    }

    /// Returns true if `other` lies within this rule. The null rule
    /// contains nothing and is contained only by the workspace rule.
    #[must_use]
    pub fn contains(&self, other: &LockRule) -> bool {
        match (self, other) {
            (LockRule::Workspace, _) => true,
            (LockRule::Container(outer), LockRule::Container(inner)) => outer.contains(inner),
            _ => false,
        }
    }
}

impl fmt::Display for LockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockRule::Null => f.write_str("<null>"),
            LockRule::Container(path) => write!(f, "{path}"),
            LockRule::Workspace => f.write_str("<workspace>"),
        }
    }
}

#[derive(Debug, Default)]
struct ContextHold {
    rules: Vec<LockRule>,
    /// Stack index of the rule that took the primitive.
    owner_index: Option<usize>,
}

impl ContextHold {
    fn effective_rule(&self) -> Option<&LockRule> {
        self.owner_index.and_then(|idx| self.rules.get(idx))
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ContextId>,
    holds: HashMap<ContextId, ContextHold>,
    read_only: HashSet<ContextId>,
}

/// The session's nested lock.
pub struct NestedLock {
    state: Mutex<LockState>,
    released: Condvar,
    next_context: AtomicU64,
    strict: bool,
}

impl NestedLock {
    /// Creates a lock. With `strict` a nested rule outside the outer rule
    /// is a [`CoreError::LockProtocolViolation`]; otherwise it is logged
    /// and granted under the outer rule.
    pub fn new(strict: bool) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
            next_context: AtomicU64::new(1),
            strict,
        }
    }

    /// Issues a fresh context handle.
    pub fn context(&self) -> ContextId {
        ContextId(self.next_context.fetch_add(1, Ordering::SeqCst))
    }

    /// Acquires the rule for `path`, blocking without timeout while another
    /// context holds the primitive.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockProtocolViolation`] if strict and the rule is
    /// not contained in the context's outer rule.
    pub fn acquire(&self, ctx: ContextId, path: &WorkspacePath) -> CoreResult<LockRule> {
        self.acquire_rule(ctx, LockRule::for_path(path))
    }

    /// Acquires [`LockRule::Workspace`], blocking like
    /// [`acquire`](Self::acquire).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockProtocolViolation`] if strict and `ctx`
    /// already holds a narrower rule.
    pub fn acquire_workspace(&self, ctx: ContextId) -> CoreResult<LockRule> {
        self.acquire_rule(ctx, LockRule::Workspace)
    }

    fn acquire_rule(&self, ctx: ContextId, rule: LockRule) -> CoreResult<LockRule> {
        let mut state = self.state.lock();
        let takes_primitive = self.check_nesting(&state, ctx, &rule)?;

        if takes_primitive {
            while state.owner.is_some_and(|owner| owner != ctx) {
                trace!(%ctx, %rule, "waiting for lock");
                self.released.wait(&mut state);
            }
            state.owner = Some(ctx);
        }
        Self::push(&mut state, ctx, rule.clone(), takes_primitive);
        Ok(rule)
    }

    /// Like [`acquire`](Self::acquire) but returns `Ok(None)` instead of
    /// blocking when another context holds the primitive.
    ///
    /// # Errors
    ///
    /// Same as [`acquire`](Self::acquire).
    pub fn try_acquire(&self, ctx: ContextId, path: &WorkspacePath) -> CoreResult<Option<LockRule>> {
        let rule = LockRule::for_path(path);
        let mut state = self.state.lock();
        let takes_primitive = self.check_nesting(&state, ctx, &rule)?;

        if takes_primitive {
            if state.owner.is_some_and(|owner| owner != ctx) {
                return Ok(None);
            }
            state.owner = Some(ctx);
        }
        Self::push(&mut state, ctx, rule.clone(), takes_primitive);
        Ok(Some(rule))
    }

    /// Releases the innermost rule held by `ctx`.
    ///
    /// Returns true iff this call fully released the context's hold.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LockProtocolViolation`] if `ctx` holds nothing.
    pub fn release(&self, ctx: ContextId) -> CoreResult<bool> {
        let mut state = self.state.lock();
        let Some(hold) = state.holds.get_mut(&ctx) else {
            return Err(CoreError::lock_protocol(format!(
                "release by {ctx} without matching acquire"
            )));
        };
        hold.rules.pop();
        let depth = hold.rules.len();
        let hands_back = hold.owner_index.is_some_and(|idx| idx >= depth);
        if hands_back {
            hold.owner_index = None;
        }
        let finished = depth == 0;
        if finished {
            state.holds.remove(&ctx);
        }
        if hands_back {
            state.owner = None;
            self.released.notify_all();
            trace!(%ctx, "lock released");
        }
        Ok(finished)
    }

    /// Marks `ctx` as read-only. Read-only contexts read without the lock
    /// and are refused by mutating operations.
    pub fn register_read_only(&self, ctx: ContextId) {
        self.state.lock().read_only.insert(ctx);
    }

    /// Clears the read-only mark of `ctx`.
    pub fn unregister_read_only(&self, ctx: ContextId) {
        self.state.lock().read_only.remove(&ctx);
    }

    /// Returns true if `ctx` is registered read-only.
    pub fn is_read_only(&self, ctx: ContextId) -> bool {
        self.state.lock().read_only.contains(&ctx)
    }

    /// Returns the context holding the primitive.
    pub fn holder(&self) -> Option<ContextId> {
        self.state.lock().owner
    }

    /// Returns true if any context holds the primitive.
    pub fn is_held(&self) -> bool {
        self.holder().is_some()
    }

    /// Returns the nesting depth of `ctx`, null rules included.
    pub fn depth(&self, ctx: ContextId) -> usize {
        self.state
            .lock()
            .holds
            .get(&ctx)
            .map_or(0, |hold| hold.rules.len())
    }

    /// Returns the rule under which `ctx` holds the primitive.
    pub fn rule(&self, ctx: ContextId) -> Option<LockRule> {
        self.state
            .lock()
            .holds
            .get(&ctx)
            .and_then(|hold| hold.effective_rule().cloned())
    }

    /// Validates a request and returns whether it takes the primitive.
    fn check_nesting(&self, state: &LockState, ctx: ContextId, rule: &LockRule) -> CoreResult<bool> {
        if rule.is_null() {
            return Ok(false);
        }
        let Some(outer) = state.holds.get(&ctx).and_then(ContextHold::effective_rule) else {
            return Ok(true);
        };
        if !outer.contains(rule) {
            if self.strict {
                return Err(CoreError::lock_protocol(format!(
                    "{ctx} requested {rule} inside {outer}"
                )));
            }
            warn!(%ctx, %rule, %outer, "nested rule outside outer rule");
        }
        Ok(false)
    }

    fn push(state: &mut LockState, ctx: ContextId, rule: LockRule, takes_primitive: bool) {
        let hold = state.holds.entry(ctx).or_default();
        if takes_primitive {
            hold.owner_index = Some(hold.rules.len());
        }
        trace!(%ctx, %rule, depth = hold.rules.len() + 1, "lock acquired");
        hold.rules.push(rule);
    }
}

impl Default for NestedLock {
    fn default() -> Self {
        Self::new(true)
    }
}
