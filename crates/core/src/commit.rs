// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Committed log entries and the registry that tracks how many are retained.
//!
//! A commit is conventionally a GC-managed handle with a manual `close()`
//! that callers must remember to invoke exactly once. Rust's ownership
//! system gives us that for free: `close` consumes `self`, so a commit that
//! has been retained by moving it into an index cannot be closed a second
//! time by the code that handed it off — the borrow checker rejects the
//! attempt at compile time rather than at debug runtime. [`CommitRegistry`]
//! keeps a live count on top of that for the testable "every retained commit
//! is closed exactly once" property.

use std::fmt;
use std::sync::Arc;

use crate::id::SessionId;
use crate::session::Session;

/// A decision of the replicated log: an operation plus its total-order index
/// and originating session, with a one-shot release hook.
///
/// Holds the session's actual handle rather than just its id: handlers that
/// retain a commit (Join, SetProperty) need to recover the owning session
/// later for lifecycle cascades, and `listen` needs a handle it can hand to
/// the listener set, not merely an id to look one up by.
pub struct Commit<Op> {
    index: u64,
    session: Arc<dyn Session>,
    operation: Op,
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl<Op> Commit<Op> {
    /// Construct a commit. `closer` is invoked exactly once, when `close` is
    /// called — this is the hook the replicated log uses to reclaim the
    /// entry — out of scope for this crate.
    pub fn new(index: u64, session: Arc<dyn Session>, operation: Op, closer: Box<dyn FnOnce() + Send>) -> Self {
        Self { index, session, operation, closer: Some(closer) }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn operation(&self) -> &Op {
        &self.operation
    }

    /// Release this commit back to the log. Consumes `self`: a retained
    /// commit (one moved into an index instead of closed) cannot reach this
    /// call site twice.
    pub fn close(mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }
}

impl<Op> Drop for Commit<Op> {
    /// A commit dropped without `close` having been called (for example, a
    /// scheduled task whose registration failed) still releases its closer,
    /// but this path always indicates a bug or a handler that bailed out
    /// early — log it so it shows up rather than silently vanishing.
    fn drop(&mut self) {
        if let Some(closer) = self.closer.take() {
            tracing::warn!(index = self.index, "commit dropped without close, releasing now");
            closer();
        }
    }
}

impl<Op: fmt::Debug> fmt::Debug for Commit<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("index", &self.index)
            .field("session_id", &self.session.id())
            .field("operation", &self.operation)
            .finish()
    }
}

/// Tracks how many commits are currently retained by the state machine's
/// indices (Member Directory join commits, Property Store set-property
/// commits). Purely a diagnostics/testability aid — Rust ownership already
/// enforces the single-close invariant structurally.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitRegistry {
    retained: u64,
}

impl CommitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a commit has been moved into an index instead of closed.
    pub fn retain(&mut self) {
        self.retained += 1;
    }

    /// Record that a previously retained commit has now been closed.
    pub fn release(&mut self) {
        debug_assert!(self.retained > 0, "released more commits than were ever retained");
        self.retained = self.retained.saturating_sub(1);
    }

    /// Number of commits currently retained (not yet closed).
    pub fn live_count(&self) -> u64 {
        self.retained
    }
}
