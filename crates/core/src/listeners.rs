// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session set and event publisher.
//!
//! Tracks which sessions have executed `Listen` and delivers events to them
//! in a deterministic order: ascending session id.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::event::Event;
use crate::id::SessionId;
use crate::session::Session;

/// The set of sessions currently registered as listeners.
///
/// A `BTreeMap` keyed by `SessionId` gives ascending-id iteration for free,
/// which event delivery determinism requires.
#[derive(Default)]
pub struct ListenerSet {
    sessions: BTreeMap<SessionId, Arc<dyn Session>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` as a listener. Idempotent: listening twice from
    /// the same session just replaces the handle.
    pub fn add(&mut self, session: Arc<dyn Session>) {
        self.sessions.insert(session.id(), session);
    }

    /// Remove a session from the listener set (session close/expire, or
    /// group deletion).
    pub fn remove(&mut self, session_id: &SessionId) {
        self.sessions.remove(session_id);
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Publish `event` to every listener whose session is currently OPEN, in
    /// ascending session-id order.
    pub fn publish(&self, event: &Event) {
        for session in self.sessions.values() {
            if session.state().is_open() {
                session.publish(event.clone());
            }
        }
    }

    /// Like [`Self::publish`], but skips `excluded` — used for `"join"`,
    /// which is not echoed back to the session that just joined.
    pub fn publish_except(&self, event: &Event, excluded: &SessionId) {
        for (session_id, session) in self.sessions.iter() {
            if session_id != excluded && session.state().is_open() {
                session.publish(event.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
#[path = "listeners_tests.rs"]
mod tests;
