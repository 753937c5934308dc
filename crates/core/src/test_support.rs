// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-rolled deterministic test doubles for the collaborator interfaces
//! this crate consumes: a recording session and a fixed-firing executor,
//! good enough for unit and property tests, gated behind `cfg(any(test,
//! feature = "test-support"))` so downstream crates can reuse them too.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::event::Event;
use crate::id::SessionId;
use crate::scheduler::{Executor, ScheduleError, ScheduledTaskId};
use crate::session::{Session, SessionState};

/// In-memory [`Session`] that records every event published to it, in order.
pub struct RecordingSession {
    id: SessionId,
    state: Mutex<SessionState>,
    received: Mutex<Vec<Event>>,
}

impl RecordingSession {
    pub fn new(id: impl Into<SessionId>) -> Arc<Self> {
        Arc::new(Self { id: id.into(), state: Mutex::new(SessionState::Open), received: Mutex::new(Vec::new()) })
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    /// Snapshot of every event delivered to this session so far, in delivery order.
    pub fn received(&self) -> Vec<Event> {
        self.received.lock().clone()
    }

    /// Names only, for terse assertions (e.g. `["group:term", "group:elect"]`).
    pub fn received_names(&self) -> Vec<&'static str> {
        self.received.lock().iter().map(Event::name).collect()
    }
}

impl Session for RecordingSession {
    fn id(&self) -> SessionId {
        self.id.clone()
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn publish(&self, event: Event) {
        self.received.lock().push(event);
    }
}

/// A callback registered with [`FixedExecutor::schedule`].
type Callback = Box<dyn FnOnce() + Send>;

/// Deterministic [`Executor`] double that only fires callbacks when told to.
///
/// Scheduled tasks are kept in registration order; `fire_all` drains and runs
/// them, preserving deterministic log-time ordering without any dependency
/// on wall-clock time.
#[derive(Default)]
pub struct FixedExecutor {
    pending: Mutex<Vec<(ScheduledTaskId, Callback)>>,
    next_id: Mutex<u64>,
    /// When set, every subsequent `schedule` call fails with this reason.
    reject_with: Mutex<Option<String>>,
}

impl FixedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_future_schedules(&self, reason: impl Into<String>) {
        *self.reject_with.lock() = Some(reason.into());
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run every pending callback, oldest first, then clear the queue.
    pub fn fire_all(&self) {
        let tasks = std::mem::take(&mut *self.pending.lock());
        for (_, callback) in tasks {
            callback();
        }
    }
}

impl Executor for FixedExecutor {
    fn schedule(&self, _delay: Duration, callback: Callback) -> Result<ScheduledTaskId, ScheduleError> {
        if let Some(reason) = self.reject_with.lock().clone() {
            return Err(ScheduleError { reason });
        }
        let mut next_id = self.next_id.lock();
        let id = ScheduledTaskId(*next_id);
        *next_id += 1;
        self.pending.lock().push((id, callback));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_session_tracks_delivery_order() {
        let session = RecordingSession::new(1u64);
        session.publish(Event::Term { term: 1 });
        session.publish(Event::Elect { member_id: crate::id::MemberId::new(1) });
        assert_eq!(session.received_names(), vec!["group:term", "group:elect"]);
    }

    #[test]
    fn fixed_executor_defers_until_fired() {
        let executor = FixedExecutor::new();
        let ran = Arc::new(Mutex::new(false));
        let ran2 = ran.clone();
        executor.schedule(Duration::from_millis(5), Box::new(move || *ran2.lock() = true)).unwrap();
        assert!(!*ran.lock());
        executor.fire_all();
        assert!(*ran.lock());
    }

    #[test]
    fn fixed_executor_can_reject() {
        let executor = FixedExecutor::new();
        executor.reject_future_schedules("offline");
        let result = executor.schedule(Duration::from_millis(5), Box::new(|| {}));
        assert!(result.is_err());
    }
}
