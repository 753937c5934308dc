// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The group state machine: the single `apply` entry point a replicated log
//! invokes once per committed entry, plus the session-lifecycle and delete
//! entry points it invokes out of band.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::command::{Command, CommandOutcome};
use crate::commit::{Commit, CommitRegistry};
use crate::elector::LeaderElector;
use crate::error::GroupError;
use crate::event::Event;
use crate::id::{MemberId, SessionId};
use crate::listeners::ListenerSet;
use crate::member::MemberDirectory;
use crate::property::PropertyStore;
use crate::scheduler::Executor;
use crate::session::Session;

/// Deterministic, single-threaded transition function over a group's
/// members, properties, listeners, and leader term.
///
/// Held behind `Arc<Mutex<_>>` so a scheduled callback (see `handle_schedule`)
/// can re-enter the state machine from the executor without this crate
/// needing a handle to the log runtime that drives it.
pub struct GroupStateMachine {
    registry: CommitRegistry,
    directory: MemberDirectory,
    properties: PropertyStore,
    listeners: ListenerSet,
    elector: LeaderElector,
    executor: Arc<dyn Executor>,
    deleted: bool,
    self_handle: Weak<Mutex<GroupStateMachine>>,
}

impl GroupStateMachine {
    pub fn new(executor: Arc<dyn Executor>) -> Arc<Mutex<Self>> {
        Arc::new_cyclic(|weak| {
            Mutex::new(Self {
                registry: CommitRegistry::new(),
                directory: MemberDirectory::new(),
                properties: PropertyStore::new(),
                listeners: ListenerSet::new(),
                elector: LeaderElector::new(),
                executor,
                deleted: false,
                self_handle: weak.clone(),
            })
        })
    }

    pub fn term(&self) -> u64 {
        self.elector.term()
    }

    pub fn leader(&self) -> Option<MemberId> {
        self.directory.leader()
    }

    pub fn members(&self) -> Vec<MemberId> {
        self.directory.member_ids()
    }

    pub fn commit_count(&self) -> u64 {
        self.registry.live_count()
    }

    /// Apply one committed operation. Every branch either retains `commit`
    /// by moving it into an index, or closes it before returning.
    pub fn apply(&mut self, commit: Commit<Command>) -> Result<CommandOutcome, GroupError> {
        if self.deleted {
            commit.close();
            return Err(GroupError::InternalFailure { message: "group already deleted".to_string() });
        }

        let index = commit.index();
        let session_id = commit.session_id();
        let command = commit.operation().clone();
        tracing::debug!(index, %session_id, kind = command.kind_name(), "applying command");

        let result = match command {
            Command::Join => self.handle_join(commit),
            Command::Leave { member_id } => self.handle_leave(commit, member_id),
            Command::Listen => self.handle_listen(commit),
            Command::Resign { member_id } => self.handle_resign(commit, member_id),
            Command::SetProperty { member_id, name, .. } => self.handle_set_property(commit, member_id, name),
            Command::GetProperty { member_id, name } => self.handle_get_property(commit, member_id, name),
            Command::RemoveProperty { member_id, name } => self.handle_remove_property(commit, member_id, name),
            Command::Send { member_id, topic, payload } => self.handle_send(commit, member_id, topic, payload),
            Command::Schedule { member_id, delay_ms, callback } => {
                self.handle_schedule(commit, member_id, delay_ms, callback)
            }
            Command::Execute { member_id, callback } => self.handle_execute(commit, member_id, callback),
        };

        if let Err(ref err) = result {
            tracing::warn!(index, error = %err, "command failed");
        }
        result
    }

    fn handle_join(&mut self, commit: Commit<Command>) -> Result<CommandOutcome, GroupError> {
        let index = commit.index();
        let joining_session = commit.session_id();
        let member_id = self.directory.insert_join(commit);
        self.registry.retain();
        // The joining session already learns its own id via the return
        // value; "join" is only news to everyone else listening.
        self.listeners.publish_except(&Event::Join { member_id }, &joining_session);
        if self.elector.term() == 0 {
            self.elector.increment_term(index, &self.listeners);
        }
        self.elector.elect_leader(&mut self.directory, &self.listeners);
        Ok(CommandOutcome::Joined(member_id))
    }

    fn handle_leave(&mut self, commit: Commit<Command>, member_id: MemberId) -> Result<CommandOutcome, GroupError> {
        let was_leader = self.directory.leader() == Some(member_id);
        if let Some(join_commit) = self.directory.remove(&member_id) {
            self.registry.release();
            for property_commit in self.properties.remove_all_for_member(&member_id) {
                property_commit.close();
                self.registry.release();
            }
            if was_leader {
                self.elector.resign_leader(false, &mut self.directory, &self.listeners);
                self.elector.increment_term(commit.index(), &self.listeners);
                self.elector.elect_leader(&mut self.directory, &self.listeners);
            }
            self.listeners.publish(&Event::Leave { member_id });
            join_commit.close();
        }
        commit.close();
        Ok(CommandOutcome::Unit)
    }

    fn handle_listen(&mut self, commit: Commit<Command>) -> Result<CommandOutcome, GroupError> {
        let member_ids = self.directory.member_ids();
        self.listeners.add(commit.session().clone());
        commit.close();
        Ok(CommandOutcome::Listening(member_ids))
    }

    fn handle_resign(&mut self, commit: Commit<Command>, member_id: MemberId) -> Result<CommandOutcome, GroupError> {
        if self.directory.leader() == Some(member_id) {
            self.elector.resign_leader(true, &mut self.directory, &self.listeners);
            self.elector.increment_term(commit.index(), &self.listeners);
            self.elector.elect_leader(&mut self.directory, &self.listeners);
        }
        commit.close();
        Ok(CommandOutcome::Unit)
    }

    fn handle_set_property(
        &mut self,
        commit: Commit<Command>,
        member_id: MemberId,
        name: String,
    ) -> Result<CommandOutcome, GroupError> {
        let displaced = self.properties.set(member_id, name, commit);
        self.registry.retain();
        if let Some(displaced) = displaced {
            displaced.close();
            self.registry.release();
        }
        Ok(CommandOutcome::Unit)
    }

    fn handle_get_property(
        &mut self,
        commit: Commit<Command>,
        member_id: MemberId,
        name: String,
    ) -> Result<CommandOutcome, GroupError> {
        let value = self.properties.get(&member_id, &name).cloned();
        commit.close();
        Ok(CommandOutcome::Property(value))
    }

    fn handle_remove_property(
        &mut self,
        commit: Commit<Command>,
        member_id: MemberId,
        name: String,
    ) -> Result<CommandOutcome, GroupError> {
        if let Some(removed) = self.properties.remove(&member_id, &name) {
            removed.close();
            self.registry.release();
        }
        commit.close();
        Ok(CommandOutcome::Unit)
    }

    fn handle_send(
        &mut self,
        commit: Commit<Command>,
        member_id: MemberId,
        topic: String,
        payload: serde_json::Value,
    ) -> Result<CommandOutcome, GroupError> {
        let Some(session) = self.directory.session_handle(&member_id).cloned() else {
            commit.close();
            return Err(GroupError::UnknownMember { member_id });
        };
        session.publish(Event::Message { sender_id: member_id, topic, payload });
        commit.close();
        Ok(CommandOutcome::Unit)
    }

    fn handle_execute(
        &mut self,
        commit: Commit<Command>,
        member_id: MemberId,
        callback: serde_json::Value,
    ) -> Result<CommandOutcome, GroupError> {
        let Some(session) = self.directory.session_handle(&member_id).cloned() else {
            commit.close();
            return Err(GroupError::UnknownMember { member_id });
        };
        session.publish(Event::Execute { callback });
        commit.close();
        Ok(CommandOutcome::Unit)
    }

    /// Registers a delayed task with the executor. The commit is retained
    /// (moved into the scheduled closure) rather than closed here — it is
    /// closed when the closure fires, or by [`Commit`]'s drop glue if the
    /// executor rejects it without storing the closure.
    fn handle_schedule(
        &mut self,
        commit: Commit<Command>,
        member_id: MemberId,
        delay_ms: u64,
        callback: serde_json::Value,
    ) -> Result<CommandOutcome, GroupError> {
        if !self.directory.contains(&member_id) {
            commit.close();
            return Err(GroupError::UnknownMember { member_id });
        }

        self.registry.retain();
        let weak = self.self_handle.clone();
        let scheduled = self.executor.schedule(
            Duration::from_millis(delay_ms),
            Box::new(move || {
                let Some(handle) = weak.upgrade() else { return };
                handle.lock().fire_scheduled(member_id, callback, commit);
            }),
        );

        match scheduled {
            Ok(_task_id) => Ok(CommandOutcome::Unit),
            Err(err) => {
                // The closure above was dropped unfired when `schedule`
                // returned early, which already closed the commit.
                self.registry.release();
                Err(GroupError::ScheduleRejected { reason: err.reason })
            }
        }
    }

    /// Re-checks membership at firing time, publishes `"execute"` if the
    /// member is still present, and closes the Schedule commit either way.
    fn fire_scheduled(&mut self, member_id: MemberId, callback: serde_json::Value, commit: Commit<Command>) {
        if let Some(session) = self.directory.session_handle(&member_id).cloned() {
            session.publish(Event::Execute { callback });
        }
        commit.close();
        self.registry.release();
    }

    /// A listener session has closed normally.
    pub fn on_session_close(&mut self, session_id: SessionId, at_index: u64) {
        self.handle_session_departure(session_id, at_index);
    }

    /// A listener session was declared expired by the transport layer.
    /// Treated identically to `on_session_close`.
    pub fn on_session_expire(&mut self, session_id: SessionId, at_index: u64) {
        self.handle_session_departure(session_id, at_index);
    }

    fn handle_session_departure(&mut self, session_id: SessionId, at_index: u64) {
        if self.deleted {
            return;
        }
        tracing::debug!(%session_id, "session departed");
        self.listeners.remove(&session_id);

        let left: Vec<MemberId> = self
            .directory
            .member_ids()
            .into_iter()
            .filter(|member_id| self.directory.owning_session(member_id).as_ref() == Some(&session_id))
            .collect();

        let mut left_commits = Vec::with_capacity(left.len());
        for member_id in &left {
            if let Some(commit) = self.directory.remove(member_id) {
                self.registry.release();
                for property_commit in self.properties.remove_all_for_member(member_id) {
                    property_commit.close();
                    self.registry.release();
                }
                left_commits.push(commit);
            }
        }

        // Election must not observe partial state: every departing member
        // is removed before resign/term/elect runs.
        if let Some(leader_id) = self.directory.leader() {
            if left.contains(&leader_id) {
                self.elector.resign_leader(false, &mut self.directory, &self.listeners);
                self.elector.increment_term(at_index, &self.listeners);
                self.elector.elect_leader(&mut self.directory, &self.listeners);
            }
        }

        for member_id in &left {
            self.listeners.publish(&Event::Leave { member_id: *member_id });
        }
        for commit in left_commits {
            commit.close();
        }
    }

    /// Closes and drops every retained commit, clears all indices. No
    /// further command may be applied afterward.
    pub fn delete(&mut self) {
        if self.deleted {
            return;
        }
        tracing::debug!("deleting group");
        for member_id in self.directory.member_ids() {
            for property_commit in self.properties.remove_all_for_member(&member_id) {
                property_commit.close();
                self.registry.release();
            }
            if let Some(commit) = self.directory.remove(&member_id) {
                commit.close();
                self.registry.release();
            }
        }
        self.listeners = ListenerSet::new();
        self.elector = LeaderElector::new();
        self.directory.set_leader(None);
        self.deleted = true;
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
