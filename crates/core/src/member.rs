// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live members and the FIFO candidate queue they wait in before election.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::command::Command;
use crate::commit::Commit;
use crate::id::MemberId;
use crate::session::Session;

/// Present members (keyed by the index of their Join commit) plus the
/// election state: the candidate queue and the current leader.
#[derive(Default)]
pub struct MemberDirectory {
    members: BTreeMap<MemberId, Commit<Command>>,
    candidates: VecDeque<MemberId>,
    leader: Option<MemberId>,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, member_id: &MemberId) -> bool {
        self.members.contains_key(member_id)
    }

    pub fn leader(&self) -> Option<MemberId> {
        self.leader
    }

    /// Members present, in ascending id order.
    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn owning_session(&self, member_id: &MemberId) -> Option<crate::id::SessionId> {
        self.members.get(member_id).map(Commit::session_id)
    }

    /// The actual session handle that joined `member_id`, for direct
    /// (non-broadcast) delivery such as `send` and `execute`.
    pub fn session_handle(&self, member_id: &MemberId) -> Option<&Arc<dyn Session>> {
        self.members.get(member_id).map(Commit::session)
    }

    /// Record a Join: the member id is the commit's own log index. The
    /// commit is retained (moved into the directory) and the new member is
    /// appended to the candidate queue tail.
    pub fn insert_join(&mut self, commit: Commit<Command>) -> MemberId {
        let member_id = MemberId::new(commit.index());
        self.members.insert(member_id, commit);
        self.candidates.push_back(member_id);
        member_id
    }

    /// Remove `member_id` from the members map and candidate queue,
    /// returning its Join commit for the caller to close. `O(n)` removal
    /// from the queue is acceptable at this scale. Leaves `leader` untouched
    /// even if it names `member_id` — callers removing the leader must call
    /// [`crate::elector::LeaderElector::resign_leader`] first so `"resign"`
    /// can still be published before the leader slot is cleared.
    pub fn remove(&mut self, member_id: &MemberId) -> Option<Commit<Command>> {
        self.candidates.retain(|id| id != member_id);
        self.members.remove(member_id)
    }

    pub fn push_candidate_back(&mut self, member_id: MemberId) {
        self.candidates.push_back(member_id);
    }

    pub fn pop_candidate_front(&mut self) -> Option<MemberId> {
        self.candidates.pop_front()
    }

    pub fn set_leader(&mut self, leader: Option<MemberId>) {
        self.leader = leader;
    }

    #[cfg(test)]
    pub fn candidate_order(&self) -> Vec<MemberId> {
        self.candidates.iter().copied().collect()
    }
}

#[cfg(test)]
#[path = "member_tests.rs"]
mod tests;
