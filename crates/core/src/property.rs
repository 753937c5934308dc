// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-member key/value properties, backed by the retained SetProperty commit.

use std::collections::BTreeMap;

use crate::command::Command;
use crate::commit::Commit;
use crate::id::MemberId;

/// Nested mapping: member-id → (property-name → retained SetProperty commit).
#[derive(Default)]
pub struct PropertyStore {
    properties: BTreeMap<MemberId, BTreeMap<String, Commit<Command>>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `commit` under `member_id`/`name`, returning the commit it
    /// displaced, if any. The caller must close the displaced commit — it
    /// is no longer referenced by any index once a new value takes its place.
    pub fn set(&mut self, member_id: MemberId, name: String, commit: Commit<Command>) -> Option<Commit<Command>> {
        self.properties.entry(member_id).or_default().insert(name, commit)
    }

    /// The stored value for `member_id`/`name`, or `None` if either is absent.
    pub fn get(&self, member_id: &MemberId, name: &str) -> Option<&serde_json::Value> {
        let commit = self.properties.get(member_id)?.get(name)?;
        match commit.operation() {
            Command::SetProperty { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Remove and return the commit stored at `member_id`/`name`. Drops the
    /// per-member sub-map once it becomes empty.
    pub fn remove(&mut self, member_id: &MemberId, name: &str) -> Option<Commit<Command>> {
        let sub_map = self.properties.get_mut(member_id)?;
        let removed = sub_map.remove(name);
        if sub_map.is_empty() {
            self.properties.remove(member_id);
        }
        removed
    }

    /// Remove and return every property commit owned by `member_id` (member
    /// removal cascade).
    pub fn remove_all_for_member(&mut self, member_id: &MemberId) -> Vec<Commit<Command>> {
        self.properties.remove(member_id).map(|sub_map| sub_map.into_values().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "property_tests.rs"]
mod tests;
