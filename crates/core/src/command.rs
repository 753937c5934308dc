// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operation kinds a client session may commit, and what `apply` returns
//! for each of them.

use serde::{Deserialize, Serialize};

use crate::id::MemberId;

/// A single committed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Command {
    Join,
    Leave { member_id: MemberId },
    Listen,
    Resign { member_id: MemberId },
    SetProperty { member_id: MemberId, name: String, value: serde_json::Value },
    GetProperty { member_id: MemberId, name: String },
    RemoveProperty { member_id: MemberId, name: String },
    Send { member_id: MemberId, topic: String, payload: serde_json::Value },
    Schedule { member_id: MemberId, delay_ms: u64, callback: serde_json::Value },
    Execute { member_id: MemberId, callback: serde_json::Value },
}

impl Command {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Command::Join => "join",
            Command::Leave { .. } => "leave",
            Command::Listen => "listen",
            Command::Resign { .. } => "resign",
            Command::SetProperty { .. } => "set_property",
            Command::GetProperty { .. } => "get_property",
            Command::RemoveProperty { .. } => "remove_property",
            Command::Send { .. } => "send",
            Command::Schedule { .. } => "schedule",
            Command::Execute { .. } => "execute",
        }
    }
}

/// The value `apply` hands back to the caller on success.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Join: the id assigned to the new member.
    Joined(MemberId),
    /// Listen: the members present at the moment of registration.
    Listening(Vec<MemberId>),
    /// GetProperty: the stored value, or `None` for an absent member/key.
    Property(Option<serde_json::Value>),
    /// Every other command: no return payload.
    Unit,
}
