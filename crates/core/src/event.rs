// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events published by the group state machine.
//!
//! Serializes with `{"type": "group:name", ...fields}`, matching the rest of
//! this codebase's event wire format.

use crate::id::MemberId;
use serde::{Deserialize, Serialize};

/// Events that flow out of the state machine to listener sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "group:join")]
    Join { member_id: MemberId },

    #[serde(rename = "group:leave")]
    Leave { member_id: MemberId },

    #[serde(rename = "group:elect")]
    Elect { member_id: MemberId },

    #[serde(rename = "group:resign")]
    Resign { member_id: MemberId },

    #[serde(rename = "group:term")]
    Term { term: u64 },

    #[serde(rename = "group:message")]
    Message { sender_id: MemberId, topic: String, payload: serde_json::Value },

    #[serde(rename = "group:execute")]
    Execute { callback: serde_json::Value },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Join { .. } => "group:join",
            Event::Leave { .. } => "group:leave",
            Event::Elect { .. } => "group:elect",
            Event::Resign { .. } => "group:resign",
            Event::Term { .. } => "group:term",
            Event::Message { .. } => "group:message",
            Event::Execute { .. } => "group:execute",
        }
    }
}
