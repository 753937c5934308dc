// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types returned by the group state machine.

use crate::id::MemberId;
use thiserror::Error;

/// Failure surfaced to the calling client by [`crate::state_machine::GroupStateMachine::apply`].
///
/// None of these mutate state: the handler closes the initiating commit and
/// returns before touching any index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// Send/Execute/Schedule referenced a member-id not present in the directory.
    #[error("unknown member {member_id}")]
    UnknownMember { member_id: MemberId },

    /// The scheduler adapter refused a delayed task.
    #[error("schedule rejected: {reason}")]
    ScheduleRejected { reason: String },

    /// An unexpected condition during a mutating handler.
    #[error("internal failure: {message}")]
    InternalFailure { message: String },
}
