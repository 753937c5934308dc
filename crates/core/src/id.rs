// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types for members and sessions.
//!
//! Unlike the random, string-shaped ids used elsewhere (jobs, agents,
//! timers), a [`MemberId`] is never generated — it is always the log index
//! of the Join commit that created the member.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a present group participant: the log index of its Join commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl MemberId {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MemberId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identity of a client session of the replicated log.
///
/// Sessions are assigned by the log runtime, not generated here, so this is
/// a plain wrapper rather than the `nanoid`-backed `define_id!` ids used for
/// locally-originated entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
