//! Newtypes for the identifiers the engine passes around.
//!
//! Keeping pids and uids apart at the type level prevents the classic
//! "passed a pid where a uid was expected" mistake in the matcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of uids reserved per Android multiuser profile.
pub const PER_USER_RANGE: u32 = 100_000;

/// First app id of the isolated (sandboxed) process range.
pub const FIRST_ISOLATED_APP_ID: u32 = 90_000;

/// A process identifier with type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub i32);

impl ProcessId {
    /// Create a new ProcessId.
    pub fn new(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the raw PID value.
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ProcessId {
    fn from(pid: i32) -> Self {
        Self(pid)
    }
}

/// A user identifier with type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u32);

impl UserId {
    /// Create a new UserId.
    pub fn new(uid: u32) -> Self {
        Self(uid)
    }

    /// Get the raw UID value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Per-profile app id (`uid % 100000`).
    pub fn app_id(&self) -> u32 {
        self.0 % PER_USER_RANGE
    }

    /// Whether this uid belongs to Android's isolated-process range.
    pub fn is_isolated(&self) -> bool {
        self.app_id() >= FIRST_ISOLATED_APP_ID
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for UserId {
    fn from(uid: u32) -> Self {
        Self(uid)
    }
}

impl From<UserId> for u32 {
    fn from(uid: UserId) -> Self {
        uid.0
    }
}
