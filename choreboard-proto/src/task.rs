//! Task model shared by the engine, its stores, and host processes.
//!
//! A [`Task`] is a group-scoped chore with a deadline, a difficulty weight,
//! and an optional assignee. Its `version` is bumped by the store on every
//! write and is the basis for all compare-and-swap updates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest accepted difficulty weight.
pub const MIN_DIFFICULTY: u8 = 1;

/// Highest accepted difficulty weight.
pub const MAX_DIFFICULTY: u8 = 5;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a group sharing a chore list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Create a group identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this group ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a group member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this user ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a task record is known to be durable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The record was written to the task store.
    #[default]
    Synced,
    /// The record only exists locally and is queued for another write attempt.
    PendingSync,
}

/// A group chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identity, preserved across recurring resets.
    pub id: TaskId,
    /// Group this task belongs to.
    pub group_id: GroupId,
    /// Display name (trimmed, non-empty).
    pub name: String,
    /// Difficulty weight in `MIN_DIFFICULTY..=MAX_DIFFICULTY`.
    pub difficulty: u8,
    /// Member who created the task.
    pub created_by: UserId,
    /// Member allowed to complete the task; anyone may complete it when `None`.
    pub assigned_to: Option<UserId>,
    pub completed: bool,
    pub recurring: bool,
    /// When the task was first created.
    pub created_at: DateTime<Utc>,
    /// Stored deadline. Legacy rows may lack one; see `deadline::resolve_deadline`.
    pub deadline: Option<DateTime<Utc>>,
    /// Days from creation to deadline, used to resolve a missing deadline.
    pub days_remaining: u32,
    /// Reset interval for recurring tasks, fixed when the deadline is set.
    pub original_duration_days: u32,
    /// Idempotency marker: set once the overdue penalty for the current
    /// deadline has been applied.
    #[serde(default)]
    pub overdue_processed: bool,
    /// When the task was last marked completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Member credited for the completion.
    #[serde(default)]
    pub completed_by: Option<UserId>,
    /// Store-assigned revision, bumped on every write. Zero means never stored.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub sync: SyncStatus,
}

impl Task {
    /// Member who receives credit or penalties for this task, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<&UserId> {
        self.assigned_to.as_ref()
    }

    /// Returns `true` if `user` may toggle completion of this task.
    ///
    /// Unassigned tasks may be completed by any member.
    #[must_use]
    pub fn can_be_toggled_by(&self, user: &UserId) -> bool {
        self.assigned_to.as_ref().is_none_or(|assignee| assignee == user)
    }

    /// Star value of this task (its difficulty) as a signed delta.
    #[must_use]
    pub fn stars(&self) -> i64 {
        i64::from(self.difficulty)
    }
}
