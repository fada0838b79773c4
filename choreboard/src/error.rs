//! Error taxonomy for the lifecycle engine.

use choreboard_proto::task::{MAX_DIFFICULTY, MIN_DIFFICULTY, TaskId, UserId};
use thiserror::Error;

use crate::store::StoreError;

/// Rejected caller input. Nothing is mutated when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Task name is empty after trimming.
    #[error("task name cannot be empty")]
    EmptyName,
    /// Difficulty is outside the accepted range.
    #[error("difficulty {0} out of range ({MIN_DIFFICULTY}-{MAX_DIFFICULTY})")]
    DifficultyOutOfRange(u8),
    /// Date is not shaped `YYYY-MM-DD`.
    #[error("malformed date {0:?}, expected YYYY-MM-DD")]
    MalformedDate(String),
    /// Time is not shaped `HH:MM`.
    #[error("malformed time {0:?}, expected HH:MM")]
    MalformedTime(String),
    /// A date or time component is outside its range.
    #[error("date or time component out of range")]
    OutOfRange,
    /// The date does not exist in the calendar (e.g. February 31st).
    #[error("no such calendar date: {0}")]
    NoSuchDate(String),
    /// The configured UTC offset is more than a day either way.
    #[error("utc offset of {0} minutes is out of range")]
    OffsetOutOfRange(i32),
    /// Deadline is not strictly after the current time.
    #[error("deadline must be in the future")]
    DeadlineNotInFuture,
}

/// Errors surfaced by [`TaskLifecycleController`](crate::lifecycle::TaskLifecycleController).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Caller input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The acting member is not the task's assignee.
    #[error("user {acting_user} may not complete task {task_id}")]
    Forbidden {
        /// Task that was targeted.
        task_id: TaskId,
        /// Member who attempted the action.
        acting_user: UserId,
    },

    /// Task or stats row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage collaborator failed or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Concurrent writers kept winning the compare-and-swap race.
    #[error("task {0} was modified concurrently, retry later")]
    Conflict(TaskId),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            other @ (StoreError::Unavailable(_) | StoreError::Timeout(_)) => {
                Self::StorageUnavailable(other.to_string())
            }
        }
    }
}
