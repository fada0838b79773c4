//! Reset-or-delete transition shared by the overdue and post-completion paths.

use std::time::Duration;

use choreboard_proto::task::{Task, TaskId};
use chrono::{DateTime, Utc};

use crate::deadline::add_days;
use crate::lifecycle::guard;
use crate::store::{Cas, StoreError, TaskStore, bounded};

/// What should happen to a task that has run its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Recurring task, back to active with a fresh deadline.
    Reset(Task),
    /// One-off task, to be removed.
    Delete(TaskId),
}

impl Outcome {
    /// Id of the task the outcome applies to.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Reset(task) => &task.id,
            Self::Delete(id) => id,
        }
    }
}

/// Computes and commits [`Outcome`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceResetter;

impl RecurrenceResetter {
    /// Decides the next state of `task`, with the new deadline counted from
    /// `anchor`. The returned reset record keeps the input's version so it
    /// can be committed with a version check.
    #[must_use]
    pub fn apply(task: &Task, anchor: DateTime<Utc>) -> Outcome {
        if !task.recurring {
            return Outcome::Delete(task.id.clone());
        }
        let interval = task.original_duration_days.max(1);
        let mut reset = task.clone();
        reset.completed = false;
        reset.completed_at = None;
        reset.completed_by = None;
        reset.deadline = Some(add_days(anchor, interval));
        reset.days_remaining = interval;
        guard::clear(&mut reset);
        Outcome::Reset(reset)
    }

    /// Writes `outcome` if the stored task is still at `version`.
    ///
    /// On success the returned outcome carries the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store could not be reached.
    pub async fn commit<T: TaskStore>(
        tasks: &T,
        timeout: Duration,
        outcome: Outcome,
        version: u64,
    ) -> Result<Cas<Outcome>, StoreError> {
        match outcome {
            Outcome::Reset(mut task) => {
                task.version = version;
                Ok(
                    match bounded(timeout, tasks.update_if_version(&task)).await? {
                        Cas::Applied(stored) => Cas::Applied(Outcome::Reset(stored)),
                        Cas::Stale => Cas::Stale,
                        Cas::Missing => Cas::Missing,
                    },
                )
            }
            Outcome::Delete(id) => Ok(
                match bounded(timeout, tasks.delete_if_version(&id, version)).await? {
                    Cas::Applied(()) => Cas::Applied(Outcome::Delete(id)),
                    Cas::Stale => Cas::Stale,
                    Cas::Missing => Cas::Missing,
                },
            ),
        }
    }
}
