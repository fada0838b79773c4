//! Overdue detection and processing.
//!
//! Each expired active task goes through three steps, in this order:
//!
//! 1. claim the idempotency marker with a version-checked write,
//! 2. penalize the assignee (if any), releasing the claim if that fails
//!    (a timed-out penalty keeps the claim, since it may have been applied),
//! 3. reset or delete the task, again version-checked.
//!
//! A task found with the marker already set but still active and expired
//! had its penalty applied by an earlier pass that failed at step 3; it is
//! finalized without a second penalty.

use std::sync::Arc;
use std::time::Duration;

use choreboard_proto::event::ChangeEvent;
use choreboard_proto::task::{Task, TaskId, UserId};
use chrono::{DateTime, Utc};

use crate::deadline::{is_overdue, resolve_deadline};
use crate::ledger::StatsLedger;
use crate::lifecycle::guard::{Claim, IdempotencyGuard};
use crate::lifecycle::recurrence::{Outcome, RecurrenceResetter};
use crate::notify::ChangeNotifier;
use crate::store::{Cas, StatsStore, StoreError, TaskStore};

/// An overdue task that was reset or deleted by this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub task_id: TaskId,
    /// Member penalized, or `None` for unassigned tasks and recovered
    /// finalizations.
    pub penalized: Option<UserId>,
    /// `true` if the task was reset, `false` if it was deleted.
    pub reset: bool,
}

/// A task whose overdue processing failed. Other tasks are unaffected.
#[derive(Debug)]
pub struct ScanFailure {
    pub task_id: TaskId,
    pub error: StoreError,
}

/// Everything one scan did.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub processed: Vec<Processed>,
    pub failures: Vec<ScanFailure>,
}

/// Sweeps a task set for expired active tasks.
pub struct OverdueScanner<T: TaskStore, S: StatsStore> {
    tasks: Arc<T>,
    guard: IdempotencyGuard<T>,
    ledger: StatsLedger<S>,
    notifier: Arc<dyn ChangeNotifier>,
    timeout: Duration,
}

impl<T: TaskStore, S: StatsStore> OverdueScanner<T, S> {
    #[must_use]
    pub fn new(
        tasks: Arc<T>,
        ledger: StatsLedger<S>,
        notifier: Arc<dyn ChangeNotifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            guard: IdempotencyGuard::new(Arc::clone(&tasks), timeout),
            tasks,
            ledger,
            notifier,
            timeout,
        }
    }

    /// Processes every expired active task in `tasks`.
    ///
    /// A failure on one task is recorded and the scan continues.
    pub async fn scan(&self, tasks: &[Task], now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport::default();
        for task in tasks {
            match self.handle_one(task, now).await {
                Ok(Some(processed)) => report.processed.push(processed),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        task_id = %task.id,
                        group_id = %task.group_id,
                        error = %error,
                        "overdue processing failed, will retry on next pass"
                    );
                    report.failures.push(ScanFailure {
                        task_id: task.id.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    /// Processes one task if it is active and expired.
    ///
    /// Returns `None` if nothing was done: the task is not overdue, another
    /// writer got there first, or it disappeared.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the claim, the penalty, or the final write
    /// failed. A rejected penalty leaves the marker unset; a timed-out one
    /// leaves it set.
    pub async fn handle_one(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<Option<Processed>, StoreError> {
        let deadline = resolve_deadline(task.created_at, task.deadline, task.days_remaining);
        if !is_overdue(deadline, task.completed, now) {
            return Ok(None);
        }

        if task.overdue_processed {
            tracing::info!(
                task_id = %task.id,
                "finishing overdue task whose penalty was already applied"
            );
            return self.finalize(task, None, now).await;
        }

        let claimed = match self.guard.mark_processed(task).await? {
            Claim::Claimed(claimed) => claimed,
            Claim::AlreadyHandled | Claim::Gone => {
                tracing::debug!(task_id = %task.id, "overdue task handled elsewhere, skipping");
                return Ok(None);
            }
        };

        let penalized = match claimed.assignee() {
            Some(assignee) => {
                if let Err(err) = self
                    .ledger
                    .penalize(&claimed.group_id, assignee, 1, -claimed.stars())
                    .await
                {
                    if err.is_indeterminate() {
                        // The delta may have landed; keep the claim so the
                        // next pass finalizes without penalizing again.
                        tracing::warn!(
                            task_id = %claimed.id,
                            user_id = %assignee,
                            error = %err,
                            "overdue penalty outcome unknown, claim kept"
                        );
                    } else {
                        self.release(&claimed).await;
                    }
                    return Err(err);
                }
                tracing::info!(
                    task_id = %claimed.id,
                    user_id = %assignee,
                    stars = -claimed.stars(),
                    "overdue penalty applied"
                );
                Some(assignee.clone())
            }
            None => {
                tracing::debug!(task_id = %claimed.id, "overdue task is unassigned, no penalty");
                None
            }
        };

        self.finalize(&claimed, penalized, now).await
    }

    async fn release(&self, claimed: &Task) {
        match self.guard.release(claimed).await {
            Ok(true) => {}
            Ok(false) => tracing::error!(
                task_id = %claimed.id,
                "overdue penalty failed and the task changed meanwhile; penalty skipped"
            ),
            Err(err) => tracing::error!(
                task_id = %claimed.id,
                error = %err,
                "overdue penalty failed and the claim could not be released"
            ),
        }
    }

    async fn finalize(
        &self,
        task: &Task,
        penalized: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Option<Processed>, StoreError> {
        let outcome = RecurrenceResetter::apply(task, now);
        let committed =
            RecurrenceResetter::commit(self.tasks.as_ref(), self.timeout, outcome, task.version)
                .await?;

        let Cas::Applied(outcome) = committed else {
            tracing::debug!(task_id = %task.id, "task changed before overdue reset, skipping");
            return Ok(None);
        };

        let reset = matches!(outcome, Outcome::Reset(_));
        let event = if reset {
            tracing::info!(task_id = %task.id, "overdue recurring task reset");
            ChangeEvent::TaskChanged {
                group_id: task.group_id.clone(),
                task_id: task.id.clone(),
            }
        } else {
            tracing::info!(task_id = %task.id, "overdue task deleted");
            ChangeEvent::TaskDeleted {
                group_id: task.group_id.clone(),
                task_id: task.id.clone(),
            }
        };
        self.notifier.publish(event);

        Ok(Some(Processed {
            task_id: task.id.clone(),
            penalized,
            reset,
        }))
    }
}
