//! Durable idempotency marker for overdue processing.
//!
//! The marker is the task's own `overdue_processed` flag, flipped with a
//! version-checked write. Two scanners racing on the same task both read the
//! same version, so only one of them can win the claim; the loser never
//! reaches the penalty.

use std::sync::Arc;
use std::time::Duration;

use choreboard_proto::task::Task;

use crate::store::{Cas, StoreError, TaskStore, bounded};

/// Result of trying to claim a task for overdue processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// This caller owns the overdue transition. Carries the stored record
    /// with the marker set.
    Claimed(Task),
    /// The marker was already set, or another writer changed the task first.
    AlreadyHandled,
    /// The task no longer exists.
    Gone,
}

/// Claims and releases the overdue marker on stored tasks.
pub struct IdempotencyGuard<T: TaskStore> {
    tasks: Arc<T>,
    timeout: Duration,
}

impl<T: TaskStore> Clone for IdempotencyGuard<T> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            timeout: self.timeout,
        }
    }
}

impl<T: TaskStore> IdempotencyGuard<T> {
    #[must_use]
    pub const fn new(tasks: Arc<T>, timeout: Duration) -> Self {
        Self { tasks, timeout }
    }

    /// Sets the marker if, and only if, the stored task is still the revision
    /// in `task` and the marker is unset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store could not be reached. No marker
    /// was set in that case.
    pub async fn mark_processed(&self, task: &Task) -> Result<Claim, StoreError> {
        if !should_process(task) {
            return Ok(Claim::AlreadyHandled);
        }
        let mut marked = task.clone();
        marked.overdue_processed = true;
        Ok(
            match bounded(self.timeout, self.tasks.update_if_version(&marked)).await? {
                Cas::Applied(stored) => Claim::Claimed(stored),
                Cas::Stale => Claim::AlreadyHandled,
                Cas::Missing => Claim::Gone,
            },
        )
    }

    /// Undoes a claim whose penalty could not be applied, so that a later
    /// pass can try again.
    ///
    /// Returns `false` if the task changed after the claim; the marker is
    /// then left as the newer writer set it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store could not be reached.
    pub async fn release(&self, claimed: &Task) -> Result<bool, StoreError> {
        let mut released = claimed.clone();
        clear(&mut released);
        let result = bounded(self.timeout, self.tasks.update_if_version(&released)).await?;
        Ok(result.is_applied())
    }
}

/// Cheap pre-check on a loaded record. A `true` answer is only advisory;
/// [`IdempotencyGuard::mark_processed`] makes the binding decision.
#[must_use]
pub const fn should_process(task: &Task) -> bool {
    !task.overdue_processed
}

/// Clears the marker on a record about to re-enter the active state.
pub const fn clear(task: &mut Task) {
    task.overdue_processed = false;
}
