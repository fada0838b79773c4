//! Local queue of task writes that could not be persisted.
//!
//! Queued records are flagged [`SyncStatus::PendingSync`] and are retried at
//! the start of every reconcile pass for their group.

use std::collections::HashMap;
use std::time::Duration;

use choreboard_proto::task::{GroupId, SyncStatus, Task, TaskId};
use parking_lot::Mutex;

use crate::store::{Cas, TaskStore, bounded};

/// Result of one flush.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Records now stored, as the store returned them.
    pub synced: Vec<Task>,
    /// Queued edits dropped because the stored row changed or disappeared.
    pub dropped: Vec<TaskId>,
    /// Records still queued after this flush.
    pub remaining: usize,
}

/// Unsynced task records, at most one per task id.
#[derive(Debug, Default)]
pub struct PendingSync {
    queue: Mutex<HashMap<TaskId, Task>>,
}

impl PendingSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task`, replacing any earlier record for the same id.
    pub fn enqueue(&self, mut task: Task) {
        task.sync = SyncStatus::PendingSync;
        self.queue.lock().insert(task.id.clone(), task);
    }

    /// The queued record for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.queue.lock().get(id).cloned()
    }

    /// Drops the queued record for `id`. Returns `true` if one existed.
    pub fn remove(&self, id: &TaskId) -> bool {
        self.queue.lock().remove(id).is_some()
    }

    /// Queued records of one group.
    #[must_use]
    pub fn pending_for(&self, group: &GroupId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .queue
            .lock()
            .values()
            .filter(|t| &t.group_id == group)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    /// Number of queued records across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Retries every queued record of `group`.
    ///
    /// Records that were never stored (version 0) are inserted. Queued edits
    /// are written with a version check and dropped if the stored row moved
    /// on. Records that fail again stay queued.
    pub async fn flush<T: TaskStore>(
        &self,
        tasks: &T,
        group: &GroupId,
        timeout: Duration,
    ) -> FlushReport {
        let batch: Vec<Task> = {
            let mut queue = self.queue.lock();
            let ids: Vec<TaskId> = queue
                .values()
                .filter(|t| &t.group_id == group)
                .map(|t| t.id.clone())
                .collect();
            ids.iter().filter_map(|id| queue.remove(id)).collect()
        };

        let mut report = FlushReport::default();
        for task in batch {
            let result = if task.version == 0 {
                bounded(timeout, tasks.upsert(&task)).await.map(Cas::Applied)
            } else {
                bounded(timeout, tasks.update_if_version(&task)).await
            };

            match result {
                Ok(Cas::Applied(stored)) => report.synced.push(stored),
                Ok(Cas::Stale | Cas::Missing) => {
                    tracing::warn!(
                        task_id = %task.id,
                        "queued edit superseded by a newer stored revision, dropping"
                    );
                    report.dropped.push(task.id);
                }
                Err(err) => {
                    tracing::debug!(task_id = %task.id, error = %err, "pending write still failing");
                    // A newer local edit may have been queued meanwhile.
                    self.queue.lock().entry(task.id.clone()).or_insert(task);
                }
            }
        }

        report.remaining = self.len();
        if !report.synced.is_empty() {
            tracing::info!(
                group_id = %group,
                synced = report.synced.len(),
                remaining = report.remaining,
                "flushed pending task writes"
            );
        }
        report
    }
}
