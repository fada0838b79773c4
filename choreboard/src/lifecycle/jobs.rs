//! Grace-delay jobs keyed by task id and version.
//!
//! A job only carries the key. Whatever it runs must reload the task and
//! compare versions before acting, so a job that outlives its task, or a
//! task that was edited after scheduling, turns into a no-op.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use choreboard_proto::task::TaskId;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct Job {
    version: u64,
    handle: JoinHandle<()>,
}

/// Pending deferred transitions, at most one per task.
#[derive(Default)]
pub struct DeferredJobs {
    jobs: Arc<Mutex<HashMap<TaskId, Job>>>,
}

impl DeferredJobs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `action` after `delay`, replacing any job already pending for
    /// `task_id`.
    pub fn schedule<F>(&self, task_id: TaskId, version: u64, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let jobs = Arc::clone(&self.jobs);
        let key = task_id.clone();

        // Held across the spawn so the job cannot remove its entry before
        // it has been inserted.
        let mut pending = self.jobs.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
            let mut pending = jobs.lock();
            if pending.get(&key).is_some_and(|job| job.version == version) {
                pending.remove(&key);
            }
        });
        if let Some(previous) = pending.insert(task_id.clone(), Job { version, handle }) {
            previous.handle.abort();
        }
        drop(pending);
        tracing::debug!(task_id = %task_id, version, ?delay, "deferred job scheduled");
    }

    /// Cancels the pending job for `task_id`. Returns `true` if one existed.
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        let removed = self.jobs.lock().remove(task_id);
        removed.is_some_and(|job| {
            job.handle.abort();
            tracing::debug!(task_id = %task_id, version = job.version, "deferred job cancelled");
            true
        })
    }

    /// Returns `true` if a job for `task_id` has not run yet.
    #[must_use]
    pub fn is_pending(&self, task_id: &TaskId) -> bool {
        self.jobs
            .lock()
            .get(task_id)
            .is_some_and(|job| !job.handle.is_finished())
    }

    /// Number of jobs that have not run yet.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.jobs
            .lock()
            .values()
            .filter(|job| !job.handle.is_finished())
            .count()
    }

    /// Aborts every pending job.
    pub fn cancel_all(&self) {
        let drained: Vec<Job> = self.jobs.lock().drain().map(|(_, job)| job).collect();
        for job in &drained {
            job.handle.abort();
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "deferred jobs cancelled");
        }
    }
}

impl Drop for DeferredJobs {
    fn drop(&mut self) {
        for (_, job) in self.jobs.lock().drain() {
            job.handle.abort();
        }
    }
}
