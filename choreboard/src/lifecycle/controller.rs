//! Top-level orchestration of the task lifecycle.
//!
//! [`TaskLifecycleController`] is cheap to clone; every clone drives the same
//! stores, deferred jobs, and pending-sync queue. Triggers (timer, change
//! notifications, manual refresh) all funnel into
//! [`reconcile`](TaskLifecycleController::reconcile), which is safe to run
//! concurrently with itself and with the mutating operations: every task
//! write is version-checked and every counter change is an atomic delta.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use choreboard_proto::event::ChangeEvent;
use choreboard_proto::task::{
    GroupId, MAX_DIFFICULTY, MIN_DIFFICULTY, SyncStatus, Task, TaskId, UserId,
};
use chrono::{DateTime, TimeDelta, Utc};

use super::Trigger;
use super::guard;
use super::jobs::DeferredJobs;
use super::pending::PendingSync;
use super::recurrence::{Outcome, RecurrenceResetter};
use super::scanner::{OverdueScanner, Processed};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::deadline::{original_duration_days, parse_deadline, resolve_deadline};
use crate::directory::{
    MemberDirectory, MemberStanding, TaskSort, TaskView, leaderboard, sort_views, task_views,
};
use crate::error::{LifecycleError, ValidationError};
use crate::ledger::StatsLedger;
use crate::notify::ChangeNotifier;
use crate::store::{Cas, StatsStore, TaskStore, bounded};

/// Caller input for [`create`](TaskLifecycleController::create) and
/// [`edit`](TaskLifecycleController::edit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub difficulty: u8,
    pub assigned_to: Option<UserId>,
    pub recurring: bool,
    /// `YYYY-MM-DD`, in the configured UTC offset.
    pub deadline_date: String,
    /// `HH:MM`, in the configured UTC offset.
    pub deadline_time: String,
}

/// A per-task failure during reconcile. Other tasks were still processed.
#[derive(Debug)]
pub struct ReconcileFailure {
    pub task_id: TaskId,
    pub error: LifecycleError,
}

/// Result of one reconcile pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// The group's tasks after the pass, de-duplicated by id. Records still
    /// waiting to be persisted are included and flagged
    /// [`SyncStatus::PendingSync`].
    pub tasks: Vec<Task>,
    /// Overdue tasks reset or deleted by this pass.
    pub processed: Vec<Processed>,
    /// Completed tasks whose grace delay had run out without a pending job.
    pub finalized: Vec<TaskId>,
    /// Queued writes persisted at the start of the pass.
    pub synced: usize,
    pub failures: Vec<ReconcileFailure>,
}

struct Validated {
    name: String,
    deadline: DateTime<Utc>,
    duration_days: u32,
}

struct Inner<T: TaskStore, S: StatsStore> {
    tasks: Arc<T>,
    ledger: StatsLedger<S>,
    scanner: OverdueScanner<T, S>,
    jobs: DeferredJobs,
    pending: PendingSync,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

/// Create, edit, delete, complete, and reconcile tasks.
pub struct TaskLifecycleController<T: TaskStore, S: StatsStore> {
    inner: Arc<Inner<T, S>>,
}

impl<T: TaskStore, S: StatsStore> Clone for TaskLifecycleController<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TaskStore + 'static, S: StatsStore + 'static> TaskLifecycleController<T, S> {
    /// Builds a controller over the given collaborators.
    #[must_use]
    pub fn new(
        tasks: Arc<T>,
        stats: Arc<S>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn ChangeNotifier>,
        config: EngineConfig,
    ) -> Self {
        let ledger = StatsLedger::new(stats, Arc::clone(&notifier), config.storage_timeout);
        let scanner = OverdueScanner::new(
            Arc::clone(&tasks),
            ledger.clone(),
            Arc::clone(&notifier),
            config.storage_timeout,
        );
        Self {
            inner: Arc::new(Inner {
                tasks,
                ledger,
                scanner,
                jobs: DeferredJobs::new(),
                pending: PendingSync::new(),
                notifier,
                clock,
                config,
            }),
        }
    }

    /// Engine configuration in effect.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The notifier this controller publishes to.
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn ChangeNotifier> {
        Arc::clone(&self.inner.notifier)
    }

    /// Returns `true` if a grace-delay job is waiting for `task_id`.
    #[must_use]
    pub fn has_pending_job(&self, task_id: &TaskId) -> bool {
        self.inner.jobs.is_pending(task_id)
    }

    /// Number of task writes waiting to be persisted.
    #[must_use]
    pub fn pending_sync_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Validates `draft` and stores a new active task.
    ///
    /// If the store is unavailable the task is returned flagged
    /// [`SyncStatus::PendingSync`] and retried on the next reconcile.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for bad input; nothing is
    /// stored or queued in that case.
    pub async fn create(
        &self,
        group: &GroupId,
        created_by: &UserId,
        draft: TaskDraft,
    ) -> Result<Task, LifecycleError> {
        let now = self.inner.clock.now();
        let valid = validate(&draft, now, self.inner.config.utc_offset_minutes)?;
        let task = Task {
            id: TaskId::new(),
            group_id: group.clone(),
            name: valid.name,
            difficulty: draft.difficulty,
            created_by: created_by.clone(),
            assigned_to: draft.assigned_to,
            completed: false,
            recurring: draft.recurring,
            created_at: now,
            deadline: Some(valid.deadline),
            days_remaining: valid.duration_days,
            original_duration_days: valid.duration_days,
            overdue_processed: false,
            completed_at: None,
            completed_by: None,
            version: 0,
            sync: SyncStatus::Synced,
        };

        match bounded(self.inner.config.storage_timeout, self.inner.tasks.upsert(&task)).await {
            Ok(stored) => {
                tracing::info!(
                    task_id = %stored.id,
                    group_id = %group,
                    deadline = %valid.deadline,
                    "task created"
                );
                self.publish_changed(&stored);
                Ok(stored)
            }
            Err(err) => {
                tracing::warn!(
                    task_id = %task.id,
                    group_id = %group,
                    error = %err,
                    "task create not persisted, queued for retry"
                );
                Ok(self.queue(task))
            }
        }
    }

    /// Replaces a task's editable fields and recomputes its durations.
    ///
    /// Any pending grace-delay job for the task is cancelled and the overdue
    /// marker is cleared. The completion state is left as it is.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for bad input,
    /// [`LifecycleError::NotFound`] if the task does not exist, and
    /// [`LifecycleError::Conflict`] if concurrent writers kept winning.
    pub async fn edit(&self, task_id: &TaskId, draft: TaskDraft) -> Result<Task, LifecycleError> {
        let now = self.inner.clock.now();
        let valid = validate(&draft, now, self.inner.config.utc_offset_minutes)?;
        let timeout = self.inner.config.storage_timeout;

        for _ in 0..self.attempts() {
            let loaded = bounded(timeout, self.inner.tasks.get(task_id)).await;
            let current = match loaded {
                Ok(Some(task)) => task,
                other => {
                    if let Some(queued) = self.inner.pending.get(task_id) {
                        return Ok(self.queue(apply_edit(queued, &draft, &valid)));
                    }
                    other?;
                    return Err(not_found(task_id));
                }
            };

            self.inner.jobs.cancel(task_id);
            let updated = apply_edit(current, &draft, &valid);
            match bounded(timeout, self.inner.tasks.update_if_version(&updated)).await {
                Ok(Cas::Applied(stored)) => {
                    self.inner.pending.remove(task_id);
                    tracing::info!(task_id = %task_id, deadline = %valid.deadline, "task edited");
                    self.publish_changed(&stored);
                    return Ok(stored);
                }
                Ok(Cas::Stale) => {}
                Ok(Cas::Missing) => return Err(not_found(task_id)),
                Err(err) => {
                    tracing::warn!(
                        task_id = %task_id,
                        error = %err,
                        "task edit not persisted, queued for retry"
                    );
                    return Ok(self.queue(updated));
                }
            }
        }
        Err(LifecycleError::Conflict(task_id.clone()))
    }

    /// Deletes a task. Deleting a task that does not exist succeeds.
    ///
    /// If the task was completed, the credit given for it is reversed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StorageUnavailable`] if the store failed,
    /// and [`LifecycleError::Conflict`] if concurrent writers kept winning.
    pub async fn delete(&self, task_id: &TaskId) -> Result<(), LifecycleError> {
        let timeout = self.inner.config.storage_timeout;
        self.inner.jobs.cancel(task_id);
        self.inner.pending.remove(task_id);

        for _ in 0..self.attempts() {
            let Some(task) = bounded(timeout, self.inner.tasks.get(task_id)).await? else {
                tracing::debug!(task_id = %task_id, "delete of missing task, nothing to do");
                return Ok(());
            };
            match bounded(
                timeout,
                self.inner.tasks.delete_if_version(task_id, task.version),
            )
            .await?
            {
                Cas::Applied(()) => {
                    tracing::info!(task_id = %task_id, group_id = %task.group_id, "task deleted");
                    self.publish_deleted(&task);
                    if task.completed {
                        self.reverse_credit(&task).await;
                    }
                    return Ok(());
                }
                Cas::Stale => {}
                Cas::Missing => return Ok(()),
            }
        }
        Err(LifecycleError::Conflict(task_id.clone()))
    }

    /// Flips a task between active and completed on behalf of `acting_user`.
    ///
    /// Completing credits the assignee (or `acting_user` for unassigned
    /// tasks) and schedules the reset or deletion after the grace delay.
    /// Reopening a completed task does not reverse that credit.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Forbidden`] if the task is assigned to
    /// someone else, [`LifecycleError::NotFound`] if it does not exist,
    /// [`LifecycleError::Conflict`] if it is being processed as overdue or
    /// concurrent writers kept winning, and
    /// [`LifecycleError::StorageUnavailable`] if the store failed (the task
    /// is then left as it was). A credit that timed out keeps the completion.
    pub async fn toggle_completion(
        &self,
        task_id: &TaskId,
        acting_user: &UserId,
    ) -> Result<Task, LifecycleError> {
        for _ in 0..self.attempts() {
            let task = self.load(task_id).await?;
            if !task.can_be_toggled_by(acting_user) {
                tracing::debug!(
                    task_id = %task_id,
                    user_id = %acting_user,
                    "completion toggle by non-assignee refused"
                );
                return Err(LifecycleError::Forbidden {
                    task_id: task_id.clone(),
                    acting_user: acting_user.clone(),
                });
            }

            let toggled = if task.completed {
                self.try_reopen(&task).await?
            } else {
                self.try_complete(&task, acting_user).await?
            };
            if let Some(stored) = toggled {
                return Ok(stored);
            }
        }
        Err(LifecycleError::Conflict(task_id.clone()))
    }

    /// Runs a full pass over `group`: retries queued writes, persists
    /// derived deadlines, processes overdue tasks, finalizes completed
    /// tasks whose grace delay ran out, and returns the refreshed task list.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StorageUnavailable`] if the group's tasks
    /// could not be listed. Per-task failures are collected in the report.
    pub async fn reconcile(
        &self,
        group: &GroupId,
        trigger: Trigger,
    ) -> Result<ReconcileReport, LifecycleError> {
        let timeout = self.inner.config.storage_timeout;
        let mut report = ReconcileReport::default();

        let flushed = self
            .inner
            .pending
            .flush(self.inner.tasks.as_ref(), group, timeout)
            .await;
        for task in &flushed.synced {
            self.publish_changed(task);
        }
        report.synced = flushed.synced.len();

        let now = self.inner.clock.now();
        let listed = dedupe_by_id(bounded(timeout, self.inner.tasks.list_by_group(group)).await?);
        let mut tasks = Vec::with_capacity(listed.len());
        for task in listed {
            tasks.push(self.ensure_deadline(task, &mut report.failures).await);
        }

        let scan = self.inner.scanner.scan(&tasks, now).await;
        report.processed = scan.processed;
        report
            .failures
            .extend(scan.failures.into_iter().map(|failure| ReconcileFailure {
                task_id: failure.task_id,
                error: failure.error.into(),
            }));

        for task in tasks.iter().filter(|t| self.grace_expired(t, now)) {
            match self.finalize_completed(&task.id, task.version).await {
                Ok(Some(_)) => report.finalized.push(task.id.clone()),
                Ok(None) => {}
                Err(error) => report.failures.push(ReconcileFailure {
                    task_id: task.id.clone(),
                    error,
                }),
            }
        }

        let mut refreshed =
            dedupe_by_id(bounded(timeout, self.inner.tasks.list_by_group(group)).await?);
        let stored: HashSet<TaskId> = refreshed.iter().map(|t| t.id.clone()).collect();
        refreshed.extend(
            self.inner
                .pending
                .pending_for(group)
                .into_iter()
                .filter(|t| !stored.contains(&t.id)),
        );
        report.tasks = refreshed;

        tracing::info!(
            group_id = %group,
            trigger = %trigger,
            tasks = report.tasks.len(),
            processed = report.processed.len(),
            finalized = report.finalized.len(),
            synced = report.synced,
            failures = report.failures.len(),
            "reconcile finished"
        );
        Ok(report)
    }

    /// Manual refresh: a reconcile pass tagged [`Trigger::Manual`].
    ///
    /// # Errors
    ///
    /// Same as [`reconcile`](Self::reconcile).
    pub async fn refresh(&self, group: &GroupId) -> Result<ReconcileReport, LifecycleError> {
        self.reconcile(group, Trigger::Manual).await
    }

    /// Display rows for `tasks`, ordered by `order`.
    #[must_use]
    pub fn views(
        &self,
        tasks: &[Task],
        directory: &dyn MemberDirectory,
        order: TaskSort,
    ) -> Vec<TaskView> {
        let mut views = task_views(tasks, self.inner.clock.now(), directory);
        sort_views(&mut views, order);
        views
    }

    /// Member standings of `group`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StorageUnavailable`] if the stats could not
    /// be read.
    pub async fn leaderboard(
        &self,
        group: &GroupId,
        directory: &dyn MemberDirectory,
    ) -> Result<Vec<MemberStanding>, LifecycleError> {
        let rows = self.inner.ledger.standings(group).await?;
        Ok(leaderboard(&rows, directory))
    }

    /// Aborts every pending grace-delay job. Completed tasks left behind are
    /// finalized by a later reconcile.
    pub fn shutdown(&self) {
        self.inner.jobs.cancel_all();
        tracing::info!("lifecycle controller shut down");
    }

    /// Resets or deletes a completed task, provided it is still completed and
    /// still at `version`. Returns `None` if it changed or disappeared.
    async fn finalize_completed(
        &self,
        task_id: &TaskId,
        version: u64,
    ) -> Result<Option<Outcome>, LifecycleError> {
        let timeout = self.inner.config.storage_timeout;
        let Some(task) = bounded(timeout, self.inner.tasks.get(task_id)).await? else {
            tracing::debug!(task_id = %task_id, "completed task gone before reset");
            return Ok(None);
        };
        if task.version != version || !task.completed {
            tracing::debug!(
                task_id = %task_id,
                scheduled = version,
                current = task.version,
                "task changed since completion, skipping reset"
            );
            return Ok(None);
        }

        let anchor = task.completed_at.unwrap_or_else(|| self.inner.clock.now());
        let outcome = RecurrenceResetter::apply(&task, anchor);
        let Cas::Applied(outcome) =
            RecurrenceResetter::commit(self.inner.tasks.as_ref(), timeout, outcome, version)
                .await?
        else {
            return Ok(None);
        };

        match &outcome {
            Outcome::Reset(stored) => {
                tracing::info!(
                    task_id = %task_id,
                    deadline = ?stored.deadline,
                    "completed recurring task reset"
                );
                self.publish_changed(stored);
            }
            Outcome::Delete(_) => {
                tracing::info!(task_id = %task_id, "completed task removed");
                self.publish_deleted(&task);
            }
        }
        Ok(Some(outcome))
    }

    async fn try_complete(
        &self,
        task: &Task,
        acting_user: &UserId,
    ) -> Result<Option<Task>, LifecycleError> {
        if task.overdue_processed {
            // The overdue pass owns this task until it resets or deletes it.
            return Err(LifecycleError::Conflict(task.id.clone()));
        }

        let credited = task
            .assigned_to
            .clone()
            .unwrap_or_else(|| acting_user.clone());
        let mut completed = task.clone();
        completed.completed = true;
        completed.completed_at = Some(self.inner.clock.now());
        completed.completed_by = Some(credited.clone());
        guard::clear(&mut completed);

        let timeout = self.inner.config.storage_timeout;
        let stored = match bounded(timeout, self.inner.tasks.update_if_version(&completed)).await? {
            Cas::Applied(stored) => stored,
            Cas::Stale => return Ok(None),
            Cas::Missing => return Err(not_found(&task.id)),
        };

        if let Err(err) = self
            .inner
            .ledger
            .credit(&stored.group_id, &credited, stored.stars(), 1)
            .await
        {
            if !err.is_indeterminate() {
                tracing::warn!(task_id = %stored.id, error = %err, "completion credit failed, reverting");
                self.revert_completion(task, &stored).await;
                return Err(err.into());
            }
            // Reverting would let a retry credit the member a second time.
            tracing::warn!(
                task_id = %stored.id,
                user_id = %credited,
                error = %err,
                "completion credit outcome unknown, completion kept"
            );
        }

        tracing::info!(
            task_id = %stored.id,
            user_id = %credited,
            stars = stored.stars(),
            "task completed"
        );
        self.publish_changed(&stored);
        self.schedule_finalize(&stored);
        Ok(Some(stored))
    }

    async fn try_reopen(&self, task: &Task) -> Result<Option<Task>, LifecycleError> {
        let mut reopened = task.clone();
        reopened.completed = false;
        reopened.completed_at = None;
        reopened.completed_by = None;
        guard::clear(&mut reopened);

        let timeout = self.inner.config.storage_timeout;
        match bounded(timeout, self.inner.tasks.update_if_version(&reopened)).await? {
            Cas::Applied(stored) => {
                self.inner.jobs.cancel(&stored.id);
                tracing::info!(task_id = %stored.id, "task reopened, earlier credit kept");
                self.publish_changed(&stored);
                Ok(Some(stored))
            }
            Cas::Stale => Ok(None),
            Cas::Missing => Err(not_found(&task.id)),
        }
    }

    async fn revert_completion(&self, original: &Task, stored: &Task) {
        let mut reverted = original.clone();
        reverted.version = stored.version;
        let timeout = self.inner.config.storage_timeout;
        match bounded(timeout, self.inner.tasks.update_if_version(&reverted)).await {
            Ok(Cas::Applied(_)) => {}
            Ok(_) => tracing::error!(
                task_id = %original.id,
                "task changed before completion could be reverted; it stays completed without credit"
            ),
            Err(err) => tracing::error!(
                task_id = %original.id,
                error = %err,
                "completion could not be reverted; it stays completed without credit"
            ),
        }
    }

    async fn reverse_credit(&self, task: &Task) {
        let Some(user) = task.completed_by.as_ref().or(task.assigned_to.as_ref()) else {
            tracing::warn!(task_id = %task.id, "deleted completed task has no credited member");
            return;
        };
        if let Err(err) = self
            .inner
            .ledger
            .credit(&task.group_id, user, -task.stars(), -1)
            .await
        {
            tracing::error!(
                task_id = %task.id,
                user_id = %user,
                error = %err,
                "stats reversal failed after delete"
            );
        }
    }

    fn schedule_finalize(&self, stored: &Task) {
        let weak: Weak<Inner<T, S>> = Arc::downgrade(&self.inner);
        let task_id = stored.id.clone();
        let version = stored.version;
        let job_id = task_id.clone();
        self.inner.jobs.schedule(
            task_id,
            version,
            self.inner.config.grace_delay,
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let controller = TaskLifecycleController { inner };
                if let Err(err) = controller.finalize_completed(&job_id, version).await {
                    tracing::warn!(
                        task_id = %job_id,
                        error = %err,
                        "deferred reset failed, next reconcile will retry"
                    );
                }
            },
        );
    }

    async fn ensure_deadline(&self, task: Task, failures: &mut Vec<ReconcileFailure>) -> Task {
        if task.deadline.is_some() {
            return task;
        }
        let mut resolved = task;
        resolved.deadline = Some(resolve_deadline(
            resolved.created_at,
            None,
            resolved.days_remaining,
        ));

        let timeout = self.inner.config.storage_timeout;
        match bounded(timeout, self.inner.tasks.update_if_version(&resolved)).await {
            Ok(Cas::Applied(stored)) => {
                tracing::debug!(task_id = %stored.id, deadline = ?stored.deadline, "derived deadline persisted");
                stored
            }
            Ok(Cas::Stale | Cas::Missing) => resolved,
            Err(err) => {
                tracing::warn!(task_id = %resolved.id, error = %err, "derived deadline not persisted");
                failures.push(ReconcileFailure {
                    task_id: resolved.id.clone(),
                    error: err.into(),
                });
                resolved
            }
        }
    }

    fn grace_expired(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if !task.completed || self.inner.jobs.is_pending(&task.id) {
            return false;
        }
        let grace = TimeDelta::from_std(self.inner.config.grace_delay).unwrap_or(TimeDelta::MAX);
        task.completed_at
            .is_none_or(|at| at.checked_add_signed(grace).is_some_and(|due| due <= now))
    }

    async fn load(&self, task_id: &TaskId) -> Result<Task, LifecycleError> {
        bounded(
            self.inner.config.storage_timeout,
            self.inner.tasks.get(task_id),
        )
        .await?
        .ok_or_else(|| not_found(task_id))
    }

    fn queue(&self, mut task: Task) -> Task {
        task.sync = SyncStatus::PendingSync;
        self.inner.pending.enqueue(task.clone());
        task
    }

    fn attempts(&self) -> u32 {
        self.inner.config.conflict_retries.max(1)
    }

    fn publish_changed(&self, task: &Task) {
        self.inner.notifier.publish(ChangeEvent::TaskChanged {
            group_id: task.group_id.clone(),
            task_id: task.id.clone(),
        });
    }

    fn publish_deleted(&self, task: &Task) {
        self.inner.notifier.publish(ChangeEvent::TaskDeleted {
            group_id: task.group_id.clone(),
            task_id: task.id.clone(),
        });
    }
}

fn validate(
    draft: &TaskDraft,
    now: DateTime<Utc>,
    utc_offset_minutes: i32,
) -> Result<Validated, ValidationError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&draft.difficulty) {
        return Err(ValidationError::DifficultyOutOfRange(draft.difficulty));
    }
    let deadline = parse_deadline(&draft.deadline_date, &draft.deadline_time, utc_offset_minutes)?;
    if deadline <= now {
        return Err(ValidationError::DeadlineNotInFuture);
    }
    Ok(Validated {
        name: name.to_string(),
        deadline,
        duration_days: original_duration_days(deadline, now),
    })
}

fn apply_edit(mut task: Task, draft: &TaskDraft, valid: &Validated) -> Task {
    task.name.clone_from(&valid.name);
    task.difficulty = draft.difficulty;
    task.assigned_to.clone_from(&draft.assigned_to);
    task.recurring = draft.recurring;
    task.deadline = Some(valid.deadline);
    task.days_remaining = valid.duration_days;
    task.original_duration_days = valid.duration_days;
    guard::clear(&mut task);
    task
}

/// Keeps the first row for each id.
fn dedupe_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect()
}

fn not_found(task_id: &TaskId) -> LifecycleError {
    LifecycleError::NotFound(format!("task {task_id}"))
}
