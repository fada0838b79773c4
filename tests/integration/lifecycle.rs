//! Integration tests for the task lifecycle: creation, completion, overdue
//! processing, recurring resets, pending-sync fallback, and triggers.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use choreboard::clock::{Clock, ManualClock};
use choreboard::directory::{StaticDirectory, TaskSort, UNASSIGNED};
use choreboard::notify::{BroadcastNotifier, ChangeNotifier};
use choreboard::store::memory::{InMemoryStatsStore, InMemoryTaskStore};
use choreboard::store::{Cas, StatsStore, StoreError, TaskStore};
use choreboard::triggers::{MIN_PERIODIC_INTERVAL, spawn_listener, spawn_periodic};
use choreboard::{
    EngineConfig, LifecycleError, TaskDraft, TaskLifecycleController, Trigger, ValidationError,
};
use choreboard_proto::event::ChangeEvent;
use choreboard_proto::stats::MemberStat;
use choreboard_proto::task::{GroupId, SyncStatus, Task, TaskId, UserId};
use chrono::{DateTime, TimeZone, Utc};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 10, 10, 0, 0).single().unwrap()
}

fn group() -> GroupId {
    GroupId::new("flat-7")
}

fn alice() -> UserId {
    UserId::new("alice")
}

fn bob() -> UserId {
    UserId::new("bob")
}

/// A draft due one day after [`start`].
fn draft(difficulty: u8, assigned_to: Option<UserId>, recurring: bool) -> TaskDraft {
    TaskDraft {
        name: "Take out the bins".to_string(),
        difficulty,
        assigned_to,
        recurring,
        deadline_date: "2026-04-11".to_string(),
        deadline_time: "10:00".to_string(),
    }
}

/// A stored-shaped task already past its deadline at [`start`].
fn overdue_task(assigned_to: Option<UserId>, recurring: bool) -> Task {
    let created = start() - chrono::Duration::days(3);
    Task {
        id: TaskId::new(),
        group_id: group(),
        name: "Mop the hallway".to_string(),
        difficulty: 3,
        created_by: alice(),
        assigned_to,
        completed: false,
        recurring,
        created_at: created,
        deadline: Some(created + chrono::Duration::days(2)),
        days_remaining: 2,
        original_duration_days: 2,
        overdue_processed: false,
        completed_at: None,
        completed_by: None,
        version: 0,
        sync: SyncStatus::Synced,
    }
}

struct Harness<T: TaskStore> {
    controller: TaskLifecycleController<T, InMemoryStatsStore>,
    tasks: Arc<T>,
    stats: Arc<InMemoryStatsStore>,
    clock: ManualClock,
}

impl<T: TaskStore + 'static> Harness<T> {
    fn over(tasks: T) -> Self {
        Self::configured(tasks, EngineConfig::default())
    }

    fn configured(tasks: T, config: EngineConfig) -> Self {
        let tasks = Arc::new(tasks);
        let stats = Arc::new(InMemoryStatsStore::new());
        let clock = ManualClock::new(start());
        let notifier: Arc<dyn ChangeNotifier> = Arc::new(BroadcastNotifier::new(64));
        let controller = TaskLifecycleController::new(
            Arc::clone(&tasks),
            Arc::clone(&stats),
            Arc::new(clock.clone()),
            notifier,
            config,
        );
        Self {
            controller,
            tasks,
            stats,
            clock,
        }
    }

    async fn stat(&self, user: &UserId) -> MemberStat {
        StatsStore::get(self.stats.as_ref(), &group(), user)
            .await
            .unwrap()
            .unwrap_or_else(|| MemberStat::zero(group(), user.clone()))
    }

    async fn stored(&self, id: &TaskId) -> Option<Task> {
        TaskStore::get(self.tasks.as_ref(), id).await.unwrap()
    }
}

fn harness() -> Harness<InMemoryTaskStore> {
    Harness::over(InMemoryTaskStore::new())
}

/// A task store that can be switched off, fully or for writes only, to
/// simulate an outage.
struct SwitchableStore {
    inner: InMemoryTaskStore,
    down: AtomicBool,
    read_only: AtomicBool,
}

impl SwitchableStore {
    fn new() -> Self {
        Self {
            inner: InMemoryTaskStore::new(),
            down: AtomicBool::new(false),
            read_only: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.check()?;
        if self.read_only.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("write rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

impl TaskStore for SwitchableStore {
    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        self.inner.list_by_group(group).await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn upsert(&self, task: &Task) -> Result<Task, StoreError> {
        self.check_write()?;
        self.inner.upsert(task).await
    }

    async fn update_if_version(&self, task: &Task) -> Result<Cas<Task>, StoreError> {
        self.check_write()?;
        self.inner.update_if_version(task).await
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        self.check_write()?;
        self.inner.delete(id).await
    }

    async fn delete_if_version(&self, id: &TaskId, version: u64) -> Result<Cas<()>, StoreError> {
        self.check_write()?;
        self.inner.delete_if_version(id, version).await
    }
}

/// A task store whose listings return every row twice, as a racing reload can.
struct DuplicatingStore {
    inner: InMemoryTaskStore,
}

impl TaskStore for DuplicatingStore {
    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<Task>, StoreError> {
        let rows = self.inner.list_by_group(group).await?;
        Ok(rows.iter().chain(rows.iter()).cloned().collect())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.get(id).await
    }

    async fn upsert(&self, task: &Task) -> Result<Task, StoreError> {
        self.inner.upsert(task).await
    }

    async fn update_if_version(&self, task: &Task) -> Result<Cas<Task>, StoreError> {
        self.inner.update_if_version(task).await
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn delete_if_version(&self, id: &TaskId, version: u64) -> Result<Cas<()>, StoreError> {
        self.inner.delete_if_version(id, version).await
    }
}

/// A task store whose version-checked writes always lose, counting attempts.
struct AlwaysStaleStore {
    inner: InMemoryTaskStore,
    attempts: AtomicU32,
}

impl TaskStore for AlwaysStaleStore {
    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<Task>, StoreError> {
        self.inner.list_by_group(group).await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.get(id).await
    }

    async fn upsert(&self, task: &Task) -> Result<Task, StoreError> {
        self.inner.upsert(task).await
    }

    async fn update_if_version(&self, _task: &Task) -> Result<Cas<Task>, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Cas::Stale)
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn delete_if_version(&self, _id: &TaskId, _version: u64) -> Result<Cas<()>, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Cas::Stale)
    }
}

// ===========================================================================
// Overdue processing
// ===========================================================================

// --- recurring and one-off tasks ---

#[tokio::test]
async fn overdue_recurring_task_is_penalized_and_reset() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), true))
        .await
        .unwrap();
    assert_eq!(task.original_duration_days, 1);

    h.clock.advance(chrono::Duration::hours(25));
    let report = h.controller.reconcile(&group(), Trigger::Timer).await.unwrap();

    let reset = h.stored(&task.id).await.expect("recurring task survives");
    assert_eq!(reset.id, task.id);
    assert!(!reset.completed);
    assert!(!reset.overdue_processed);
    assert_eq!(reset.deadline, Some(h.clock.now() + chrono::Duration::days(1)));
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].penalized, Some(bob()));
    assert!(report.processed[0].reset);

    let stat = h.stat(&bob()).await;
    assert_eq!(stat.overdue_count, 1);
    assert_eq!(stat.completed_stars, -3);
    assert_eq!(stat.completed_count, 0);
}

#[tokio::test]
async fn overdue_one_off_task_is_penalized_and_deleted() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), false))
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::hours(25));
    let report = h.controller.reconcile(&group(), Trigger::Timer).await.unwrap();

    assert!(h.stored(&task.id).await.is_none());
    assert!(report.tasks.is_empty());
    let stat = h.stat(&bob()).await;
    assert_eq!(stat.overdue_count, 1);
    assert_eq!(stat.completed_stars, -3);
}

#[tokio::test]
async fn unassigned_overdue_task_is_reset_without_penalty() {
    let h = harness();
    let task = h.tasks.upsert(&overdue_task(None, true)).await.unwrap();

    let report = h.controller.refresh(&group()).await.unwrap();

    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].penalized, None);
    assert!(h.stored(&task.id).await.unwrap().deadline.unwrap() > h.clock.now());
    assert!(h.stats.snapshot().is_empty());
}

#[tokio::test]
async fn task_not_yet_due_is_left_alone() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(2, Some(bob()), false))
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::hours(23));
    let report = h.controller.refresh(&group()).await.unwrap();

    assert!(report.processed.is_empty());
    assert_eq!(h.stored(&task.id).await.unwrap(), task);
}

// --- idempotence ---

#[tokio::test]
async fn second_reconcile_without_time_advance_changes_nothing() {
    let h = harness();
    h.tasks.upsert(&overdue_task(Some(bob()), true)).await.unwrap();
    h.tasks.upsert(&overdue_task(Some(alice()), false)).await.unwrap();

    h.controller.refresh(&group()).await.unwrap();
    let tasks_after_first = h.tasks.snapshot();
    let stats_after_first = h.stats.snapshot();

    let report = h.controller.refresh(&group()).await.unwrap();
    assert!(report.processed.is_empty());
    assert_eq!(h.tasks.snapshot(), tasks_after_first);
    assert_eq!(h.stats.snapshot(), stats_after_first);
}

#[tokio::test]
async fn duplicate_rows_from_the_store_are_collapsed_and_penalized_once() {
    let h = Harness::over(DuplicatingStore {
        inner: InMemoryTaskStore::new(),
    });
    let task = h.tasks.upsert(&overdue_task(Some(bob()), true)).await.unwrap();

    let report = h.controller.refresh(&group()).await.unwrap();

    assert_eq!(report.tasks.len(), 1);
    assert_eq!(report.tasks[0].id, task.id);
    assert_eq!(report.processed.len(), 1);
    assert_eq!(h.stat(&bob()).await.overdue_count, 1);
}

#[tokio::test]
async fn marked_but_unreset_task_is_finalized_without_second_penalty() {
    let h = harness();
    let mut task = overdue_task(Some(bob()), true);
    task.overdue_processed = true;
    let stored = h.tasks.upsert(&task).await.unwrap();

    let report = h.controller.refresh(&group()).await.unwrap();

    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].penalized, None);
    let reset = h.stored(&stored.id).await.unwrap();
    assert!(!reset.overdue_processed);
    assert!(h.stats.snapshot().is_empty());
}

#[tokio::test]
async fn legacy_row_without_deadline_gets_one_persisted() {
    let h = harness();
    let mut legacy = overdue_task(Some(bob()), true);
    legacy.deadline = None;
    legacy.created_at = start();
    legacy.days_remaining = 4;
    let stored = h.tasks.upsert(&legacy).await.unwrap();

    h.controller.refresh(&group()).await.unwrap();

    let persisted = h.stored(&stored.id).await.unwrap();
    assert_eq!(persisted.deadline, Some(start() + chrono::Duration::days(4)));
}

// ===========================================================================
// Completion
// ===========================================================================

#[tokio::test]
async fn unassigned_task_credits_the_acting_member() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(4, None, true))
        .await
        .unwrap();

    let completed = h.controller.toggle_completion(&task.id, &bob()).await.unwrap();

    assert!(completed.completed);
    assert_eq!(completed.completed_by, Some(bob()));
    assert_eq!(completed.completed_at, Some(h.clock.now()));
    let stat = h.stat(&bob()).await;
    assert_eq!(stat.completed_count, 1);
    assert_eq!(stat.completed_stars, 4);
    h.controller.shutdown();
}

#[tokio::test]
async fn non_assignee_toggle_is_forbidden_and_changes_nothing() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(2, Some(bob()), true))
        .await
        .unwrap();

    let err = h
        .controller
        .toggle_completion(&task.id, &alice())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Forbidden { .. }));
    assert_eq!(h.stored(&task.id).await.unwrap(), task);
    assert!(h.stats.snapshot().is_empty());
    assert!(!h.controller.has_pending_job(&task.id));
}

#[tokio::test]
async fn reopening_keeps_the_earlier_credit() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(2, Some(bob()), true))
        .await
        .unwrap();

    h.controller.toggle_completion(&task.id, &bob()).await.unwrap();
    let reopened = h.controller.toggle_completion(&task.id, &bob()).await.unwrap();

    assert!(!reopened.completed);
    assert_eq!(reopened.completed_by, None);
    assert!(!h.controller.has_pending_job(&task.id));
    let stat = h.stat(&bob()).await;
    assert_eq!(stat.completed_count, 1);
    assert_eq!(stat.completed_stars, 2);
}

#[tokio::test]
async fn conflict_retries_bound_the_completion_loop() {
    let config = EngineConfig {
        conflict_retries: 3,
        ..EngineConfig::default()
    };
    let h = Harness::configured(
        AlwaysStaleStore {
            inner: InMemoryTaskStore::new(),
            attempts: AtomicU32::new(0),
        },
        config,
    );
    let mut active = overdue_task(Some(bob()), true);
    active.deadline = Some(start() + chrono::Duration::days(2));
    let task = h.tasks.upsert(&active).await.unwrap();

    let err = h.controller.toggle_completion(&task.id, &bob()).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert_eq!(h.tasks.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(h.stat(&bob()).await.completed_count, 0);
}

#[tokio::test]
async fn toggling_an_unknown_task_is_not_found() {
    let h = harness();
    let err = h
        .controller
        .toggle_completion(&TaskId::new(), &bob())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn completing_a_claimed_task_conflicts() {
    let h = harness();
    let mut task = overdue_task(Some(bob()), true);
    task.overdue_processed = true;
    let stored = h.tasks.upsert(&task).await.unwrap();

    let err = h
        .controller
        .toggle_completion(&stored.id, &bob())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Conflict(_)));
    assert!(h.stats.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn completed_recurring_task_resets_after_grace_delay() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), true))
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::hours(2));
    let completed = h.controller.toggle_completion(&task.id, &bob()).await.unwrap();
    let completed_at = completed.completed_at.unwrap();
    assert!(h.controller.has_pending_job(&task.id));

    tokio::time::sleep(Duration::from_secs(2)).await;

    let reset = h.stored(&task.id).await.unwrap();
    assert!(!reset.completed);
    assert_eq!(reset.completed_at, None);
    assert_eq!(reset.completed_by, None);
    assert_eq!(reset.deadline, Some(completed_at + chrono::Duration::days(1)));
    assert_eq!(reset.days_remaining, 1);
    assert!(!h.controller.has_pending_job(&task.id));

    let stat = h.stat(&bob()).await;
    assert_eq!(stat.completed_count, 1);
    assert_eq!(stat.completed_stars, 3);
}

// ===========================================================================
// Create, edit, delete
// ===========================================================================

// --- validation ---

#[tokio::test]
async fn invalid_drafts_are_rejected_without_side_effects() {
    let h = harness();
    let mut blank = draft(3, None, false);
    blank.name = "   ".to_string();
    let mut past = draft(3, None, false);
    past.deadline_date = "2026-04-09".to_string();
    let mut bad_date = draft(3, None, false);
    bad_date.deadline_date = "2026-02-31".to_string();

    let cases = [
        (blank, ValidationError::EmptyName),
        (draft(0, None, false), ValidationError::DifficultyOutOfRange(0)),
        (draft(6, None, false), ValidationError::DifficultyOutOfRange(6)),
        (past, ValidationError::DeadlineNotInFuture),
        (
            bad_date,
            ValidationError::NoSuchDate("2026-02-31".to_string()),
        ),
    ];
    for (input, expected) in cases {
        match h.controller.create(&group(), &alice(), input).await {
            Err(LifecycleError::Validation(err)) => assert_eq!(err, expected),
            other => panic!("expected validation error {expected:?}, got {other:?}"),
        }
    }
    assert!(h.tasks.is_empty());
    assert_eq!(h.controller.pending_sync_count(), 0);
}

// --- edit ---

#[tokio::test]
async fn edit_recomputes_duration_and_keeps_identity() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), true))
        .await
        .unwrap();

    let mut changed = draft(5, Some(alice()), false);
    changed.name = "  Deep clean  ".to_string();
    changed.deadline_date = "2026-04-14".to_string();
    let edited = h.controller.edit(&task.id, changed).await.unwrap();

    assert_eq!(edited.id, task.id);
    assert_eq!(edited.name, "Deep clean");
    assert_eq!(edited.difficulty, 5);
    assert_eq!(edited.assigned_to, Some(alice()));
    assert_eq!(edited.original_duration_days, 4);
    assert_eq!(edited.days_remaining, 4);
    assert!(edited.version > task.version);
}

#[tokio::test]
async fn editing_an_unknown_task_is_not_found() {
    let h = harness();
    let err = h
        .controller
        .edit(&TaskId::new(), draft(3, None, false))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

// --- delete ---

#[tokio::test]
async fn deleting_a_completed_task_reverses_its_credit() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(4, None, true))
        .await
        .unwrap();
    h.controller.toggle_completion(&task.id, &bob()).await.unwrap();
    assert_eq!(h.stat(&bob()).await.completed_stars, 4);

    h.controller.delete(&task.id).await.unwrap();

    assert!(h.stored(&task.id).await.is_none());
    assert!(!h.controller.has_pending_job(&task.id));
    let stat = h.stat(&bob()).await;
    assert_eq!(stat.completed_count, 0);
    assert_eq!(stat.completed_stars, 0);
}

#[tokio::test]
async fn deleting_an_active_task_leaves_stats_alone() {
    let h = harness();
    let task = h
        .controller
        .create(&group(), &alice(), draft(4, Some(bob()), true))
        .await
        .unwrap();

    h.controller.delete(&task.id).await.unwrap();

    assert!(h.stored(&task.id).await.is_none());
    assert!(h.stats.snapshot().is_empty());
}

#[tokio::test]
async fn deleting_an_unknown_task_succeeds() {
    let h = harness();
    h.controller.delete(&TaskId::new()).await.unwrap();
}

// ===========================================================================
// Pending-sync fallback
// ===========================================================================

#[tokio::test]
async fn create_during_outage_is_queued_and_synced_on_reconcile() {
    let h = Harness::over(SwitchableStore::new());
    h.tasks.set_down(true);

    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), true))
        .await
        .unwrap();
    assert_eq!(task.sync, SyncStatus::PendingSync);
    assert_eq!(h.controller.pending_sync_count(), 1);

    let err = h.controller.refresh(&group()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::StorageUnavailable(_)));
    assert_eq!(h.controller.pending_sync_count(), 1);

    h.tasks.set_down(false);
    let report = h.controller.refresh(&group()).await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(h.controller.pending_sync_count(), 0);
    assert_eq!(report.tasks.len(), 1);
    assert_eq!(report.tasks[0].id, task.id);
    assert_eq!(report.tasks[0].sync, SyncStatus::Synced);
}

#[tokio::test]
async fn edit_during_outage_is_queued_and_applied_later() {
    let h = Harness::over(SwitchableStore::new());
    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), true))
        .await
        .unwrap();

    h.tasks.set_read_only(true);
    let mut renamed = draft(3, Some(bob()), true);
    renamed.name = "Bins and recycling".to_string();
    let queued = h.controller.edit(&task.id, renamed).await.unwrap();
    assert_eq!(queued.sync, SyncStatus::PendingSync);

    h.tasks.set_read_only(false);
    let report = h.controller.refresh(&group()).await.unwrap();

    assert_eq!(report.synced, 1);
    let stored = h.stored(&task.id).await.unwrap();
    assert_eq!(stored.name, "Bins and recycling");
}

#[tokio::test]
async fn queued_edit_is_dropped_when_the_row_changed_meanwhile() {
    let h = Harness::over(SwitchableStore::new());
    let task = h
        .controller
        .create(&group(), &alice(), draft(3, Some(bob()), true))
        .await
        .unwrap();

    h.tasks.set_read_only(true);
    let mut renamed = draft(3, Some(bob()), true);
    renamed.name = "Local rename".to_string();
    h.controller.edit(&task.id, renamed).await.unwrap();

    h.tasks.set_read_only(false);
    let mut remote = task.clone();
    remote.name = "Remote rename".to_string();
    h.tasks.inner.upsert(&remote).await.unwrap();

    let report = h.controller.refresh(&group()).await.unwrap();

    assert_eq!(report.synced, 0);
    assert_eq!(h.controller.pending_sync_count(), 0);
    assert_eq!(h.stored(&task.id).await.unwrap().name, "Remote rename");
}

// ===========================================================================
// Projections
// ===========================================================================

#[tokio::test]
async fn views_and_leaderboard_use_display_names() {
    let h = harness();
    let directory = StaticDirectory::new([(bob(), "Bob".to_string())]);
    let easy = h
        .controller
        .create(&group(), &alice(), draft(1, Some(bob()), true))
        .await
        .unwrap();
    let hard = h
        .controller
        .create(&group(), &alice(), draft(5, None, true))
        .await
        .unwrap();
    h.controller.toggle_completion(&hard.id, &bob()).await.unwrap();

    let report = h.controller.refresh(&group()).await.unwrap();
    let views = h
        .controller
        .views(&report.tasks, &directory, TaskSort::Difficulty);
    assert_eq!(views[0].task_id, hard.id);
    assert_eq!(views[0].assignee_name, UNASSIGNED);
    assert_eq!(views[1].task_id, easy.id);
    assert_eq!(views[1].assignee_name, "Bob");
    assert_eq!(views[1].remaining.hours, 24);

    let board = h.controller.leaderboard(&group(), &directory).await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].display_name, "Bob");
    assert_eq!(board[0].completed_stars, 5);
    assert!(board[0].top);
    h.controller.shutdown();
}

// ===========================================================================
// Triggers
// ===========================================================================

#[tokio::test]
async fn change_event_triggers_a_reconcile() {
    let h = harness();
    let listener = spawn_listener(
        h.controller.clone(),
        group(),
        h.controller.notifier().subscribe(),
    );
    let task = h.tasks.upsert(&overdue_task(Some(bob()), false)).await.unwrap();

    h.controller.notifier().publish(ChangeEvent::TaskChanged {
        group_id: group(),
        task_id: task.id.clone(),
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.stored(&task.id).await.is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("listener should reconcile the group");

    assert_eq!(h.stat(&bob()).await.overdue_count, 1);
    listener.abort();
}

#[tokio::test]
async fn events_for_other_groups_are_ignored() {
    let h = harness();
    let listener = spawn_listener(
        h.controller.clone(),
        group(),
        h.controller.notifier().subscribe(),
    );
    let task = h.tasks.upsert(&overdue_task(Some(bob()), false)).await.unwrap();

    h.controller.notifier().publish(ChangeEvent::TaskChanged {
        group_id: GroupId::new("other"),
        task_id: task.id.clone(),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(h.stored(&task.id).await.is_some());
    listener.abort();
}

#[tokio::test(start_paused = true)]
async fn periodic_trigger_reconciles_on_interval() {
    let h = harness();
    let task = h.tasks.upsert(&overdue_task(Some(bob()), false)).await.unwrap();
    let timer = spawn_periodic(h.controller.clone(), group(), Duration::from_secs(60));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.stored(&task.id).await.is_some());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(h.stored(&task.id).await.is_none());
    assert_eq!(h.stat(&bob()).await.overdue_count, 1);
    timer.abort();
}

#[tokio::test(start_paused = true)]
async fn zero_periodic_interval_is_raised_instead_of_panicking() {
    let h = harness();
    let task = h.tasks.upsert(&overdue_task(Some(bob()), false)).await.unwrap();
    let timer = spawn_periodic(h.controller.clone(), group(), Duration::ZERO);

    tokio::time::sleep(MIN_PERIODIC_INTERVAL / 2).await;
    assert!(h.stored(&task.id).await.is_some());

    tokio::time::sleep(MIN_PERIODIC_INTERVAL).await;
    assert!(h.stored(&task.id).await.is_none());
    assert!(!timer.is_finished());
    timer.abort();
}
