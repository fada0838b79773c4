//! Process-local implementations of the storage traits.
//!
//! Every operation takes the store's lock once and releases it before
//! returning, so each call is atomic with respect to every other call on the
//! same store. Used by tests and as the working set of file-backed hosts.

use std::collections::HashMap;

use choreboard_proto::stats::{MemberStat, StatDelta};
use choreboard_proto::task::{GroupId, SyncStatus, Task, TaskId, UserId};
use parking_lot::Mutex;

use super::{Cas, StatsStore, StoreError, TaskStore, VersionedStatsStore};

/// In-memory [`TaskStore`].
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    /// Create a new, empty task store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `tasks`, keeping their versions.
    #[must_use]
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks.into_iter().map(|t| (t.id.clone(), t)).collect()),
        }
    }

    /// All stored tasks, ordered by creation time.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.lock().values().cloned().collect();
        sort_tasks(&mut tasks);
        tasks
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Returns `true` if no tasks are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn stored_copy(task: &Task, version: u64) -> Task {
    let mut stored = task.clone();
    stored.version = version;
    stored.sync = SyncStatus::Synced;
    stored
}

impl TaskStore for InMemoryTaskStore {
    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .values()
            .filter(|t| &t.group_id == group)
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().get(id).cloned())
    }

    async fn upsert(&self, task: &Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.lock();
        let version = tasks.get(&task.id).map_or(0, |t| t.version) + 1;
        let stored = stored_copy(task, version);
        tasks.insert(stored.id.clone(), stored.clone());
        drop(tasks);
        Ok(stored)
    }

    async fn update_if_version(&self, task: &Task) -> Result<Cas<Task>, StoreError> {
        let mut tasks = self.tasks.lock();
        let Some(existing) = tasks.get_mut(&task.id) else {
            return Ok(Cas::Missing);
        };
        if existing.version != task.version {
            return Ok(Cas::Stale);
        }
        let stored = stored_copy(task, task.version + 1);
        *existing = stored.clone();
        drop(tasks);
        Ok(Cas::Applied(stored))
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        Ok(self.tasks.lock().remove(id).is_some())
    }

    async fn delete_if_version(&self, id: &TaskId, version: u64) -> Result<Cas<()>, StoreError> {
        let mut tasks = self.tasks.lock();
        match tasks.get(id) {
            None => Ok(Cas::Missing),
            Some(existing) if existing.version != version => Ok(Cas::Stale),
            Some(_) => {
                tasks.remove(id);
                Ok(Cas::Applied(()))
            }
        }
    }
}

type StatKey = (GroupId, UserId);

/// In-memory [`StatsStore`] with in-place delta application.
///
/// Also implements [`VersionedStatsStore`], so it can stand in for a
/// compare-and-swap backend.
#[derive(Debug, Default)]
pub struct InMemoryStatsStore {
    rows: Mutex<HashMap<StatKey, MemberStat>>,
}

impl InMemoryStatsStore {
    /// Create a new, empty stats store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `rows`.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = MemberStat>) -> Self {
        Self {
            rows: Mutex::new(
                rows.into_iter()
                    .map(|r| ((r.group_id.clone(), r.user_id.clone()), r))
                    .collect(),
            ),
        }
    }

    /// All rows, ordered by group then user.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MemberStat> {
        let mut rows: Vec<MemberStat> = self.rows.lock().values().cloned().collect();
        rows.sort_by(|a, b| {
            a.group_id
                .cmp(&b.group_id)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        rows
    }

    fn rows_for(&self, group: &GroupId) -> Vec<MemberStat> {
        let mut rows: Vec<MemberStat> = self
            .rows
            .lock()
            .values()
            .filter(|r| &r.group_id == group)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        rows
    }
}

impl StatsStore for InMemoryStatsStore {
    async fn apply_delta(
        &self,
        group: &GroupId,
        user: &UserId,
        delta: StatDelta,
    ) -> Result<MemberStat, StoreError> {
        let mut rows = self.rows.lock();
        let row = rows
            .entry((group.clone(), user.clone()))
            .or_insert_with(|| MemberStat::zero(group.clone(), user.clone()));
        row.apply(delta);
        row.version += 1;
        Ok(row.clone())
    }

    async fn get(&self, group: &GroupId, user: &UserId) -> Result<Option<MemberStat>, StoreError> {
        Ok(self.rows.lock().get(&(group.clone(), user.clone())).cloned())
    }

    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<MemberStat>, StoreError> {
        Ok(self.rows_for(group))
    }
}

impl VersionedStatsStore for InMemoryStatsStore {
    async fn load(&self, group: &GroupId, user: &UserId) -> Result<Option<MemberStat>, StoreError> {
        Ok(self.rows.lock().get(&(group.clone(), user.clone())).cloned())
    }

    async fn compare_and_swap(&self, stat: &MemberStat) -> Result<Cas<MemberStat>, StoreError> {
        let mut rows = self.rows.lock();
        let key = (stat.group_id.clone(), stat.user_id.clone());
        let current = rows.get(&key).map_or(0, |r| r.version);
        if current != stat.version {
            return Ok(Cas::Stale);
        }
        let mut stored = stat.clone();
        stored.version = current + 1;
        rows.insert(key, stored.clone());
        drop(rows);
        Ok(Cas::Applied(stored))
    }

    async fn list_rows(&self, group: &GroupId) -> Result<Vec<MemberStat>, StoreError> {
        Ok(self.rows_for(group))
    }
}
