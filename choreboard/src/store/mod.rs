//! Storage collaborators consumed by the engine.
//!
//! Defines the [`TaskStore`] and [`StatsStore`] traits that every backend
//! must satisfy. Concrete implementations include:
//! - [`memory::InMemoryTaskStore`] / [`memory::InMemoryStatsStore`]: process-local stores
//! - [`optimistic::OptimisticStats`]: atomic deltas on top of a compare-and-swap backend
//!
//! Task writes that must not race (overdue claims, resets, completion
//! toggles) go through the version-checked operations. Counter changes only
//! ever go through [`StatsStore::apply_delta`]; callers never read a counter,
//! compute a new value, and write it back.

pub mod memory;
pub mod optimistic;

use std::future::Future;
use std::time::Duration;

use choreboard_proto::stats::{MemberStat, StatDelta};
use choreboard_proto::task::{GroupId, Task, TaskId, UserId};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete within the configured limit.
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Returns `true` if the operation may have taken effect even though it
    /// reported an error. A timed-out write can still have been committed.
    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result of a version-checked write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cas<T> {
    /// The write happened; carries the stored record.
    Applied(T),
    /// The stored version differed from the expected one.
    Stale,
    /// No row exists for the key.
    Missing,
}

impl<T> Cas<T> {
    /// Returns `true` if the write happened.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Durable task rows.
pub trait TaskStore: Send + Sync {
    /// All tasks of a group. May contain duplicate rows under concurrent reloads.
    fn list_by_group(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// A single task, or `None` if it does not exist.
    fn get(&self, id: &TaskId) -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Inserts or overwrites a task unconditionally, bumping its version.
    ///
    /// Returns the record as stored.
    fn upsert(&self, task: &Task) -> impl Future<Output = Result<Task, StoreError>> + Send;

    /// Overwrites a task only if the stored version equals `task.version`.
    fn update_if_version(
        &self,
        task: &Task,
    ) -> impl Future<Output = Result<Cas<Task>, StoreError>> + Send;

    /// Removes a task. Returns `false` if it did not exist.
    fn delete(&self, id: &TaskId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes a task only if its stored version equals `version`.
    fn delete_if_version(
        &self,
        id: &TaskId,
        version: u64,
    ) -> impl Future<Output = Result<Cas<()>, StoreError>> + Send;
}

/// Member counters with atomic delta application.
pub trait StatsStore: Send + Sync {
    /// Atomically applies `delta` to the row, creating a zeroed row first if
    /// none exists. Returns the row after the change.
    fn apply_delta(
        &self,
        group: &GroupId,
        user: &UserId,
        delta: StatDelta,
    ) -> impl Future<Output = Result<MemberStat, StoreError>> + Send;

    /// A single row, or `None` if the member has no stats yet.
    fn get(
        &self,
        group: &GroupId,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<MemberStat>, StoreError>> + Send;

    /// All rows of a group.
    fn list_by_group(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<Vec<MemberStat>, StoreError>> + Send;
}

/// A stats backend that only offers versioned reads and compare-and-swap.
///
/// Wrap it in [`optimistic::OptimisticStats`] to obtain a [`StatsStore`].
pub trait VersionedStatsStore: Send + Sync {
    /// Reads a row together with its version.
    fn load(
        &self,
        group: &GroupId,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<MemberStat>, StoreError>> + Send;

    /// Writes `stat` only if the stored version equals `stat.version`.
    ///
    /// A `stat.version` of zero means "insert if absent".
    fn compare_and_swap(
        &self,
        stat: &MemberStat,
    ) -> impl Future<Output = Result<Cas<MemberStat>, StoreError>> + Send;

    /// All rows of a group.
    fn list_rows(
        &self,
        group: &GroupId,
    ) -> impl Future<Output = Result<Vec<MemberStat>, StoreError>> + Send;
}

/// Runs a storage operation with an upper time bound.
///
/// # Errors
///
/// Returns [`StoreError::Timeout`] if `op` does not finish within `limit`,
/// otherwise whatever `op` returns.
pub async fn bounded<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
