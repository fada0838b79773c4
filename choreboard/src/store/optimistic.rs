//! Atomic stats deltas for backends that only offer compare-and-swap.

use choreboard_proto::stats::{MemberStat, StatDelta};
use choreboard_proto::task::{GroupId, UserId};

use super::{Cas, StatsStore, StoreError, VersionedStatsStore};

/// Default number of compare-and-swap attempts per delta.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Implements [`StatsStore`] on top of a [`VersionedStatsStore`].
///
/// Each delta is applied to the freshly loaded row and written back with a
/// version check. A lost race reloads and tries again, so concurrent deltas
/// on the same row are never lost.
#[derive(Debug)]
pub struct OptimisticStats<B: VersionedStatsStore> {
    backend: B,
    max_attempts: u32,
}

impl<B: VersionedStatsStore> OptimisticStats<B> {
    /// Wrap `backend` with the default retry bound.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self::with_max_attempts(backend, DEFAULT_MAX_ATTEMPTS)
    }

    /// Wrap `backend`, giving up after `max_attempts` lost races.
    #[must_use]
    pub const fn with_max_attempts(backend: B, max_attempts: u32) -> Self {
        Self {
            backend,
            max_attempts,
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: VersionedStatsStore> StatsStore for OptimisticStats<B> {
    async fn apply_delta(
        &self,
        group: &GroupId,
        user: &UserId,
        delta: StatDelta,
    ) -> Result<MemberStat, StoreError> {
        for attempt in 1..=self.max_attempts {
            let mut row = self
                .backend
                .load(group, user)
                .await?
                .unwrap_or_else(|| MemberStat::zero(group.clone(), user.clone()));
            row.apply(delta);

            match self.backend.compare_and_swap(&row).await? {
                Cas::Applied(stored) => return Ok(stored),
                Cas::Stale | Cas::Missing => {
                    tracing::debug!(
                        group_id = %group,
                        user_id = %user,
                        attempt,
                        "stats row changed underneath delta, retrying"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(StoreError::Unavailable(format!(
            "stats row {group}/{user} still contended after {} attempts",
            self.max_attempts
        )))
    }

    async fn get(&self, group: &GroupId, user: &UserId) -> Result<Option<MemberStat>, StoreError> {
        self.backend.load(group, user).await
    }

    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<MemberStat>, StoreError> {
        self.backend.list_rows(group).await
    }
}
