//! Member reputation counters.
//!
//! [`StatsLedger`] is the only writer of [`MemberStat`] rows. Each operation
//! is a single atomic delta against the [`StatsStore`], so two triggers that
//! credit or penalize the same member concurrently never lose an update.

use std::sync::Arc;
use std::time::Duration;

use choreboard_proto::event::ChangeEvent;
use choreboard_proto::stats::{MemberStat, StatDelta};
use choreboard_proto::task::{GroupId, UserId};

use crate::notify::ChangeNotifier;
use crate::store::{StatsStore, StoreError, bounded};

/// Atomic credit and penalty operations over a [`StatsStore`].
pub struct StatsLedger<S: StatsStore> {
    store: Arc<S>,
    notifier: Arc<dyn ChangeNotifier>,
    timeout: Duration,
}

impl<S: StatsStore> Clone for StatsLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            timeout: self.timeout,
        }
    }
}

impl<S: StatsStore> StatsLedger<S> {
    /// Create a ledger writing to `store`, announcing changes on `notifier`.
    #[must_use]
    pub fn new(store: Arc<S>, notifier: Arc<dyn ChangeNotifier>, timeout: Duration) -> Self {
        Self {
            store,
            notifier,
            timeout,
        }
    }

    /// Credits (or, with negative values, reverses) a completion.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delta could not be applied. The row is
    /// then unchanged unless the error [is indeterminate](StoreError::is_indeterminate).
    pub async fn credit(
        &self,
        group: &GroupId,
        user: &UserId,
        stars: i64,
        count: i64,
    ) -> Result<MemberStat, StoreError> {
        self.apply(group, user, StatDelta::credit(stars, count)).await
    }

    /// Records a missed deadline: `overdue` added to the overdue count and
    /// `stars` (normally negative) added to the star total.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delta could not be applied. The row is
    /// then unchanged unless the error [is indeterminate](StoreError::is_indeterminate).
    pub async fn penalize(
        &self,
        group: &GroupId,
        user: &UserId,
        overdue: i64,
        stars: i64,
    ) -> Result<MemberStat, StoreError> {
        self.apply(group, user, StatDelta::penalty(overdue, stars)).await
    }

    /// Current rows of a group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store could not be read.
    pub async fn standings(&self, group: &GroupId) -> Result<Vec<MemberStat>, StoreError> {
        bounded(self.timeout, self.store.list_by_group(group)).await
    }

    async fn apply(
        &self,
        group: &GroupId,
        user: &UserId,
        delta: StatDelta,
    ) -> Result<MemberStat, StoreError> {
        let row = bounded(self.timeout, self.store.apply_delta(group, user, delta)).await?;
        tracing::debug!(
            group_id = %group,
            user_id = %user,
            completed_count = row.completed_count,
            completed_stars = row.completed_stars,
            overdue_count = row.overdue_count,
            "stats delta applied"
        );
        self.notifier.publish(ChangeEvent::StatsChanged {
            group_id: group.clone(),
            user_id: user.clone(),
        });
        Ok(row)
    }
}
