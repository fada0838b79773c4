//! Per-member reputation counters.
//!
//! [`MemberStat`] rows are keyed by `(group_id, user_id)` and only ever
//! change by applying a [`StatDelta`]. The clamping rule lives here so that
//! every store applies it identically.

use serde::{Deserialize, Serialize};

use crate::task::{GroupId, UserId};

/// Reputation counters for one member of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStat {
    pub group_id: GroupId,
    pub user_id: UserId,
    /// Number of completed tasks. Never below zero.
    pub completed_count: u64,
    /// Sum of difficulty points earned minus points lost. May go negative.
    pub completed_stars: i64,
    /// Number of missed deadlines. Never below zero.
    pub overdue_count: u64,
    /// Store-assigned revision for optimistic concurrency.
    #[serde(default)]
    pub version: u64,
}

impl MemberStat {
    /// A zeroed row, as created on first upsert.
    #[must_use]
    pub const fn zero(group_id: GroupId, user_id: UserId) -> Self {
        Self {
            group_id,
            user_id,
            completed_count: 0,
            completed_stars: 0,
            overdue_count: 0,
            version: 0,
        }
    }

    /// Applies a delta in place.
    ///
    /// `completed_count` and `overdue_count` are clamped at zero;
    /// `completed_stars` is not. Arithmetic saturates instead of wrapping.
    pub fn apply(&mut self, delta: StatDelta) {
        self.completed_count = apply_clamped(self.completed_count, delta.completed_count);
        self.completed_stars = self.completed_stars.saturating_add(delta.completed_stars);
        self.overdue_count = apply_clamped(self.overdue_count, delta.overdue_count);
    }
}

fn apply_clamped(current: u64, delta: i64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta.unsigned_abs())
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

/// Signed change to a [`MemberStat`] row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub completed_count: i64,
    pub completed_stars: i64,
    pub overdue_count: i64,
}

impl StatDelta {
    /// Delta for crediting (or, with negative values, reversing) a completion.
    #[must_use]
    pub const fn credit(stars: i64, count: i64) -> Self {
        Self {
            completed_count: count,
            completed_stars: stars,
            overdue_count: 0,
        }
    }

    /// Delta for penalizing a missed deadline.
    #[must_use]
    pub const fn penalty(overdue: i64, stars: i64) -> Self {
        Self {
            completed_count: 0,
            completed_stars: stars,
            overdue_count: overdue,
        }
    }

    /// Returns `true` if applying this delta changes nothing.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.completed_count == 0 && self.completed_stars == 0 && self.overdue_count == 0
    }
}
