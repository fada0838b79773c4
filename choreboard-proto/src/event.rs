//! Out-of-band change notifications.
//!
//! Every mutation of a task or stats row is announced as a [`ChangeEvent`]
//! so that other sessions watching the same group can reconcile.

use serde::{Deserialize, Serialize};

use crate::task::{GroupId, TaskId, UserId};

/// A change to a group's stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// A task row was inserted or updated.
    TaskChanged {
        group_id: GroupId,
        task_id: TaskId,
    },
    /// A task row was removed.
    TaskDeleted {
        group_id: GroupId,
        task_id: TaskId,
    },
    /// A member's stats row changed.
    StatsChanged {
        group_id: GroupId,
        user_id: UserId,
    },
}

impl ChangeEvent {
    /// Group whose state changed.
    #[must_use]
    pub const fn group_id(&self) -> &GroupId {
        match self {
            Self::TaskChanged { group_id, .. }
            | Self::TaskDeleted { group_id, .. }
            | Self::StatsChanged { group_id, .. } => group_id,
        }
    }
}
