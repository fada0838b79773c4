//! Read-only projections for display.
//!
//! Nothing here affects lifecycle decisions. Display names come from a
//! [`MemberDirectory`] supplied by the host.

use std::collections::HashMap;

use choreboard_proto::stats::MemberStat;
use choreboard_proto::task::{SyncStatus, Task, TaskId, UserId};
use chrono::{DateTime, Utc};

use crate::deadline::{Remaining, is_overdue, remaining, resolve_deadline};

/// Label shown for tasks without an assignee, or with an unknown one.
pub const UNASSIGNED: &str = "Unassigned";

/// Resolves member ids to display names.
pub trait MemberDirectory: Send + Sync {
    /// Display name of `user`, or `None` if unknown.
    fn display_name(&self, user: &UserId) -> Option<String>;
}

/// A fixed id-to-name table.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<UserId, String>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(names: impl IntoIterator<Item = (UserId, String)>) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }
}

impl MemberDirectory for StaticDirectory {
    fn display_name(&self, user: &UserId) -> Option<String> {
        self.names.get(user).cloned()
    }
}

/// A task as presented in a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task_id: TaskId,
    pub name: String,
    pub difficulty: u8,
    pub assignee_name: String,
    pub completed: bool,
    pub recurring: bool,
    pub deadline: DateTime<Utc>,
    pub remaining: Remaining,
    pub overdue: bool,
    pub pending_sync: bool,
}

/// Orderings for task lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSort {
    /// Earliest deadline first.
    #[default]
    Deadline,
    /// Hardest first; ties by earliest deadline.
    Difficulty,
}

/// A member's row on the group leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStanding {
    pub user_id: UserId,
    pub display_name: String,
    pub completed_count: u64,
    pub completed_stars: i64,
    pub overdue_count: u64,
    /// Holds the highest positive star count in the group.
    pub top: bool,
}

/// Builds display rows for `tasks` as seen at `now`.
#[must_use]
pub fn task_views(
    tasks: &[Task],
    now: DateTime<Utc>,
    directory: &dyn MemberDirectory,
) -> Vec<TaskView> {
    tasks
        .iter()
        .map(|task| {
            let deadline = resolve_deadline(task.created_at, task.deadline, task.days_remaining);
            TaskView {
                task_id: task.id.clone(),
                name: task.name.clone(),
                difficulty: task.difficulty,
                assignee_name: task
                    .assignee()
                    .and_then(|user| directory.display_name(user))
                    .unwrap_or_else(|| UNASSIGNED.to_string()),
                completed: task.completed,
                recurring: task.recurring,
                deadline,
                remaining: remaining(deadline, now),
                overdue: is_overdue(deadline, task.completed, now),
                pending_sync: task.sync == SyncStatus::PendingSync,
            }
        })
        .collect()
}

/// Sorts views in place.
pub fn sort_views(views: &mut [TaskView], order: TaskSort) {
    match order {
        TaskSort::Deadline => views.sort_by(|a, b| a.deadline.cmp(&b.deadline)),
        TaskSort::Difficulty => views.sort_by(|a, b| {
            b.difficulty
                .cmp(&a.difficulty)
                .then_with(|| a.deadline.cmp(&b.deadline))
        }),
    }
}

/// Ranks members by stars, highest first, ties broken by user id.
///
/// Members without a directory entry are shown by their id.
#[must_use]
pub fn leaderboard(rows: &[MemberStat], directory: &dyn MemberDirectory) -> Vec<MemberStanding> {
    let best = rows
        .iter()
        .map(|r| r.completed_stars)
        .max()
        .filter(|stars| *stars > 0);

    let mut standings: Vec<MemberStanding> = rows
        .iter()
        .map(|row| MemberStanding {
            user_id: row.user_id.clone(),
            display_name: directory
                .display_name(&row.user_id)
                .unwrap_or_else(|| row.user_id.to_string()),
            completed_count: row.completed_count,
            completed_stars: row.completed_stars,
            overdue_count: row.overdue_count,
            top: best == Some(row.completed_stars),
        })
        .collect();
    standings.sort_by(|a, b| {
        b.completed_stars
            .cmp(&a.completed_stars)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    standings
}
