//! Shared data model for `Choreboard` groups, tasks, and member stats.

pub mod event;
pub mod stats;
pub mod task;
