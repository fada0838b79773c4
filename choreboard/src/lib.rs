//! `Choreboard`: lifecycle engine for shared group chores.
//!
//! Computes deadlines, detects overdue tasks across independent triggers,
//! resets or deletes finished tasks, and keeps per-member reputation
//! counters consistent under concurrent reconcile passes.

pub mod clock;
pub mod config;
pub mod deadline;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod notify;
pub mod store;
pub mod triggers;

pub use config::{EngineConfig, InvalidConfig};
pub use error::{LifecycleError, ValidationError};
pub use lifecycle::{TaskDraft, TaskLifecycleController, Trigger};
