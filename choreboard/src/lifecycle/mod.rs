//! Task lifecycle: creation, completion, overdue processing, and the
//! deferred reset or deletion that follows both.
//!
//! [`TaskLifecycleController`] is the entry point. The other types are its
//! building blocks and are exported for hosts that need finer control.

pub mod controller;
pub mod guard;
pub mod jobs;
pub mod pending;
pub mod recurrence;
pub mod scanner;

use std::fmt;

pub use controller::{ReconcileFailure, ReconcileReport, TaskDraft, TaskLifecycleController};
pub use guard::{Claim, IdempotencyGuard};
pub use jobs::DeferredJobs;
pub use pending::{FlushReport, PendingSync};
pub use recurrence::{Outcome, RecurrenceResetter};
pub use scanner::{OverdueScanner, Processed, ScanFailure, ScanReport};

/// What caused a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The fixed-interval timer.
    Timer,
    /// A change notification for the group.
    Notification,
    /// An explicit refresh request.
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timer => "timer",
            Self::Notification => "notification",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}
