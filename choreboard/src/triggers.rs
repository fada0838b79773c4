//! Background reconcile triggers.
//!
//! Each trigger is a spawned task that calls
//! [`TaskLifecycleController::reconcile`] for one group. Abort the returned
//! handle to stop it.

use std::time::Duration;

use choreboard_proto::event::ChangeEvent;
use choreboard_proto::task::GroupId;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::lifecycle::{TaskLifecycleController, Trigger};
use crate::store::{StatsStore, TaskStore};

/// Shortest period the timer trigger runs at.
pub const MIN_PERIODIC_INTERVAL: Duration = Duration::from_secs(1);

/// Reconciles `group` every `interval`. The first pass runs one interval
/// after spawning; ticks missed while a pass runs long are skipped.
///
/// An `interval` below [`MIN_PERIODIC_INTERVAL`] is raised to it.
pub fn spawn_periodic<T, S>(
    controller: TaskLifecycleController<T, S>,
    group: GroupId,
    interval: Duration,
) -> JoinHandle<()>
where
    T: TaskStore + 'static,
    S: StatsStore + 'static,
{
    if interval < MIN_PERIODIC_INTERVAL {
        tracing::warn!(
            group_id = %group,
            requested = ?interval,
            used = ?MIN_PERIODIC_INTERVAL,
            "reconcile interval too short, raised"
        );
    }
    let interval = interval.max(MIN_PERIODIC_INTERVAL);
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut tick = tokio::time::interval_at(start, interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            run(&controller, &group, Trigger::Timer).await;
        }
    })
}

/// Reconciles `group` whenever a change event for it arrives on `events`.
///
/// Events that queue up while a pass is running are folded into a single
/// follow-up pass. A lagged receiver reconciles once, since it cannot tell
/// which groups it missed. The task ends when the channel closes.
pub fn spawn_listener<T, S>(
    controller: TaskLifecycleController<T, S>,
    group: GroupId,
    mut events: broadcast::Receiver<ChangeEvent>,
) -> JoinHandle<()>
where
    T: TaskStore + 'static,
    S: StatsStore + 'static,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.group_id() != &group => continue,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(group_id = %group, skipped, "change listener lagged");
                }
                Err(RecvError::Closed) => break,
            }

            // Drain whatever piled up; one pass covers all of it.
            loop {
                match events.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }

            // Writes made by this pass are announced too and cause one more
            // pass, which finds nothing to do and publishes nothing.
            run(&controller, &group, Trigger::Notification).await;
        }
        tracing::debug!(group_id = %group, "change listener stopped");
    })
}

async fn run<T, S>(controller: &TaskLifecycleController<T, S>, group: &GroupId, trigger: Trigger)
where
    T: TaskStore + 'static,
    S: StatsStore + 'static,
{
    if let Err(err) = controller.reconcile(group, trigger).await {
        tracing::warn!(group_id = %group, trigger = %trigger, error = %err, "reconcile failed");
    }
}
