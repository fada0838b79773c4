//! Wires the engine, store, and triggers together for the configured groups.

use std::sync::Arc;

use choreboard::TaskLifecycleController;
use choreboard::clock::Clock;
use choreboard::directory::{MemberDirectory, StaticDirectory};
use choreboard::notify::{BroadcastNotifier, ChangeNotifier};
use choreboard::triggers::{spawn_listener, spawn_periodic};
use choreboard_proto::task::GroupId;
use tokio::task::JoinHandle;

use crate::config::HostConfig;
use crate::store::JsonFileStore;

/// Controller type used by the host.
pub type HostController = TaskLifecycleController<JsonFileStore, JsonFileStore>;

/// A running host: one controller plus a timer and a listener per group.
pub struct Host {
    controller: HostController,
    directory: StaticDirectory,
    groups: Vec<GroupId>,
    triggers: Vec<JoinHandle<()>>,
}

impl Host {
    /// Builds the controller, runs one manual pass per group, and spawns
    /// the periodic and notification triggers.
    pub async fn start(config: &HostConfig, store: Arc<JsonFileStore>, clock: Arc<dyn Clock>) -> Self {
        let notifier: Arc<dyn ChangeNotifier> =
            Arc::new(BroadcastNotifier::new(config.engine.notification_buffer));
        let controller = TaskLifecycleController::new(
            Arc::clone(&store),
            store,
            clock,
            Arc::clone(&notifier),
            config.engine.clone(),
        );
        let directory = StaticDirectory::new(config.members.iter().cloned());

        let mut triggers = Vec::with_capacity(config.groups.len() * 2);
        for group in &config.groups {
            match controller.refresh(group).await {
                Ok(report) => tracing::info!(
                    group_id = %group,
                    tasks = report.tasks.len(),
                    processed = report.processed.len(),
                    "initial reconcile done"
                ),
                Err(err) => tracing::warn!(group_id = %group, error = %err, "initial reconcile failed"),
            }
            triggers.push(spawn_periodic(
                controller.clone(),
                group.clone(),
                config.engine.reconcile_interval,
            ));
            triggers.push(spawn_listener(
                controller.clone(),
                group.clone(),
                notifier.subscribe(),
            ));
        }

        Self {
            controller,
            directory,
            groups: config.groups.clone(),
            triggers,
        }
    }

    /// The running controller.
    #[must_use]
    pub const fn controller(&self) -> &HostController {
        &self.controller
    }

    /// Member names known to this host.
    #[must_use]
    pub fn directory(&self) -> &dyn MemberDirectory {
        &self.directory
    }

    /// Logs the current leaderboard of every group.
    pub async fn log_standings(&self) {
        for group in &self.groups {
            match self.controller.leaderboard(group, &self.directory).await {
                Ok(board) => {
                    for standing in board {
                        tracing::info!(
                            group_id = %group,
                            member = %standing.display_name,
                            stars = standing.completed_stars,
                            completed = standing.completed_count,
                            overdue = standing.overdue_count,
                            top = standing.top,
                            "standing"
                        );
                    }
                }
                Err(err) => tracing::warn!(group_id = %group, error = %err, "leaderboard unavailable"),
            }
        }
    }

    /// Stops every trigger and aborts pending grace-delay jobs.
    pub fn shutdown(self) {
        for handle in &self.triggers {
            handle.abort();
        }
        self.controller.shutdown();
    }
}
