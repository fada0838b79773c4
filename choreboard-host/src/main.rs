//! Choreboard host -- headless reconciliation process.
//!
//! Keeps the configured groups' chores up to date: overdue tasks are
//! penalized and reset or removed, completed tasks are finalized, and the
//! state is snapshotted to the data directory after every change.
//!
//! # Usage
//!
//! ```bash
//! # Reconcile one group with defaults
//! cargo run --bin choreboard-host -- --group flat-7
//!
//! # Custom data directory and a faster timer
//! cargo run --bin choreboard-host -- --group flat-7 --data-dir ./data \
//!     --reconcile-interval-secs 10
//!
//! # Or via environment variables
//! CHOREBOARD_DATA_DIR=./data CHOREBOARD_LOG=debug cargo run --bin choreboard-host -- -g flat-7
//! ```

use std::path::Path;
use std::sync::Arc;

use choreboard::clock::SystemClock;
use choreboard_host::config::{HostCliArgs, HostConfig};
use choreboard_host::runtime::Host;
use choreboard_host::store::JsonFileStore;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = HostCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match HostConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, &config.log_file);

    if config.groups.is_empty() {
        eprintln!("No groups configured; pass --group or list them in the config file");
        std::process::exit(2);
    }

    let store = match JsonFileStore::open(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "failed to open data directory");
            eprintln!("Error opening data directory: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        data_dir = %config.data_dir.display(),
        groups = config.groups.len(),
        interval = ?config.engine.reconcile_interval,
        "choreboard host starting"
    );

    let host = Host::start(&config, Arc::clone(&store), Arc::new(SystemClock)).await;
    host.log_standings().await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }

    host.log_standings().await;
    host.shutdown();
    store.flush().await;
    tracing::info!("choreboard host exiting");
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, log_path: &Path) -> Option<WorkerGuard> {
    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
