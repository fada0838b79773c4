//! File-backed task and stats store.
//!
//! The working set lives in the engine's in-memory stores. Every mutation
//! commits in memory, takes a full JSON snapshot, and hands it to a
//! background write that renames a temporary file over `snapshot.json`, so a
//! crash never leaves a torn file. Store calls never wait on the disk; use
//! [`JsonFileStore::flush`] to wait for outstanding writes. A snapshot that
//! fails to write is logged and superseded by the next one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use choreboard::store::memory::{InMemoryStatsStore, InMemoryTaskStore};
use choreboard::store::{Cas, StatsStore, StoreError, TaskStore};
use choreboard_proto::stats::{MemberStat, StatDelta};
use choreboard_proto::task::{GroupId, Task, TaskId, UserId};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Name of the snapshot file inside the data directory.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Errors that can occur when opening a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The data directory or snapshot file could not be accessed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot file is not valid JSON for this schema.
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    tasks: Vec<Task>,
    stats: Vec<MemberStat>,
}

/// Writes numbered snapshots, dropping any older than the last one written.
///
/// Generations are taken after the in-memory commit and before the snapshot
/// is read, so a higher generation always contains every lower one's change.
struct SnapshotWriter {
    path: PathBuf,
    next: AtomicU64,
    written: tokio::sync::Mutex<u64>,
}

impl SnapshotWriter {
    async fn write(&self, generation: u64, bytes: Vec<u8>) {
        let mut written = self.written.lock().await;
        if *written >= generation {
            tracing::trace!(generation, "snapshot superseded, skipping");
            return;
        }
        let tmp = self.path.with_extension("json.tmp");
        let result = match tokio::fs::write(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => *written = generation,
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                generation,
                error = %err,
                "snapshot write failed, will retry on next change"
            ),
        }
    }
}

/// Durable [`TaskStore`] and [`StatsStore`] over a JSON snapshot file.
pub struct JsonFileStore {
    tasks: InMemoryTaskStore,
    stats: InMemoryStatsStore,
    writer: Arc<SnapshotWriter>,
    pending: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl JsonFileStore {
    /// Opens (or creates) the store in `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the directory cannot be created or an
    /// existing snapshot cannot be read or parsed.
    pub fn open(data_dir: &Path) -> Result<Self, SnapshotError> {
        std::fs::create_dir_all(data_dir).map_err(|source| SnapshotError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let path = data_dir.join(SNAPSHOT_FILE);
        let snapshot = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };
        tracing::info!(
            path = %path.display(),
            tasks = snapshot.tasks.len(),
            stats = snapshot.stats.len(),
            "snapshot loaded"
        );

        Ok(Self {
            tasks: InMemoryTaskStore::from_tasks(snapshot.tasks),
            stats: InMemoryStatsStore::from_rows(snapshot.stats),
            writer: Arc::new(SnapshotWriter {
                path,
                next: AtomicU64::new(0),
                written: tokio::sync::Mutex::new(0),
            }),
            pending: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.writer.path
    }

    /// Waits until every snapshot scheduled so far has been written or
    /// superseded.
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for handle in pending {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "snapshot write task failed");
            }
        }
    }

    /// Takes a snapshot of the current state and schedules its write.
    ///
    /// Must run after the in-memory commit, with no await in between.
    fn persist(&self) {
        let generation = self.writer.next.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Snapshot {
            tasks: self.tasks.snapshot(),
            stats: self.stats.snapshot(),
        };
        let bytes = match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot serialization failed");
                return;
            }
        };

        let writer = Arc::clone(&self.writer);
        let handle = tokio::spawn(async move { writer.write(generation, bytes).await });
        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

impl TaskStore for JsonFileStore {
    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<Task>, StoreError> {
        TaskStore::list_by_group(&self.tasks, group).await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        TaskStore::get(&self.tasks, id).await
    }

    async fn upsert(&self, task: &Task) -> Result<Task, StoreError> {
        let stored = self.tasks.upsert(task).await?;
        self.persist();
        Ok(stored)
    }

    async fn update_if_version(&self, task: &Task) -> Result<Cas<Task>, StoreError> {
        let result = self.tasks.update_if_version(task).await?;
        if result.is_applied() {
            self.persist();
        }
        Ok(result)
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        let removed = self.tasks.delete(id).await?;
        if removed {
            self.persist();
        }
        Ok(removed)
    }

    async fn delete_if_version(&self, id: &TaskId, version: u64) -> Result<Cas<()>, StoreError> {
        let result = self.tasks.delete_if_version(id, version).await?;
        if result.is_applied() {
            self.persist();
        }
        Ok(result)
    }
}

impl StatsStore for JsonFileStore {
    async fn apply_delta(
        &self,
        group: &GroupId,
        user: &UserId,
        delta: StatDelta,
    ) -> Result<MemberStat, StoreError> {
        let row = self.stats.apply_delta(group, user, delta).await?;
        self.persist();
        Ok(row)
    }

    async fn get(&self, group: &GroupId, user: &UserId) -> Result<Option<MemberStat>, StoreError> {
        StatsStore::get(&self.stats, group, user).await
    }

    async fn list_by_group(&self, group: &GroupId) -> Result<Vec<MemberStat>, StoreError> {
        StatsStore::list_by_group(&self.stats, group).await
    }
}
