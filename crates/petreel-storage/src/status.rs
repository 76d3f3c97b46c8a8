//! Status store: one JSON record per task on local disk.
//!
//! The external worker writes the same files without any coordination, so
//! every write from this service replaces the file atomically (temp file +
//! rename) and reconciliation writes are made conditional on the record not
//! having changed since it was read.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use petreel_models::timestamp::format_timestamp;
use petreel_models::{TaskId, TaskRecord};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::layout::{check_task_id, OutputLayout};

/// Outcome of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The record was written; holds the record as stored.
    Written(TaskRecord),
    /// The record changed underneath us; holds the fresh record.
    Conflict(TaskRecord),
}

impl WriteOutcome {
    /// The record that is now on disk.
    pub fn into_record(self) -> TaskRecord {
        match self {
            WriteOutcome::Written(r) | WriteOutcome::Conflict(r) => r,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteOutcome::Conflict(_))
    }
}

/// Status store over the output directory.
#[derive(Debug, Clone)]
pub struct StatusStore {
    layout: OutputLayout,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl StatusStore {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Read a task's record. `Ok(None)` when there is no status file.
    pub async fn read(&self, id: &TaskId) -> StorageResult<Option<TaskRecord>> {
        check_task_id(id)?;
        self.read_unchecked(id).await
    }

    /// Write a record unconditionally.
    pub async fn write(&self, id: &TaskId, record: &TaskRecord) -> StorageResult<()> {
        check_task_id(id)?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.persist(id, record).await
    }

    /// Write `new` only if the stored record still matches `expected`.
    ///
    /// The stored record matches when its `revision` and `updated` fields
    /// equal those of `expected`; the worker never bumps `revision` but
    /// always rewrites `updated`. On success `revision` is incremented. A
    /// record that vanished in the meantime is simply recreated.
    pub async fn write_if_unchanged(
        &self,
        id: &TaskId,
        expected: &TaskRecord,
        mut new: TaskRecord,
    ) -> StorageResult<WriteOutcome> {
        check_task_id(id)?;
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        if let Some(current) = self.read_unchecked(id).await? {
            if current.revision != expected.revision || !same_instant(&current, expected) {
                debug!(task_id = %id, "Status record changed concurrently, keeping fresh copy");
                return Ok(WriteOutcome::Conflict(current));
            }
        }

        new.revision = expected.revision + 1;
        self.persist(id, &new).await?;
        Ok(WriteOutcome::Written(new))
    }

    /// Whether the task's prompt file exists.
    ///
    /// The prompt is written before the status file, so its presence shows
    /// that an upload happened even if the record is not there yet.
    pub async fn inputs_exist(&self, id: &TaskId) -> StorageResult<bool> {
        check_task_id(id)?;
        Ok(tokio::fs::try_exists(self.layout.prompt_path(id)).await?)
    }

    /// Persist the prompt and email files of a new upload.
    pub async fn write_inputs(&self, id: &TaskId, message: &str, email: &str) -> StorageResult<()> {
        check_task_id(id)?;
        tokio::fs::write(self.layout.prompt_path(id), message).await?;
        tokio::fs::write(self.layout.email_path(id), email).await?;
        Ok(())
    }

    /// Check the output directory accepts writes.
    pub async fn check_writable(&self) -> StorageResult<()> {
        let probe = self
            .layout
            .root()
            .join(format!(".status-probe-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }

    async fn read_unchecked(&self, id: &TaskId) -> StorageResult<Option<TaskRecord>> {
        let path = self.layout.status_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| {
                warn!(task_id = %id, "Unreadable status file: {}", source);
                StorageError::CorruptRecord {
                    task_id: id.to_string(),
                    source,
                }
            })
    }

    async fn persist(&self, id: &TaskId, record: &TaskRecord) -> StorageResult<()> {
        let path = self.layout.status_path(id);
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &json).await?;
        debug!(task_id = %id, status = %record.status, "Wrote status record");
        Ok(())
    }

    fn lock_for(&self, id: &TaskId) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Compare `updated` at the precision the record is stored with.
fn same_instant(a: &TaskRecord, b: &TaskRecord) -> bool {
    a.updated.as_ref().map(format_timestamp) == b.updated.as_ref().map(format_timestamp)
}

/// Replace a file atomically by writing a sibling temp file and renaming it.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    tokio::fs::write(&tmp, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
