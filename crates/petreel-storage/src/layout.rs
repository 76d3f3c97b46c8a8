//! File naming inside the output directory.

use std::path::{Path, PathBuf};

use petreel_models::{is_valid_task_id, TaskId};

use crate::error::{StorageError, StorageResult};

/// Paths of every file belonging to a task.
///
/// All per-task files live flat in one directory and share the task id as
/// their prefix; the worker relies on the same names.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the output directory if needed.
    pub async fn ensure_dir(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn photo_path(&self, id: &TaskId, ext: &str) -> PathBuf {
        self.root.join(format!("{id}.{ext}"))
    }

    pub fn prompt_path(&self, id: &TaskId) -> PathBuf {
        self.root.join(format!("{id}.txt"))
    }

    pub fn email_path(&self, id: &TaskId) -> PathBuf {
        self.root.join(format!("{id}_email.txt"))
    }

    pub fn status_path(&self, id: &TaskId) -> PathBuf {
        self.root.join(format!("{id}_status.json"))
    }

    pub fn log_path(&self, id: &TaskId) -> PathBuf {
        self.root.join(format!("{id}_processing.log"))
    }
}

/// Reject ids that could name a file outside the output directory.
pub(crate) fn check_task_id(id: &TaskId) -> StorageResult<()> {
    if is_valid_task_id(id.as_str()) {
        Ok(())
    } else {
        Err(StorageError::InvalidTaskId(id.to_string()))
    }
}
