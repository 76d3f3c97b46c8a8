//! Locating generated videos on local disk.

use std::path::{Path, PathBuf};

use petreel_models::{is_remote_url, TaskId, TaskRecord};
use tracing::debug;

use crate::error::StorageResult;
use crate::layout::{check_task_id, OutputLayout};

/// Finds the video file belonging to a task.
#[derive(Debug, Clone)]
pub struct VideoLocator {
    layout: OutputLayout,
    sample: Option<PathBuf>,
}

impl VideoLocator {
    pub fn new(layout: OutputLayout, sample: Option<PathBuf>) -> Self {
        Self { layout, sample }
    }

    /// Resolve the video to serve for a task.
    ///
    /// Tries, in order: the record's `videoPath`, the first `.mp4` in the
    /// output directory whose name contains the task id, and the sample
    /// video.
    pub async fn resolve(
        &self,
        id: &TaskId,
        record: Option<&TaskRecord>,
    ) -> StorageResult<Option<PathBuf>> {
        check_task_id(id)?;

        if let Some(path) = record.and_then(local_video_path) {
            if tokio::fs::try_exists(&path).await? {
                return Ok(Some(path));
            }
            debug!(task_id = %id, "Recorded video {} is missing", path.display());
        }

        if let Some(path) = self.find_by_id(id).await? {
            return Ok(Some(path));
        }

        if let Some(sample) = &self.sample {
            if tokio::fs::try_exists(sample).await? {
                debug!(task_id = %id, "Serving sample video");
                return Ok(Some(sample.clone()));
            }
        }

        Ok(None)
    }

    /// Whether a record has no reachable video: no remote result and no
    /// local `videoPath` that exists on disk.
    pub async fn recorded_video_missing(&self, record: &TaskRecord) -> StorageResult<bool> {
        if record.has_remote_result() {
            return Ok(false);
        }
        match local_video_path(record) {
            Some(path) => Ok(!tokio::fs::try_exists(&path).await?),
            None => Ok(true),
        }
    }

    /// First `.mp4` (by name) in the output directory containing the id.
    async fn find_by_id(&self, id: &TaskId) -> StorageResult<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(self.layout.root()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut matches = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(id.as_str()) && name.ends_with(".mp4") {
                matches.push(name);
            }
        }
        matches.sort();

        Ok(matches.into_iter().next().map(|name| self.layout.root().join(name)))
    }
}

/// Local `videoPath` of a record, ignoring remote locations.
fn local_video_path(record: &TaskRecord) -> Option<PathBuf> {
    record
        .video_path
        .as_deref()
        .filter(|p| !p.is_empty() && !is_remote_url(p))
        .map(Path::new)
        .map(Path::to_path_buf)
}
