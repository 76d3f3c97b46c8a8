//! Where uploaded photos go.
//!
//! The location returned by a store is what the worker receives as
//! `photo_path`: a local path or a remote URL.

use std::path::PathBuf;

use async_trait::async_trait;
use petreel_models::TaskId;
use tracing::info;

use crate::error::StorageResult;
use crate::layout::{check_task_id, OutputLayout};

/// Storage for uploaded input artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a task's photo and return its location.
    async fn store_photo(&self, id: &TaskId, ext: &str, data: Vec<u8>) -> StorageResult<String>;

    /// Check the backing store is reachable and writable.
    async fn check_connectivity(&self) -> StorageResult<()>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Photos stored next to the task files in the output directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    layout: OutputLayout,
}

impl LocalArtifactStore {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store_photo(&self, id: &TaskId, ext: &str, data: Vec<u8>) -> StorageResult<String> {
        check_task_id(id)?;
        let path = self.layout.photo_path(id, ext);
        let size = data.len();
        tokio::fs::write(&path, data).await?;

        // The worker runs with its own working directory.
        let location = absolute(path);
        info!(task_id = %id, size, "Stored photo at {}", location.display());
        Ok(location.to_string_lossy().into_owned())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        let probe = self
            .layout
            .root()
            .join(format!(".probe-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

/// MIME type for a photo extension.
pub fn photo_content_type(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}
