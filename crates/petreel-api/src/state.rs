//! Application state.

use std::sync::Arc;

use petreel_payments::{PaymentConfig, StripeClient};
use petreel_queue::{JobSubmitter, QueueConfig, QueueHandles, ResultSource};
use petreel_storage::{
    ArtifactBackend, ArtifactStore, LocalArtifactStore, OutputLayout, R2ArtifactStore,
    StatusStore, StorageConfig, TaskLog, VideoLocator,
};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub status: StatusStore,
    pub task_log: TaskLog,
    pub videos: VideoLocator,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub submitter: Arc<dyn JobSubmitter>,
    pub results: Arc<dyn ResultSource>,
    pub payments: Arc<StripeClient>,
    /// Set QUEUED (rather than keep PENDING) once a job is submitted
    pub mark_queued: bool,
}

impl AppState {
    /// Create application state from environment variables.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let storage_config = StorageConfig::from_env()?;
        let queue_config = QueueConfig::from_env()?;
        let layout = OutputLayout::new(&storage_config.output_dir);
        layout.ensure_dir().await?;

        let artifacts: Arc<dyn ArtifactStore> = match storage_config.artifact_backend {
            ArtifactBackend::Local => Arc::new(LocalArtifactStore::new(layout.clone())),
            ArtifactBackend::R2 => Arc::new(R2ArtifactStore::from_env()?),
        };

        let queue = petreel_queue::connect(&queue_config, TaskLog::new(layout.clone()))?;
        let payments = StripeClient::new(PaymentConfig::from_env())?;

        info!(
            output_dir = %storage_config.output_dir.display(),
            artifacts = artifacts.backend(),
            submitter = queue.submitter.name(),
            "Storage and queue configured"
        );

        Ok(Self::new(
            config,
            &storage_config,
            artifacts,
            queue,
            queue_config.mark_queued,
            payments,
        ))
    }

    /// Assemble state from already-built parts.
    pub fn new(
        config: ApiConfig,
        storage_config: &StorageConfig,
        artifacts: Arc<dyn ArtifactStore>,
        queue: QueueHandles,
        mark_queued: bool,
        payments: StripeClient,
    ) -> Self {
        let layout = OutputLayout::new(&storage_config.output_dir);
        Self {
            config,
            status: StatusStore::new(layout.clone()),
            task_log: TaskLog::new(layout.clone()),
            videos: VideoLocator::new(layout, storage_config.sample_video_path.clone()),
            artifacts,
            submitter: queue.submitter,
            results: queue.results,
            payments: Arc::new(payments),
            mark_queued,
        }
    }
}
