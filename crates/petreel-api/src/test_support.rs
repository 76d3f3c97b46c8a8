//! Unit-test fixtures.

use std::sync::Arc;

use petreel_payments::{PaymentConfig, StripeClient};
use petreel_queue::{InMemoryQueue, QueueHandles};
use petreel_storage::{LocalArtifactStore, OutputLayout, StorageConfig};
use tempfile::TempDir;

use crate::config::ApiConfig;
use crate::state::AppState;

/// State over a temporary output directory and an in-memory queue.
pub struct TestApp {
    pub state: AppState,
    pub queue: Arc<InMemoryQueue>,
    dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig::for_dir(dir.path());
        let queue = Arc::new(InMemoryQueue::new());
        let artifacts = Arc::new(LocalArtifactStore::new(OutputLayout::new(dir.path())));

        let state = AppState::new(
            ApiConfig::default(),
            &storage,
            artifacts,
            QueueHandles::shared(queue.clone()),
            false,
            StripeClient::new(PaymentConfig::default()).unwrap(),
        );

        Self {
            state,
            queue,
            dir,
        }
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(self.dir.path())
    }
}
