//! Job hand-off to the PetReel video pipeline.
//!
//! This crate provides:
//! - `JobSubmitter` / `ResultSource` traits used by the API
//! - Redis list queue (`pet_video_tasks` / `pet_video_results`)
//! - Local process launcher and in-memory queue

pub mod config;
pub mod error;
pub mod memory;
pub mod process;
pub mod queue;
pub mod submitter;

use std::sync::Arc;

use petreel_storage::TaskLog;

pub use config::{QueueConfig, SubmitterKind};
pub use error::{QueueError, QueueResult};
pub use memory::InMemoryQueue;
pub use process::ProcessJobSubmitter;
pub use queue::RedisJobQueue;
pub use submitter::{JobSubmitter, ResultSource};

/// Submitter and result source selected by configuration.
#[derive(Clone)]
pub struct QueueHandles {
    pub submitter: Arc<dyn JobSubmitter>,
    pub results: Arc<dyn ResultSource>,
}

impl QueueHandles {
    /// Use one value for both roles.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: JobSubmitter + ResultSource + 'static,
    {
        Self {
            submitter: backend.clone(),
            results: backend,
        }
    }
}

/// Build the queue backend named by `config.submitter`.
pub fn connect(config: &QueueConfig, log: TaskLog) -> QueueResult<QueueHandles> {
    Ok(match config.submitter {
        SubmitterKind::Redis => QueueHandles::shared(Arc::new(RedisJobQueue::new(config.clone())?)),
        SubmitterKind::Process => QueueHandles::shared(Arc::new(ProcessJobSubmitter::new(
            config.pipeline_command.clone(),
            config.pipeline_args.clone(),
            log,
        ))),
        SubmitterKind::Memory => QueueHandles::shared(Arc::new(InMemoryQueue::new())),
    })
}
