//! Seams between the API and the video pipeline.

use async_trait::async_trait;
use petreel_models::{JobResult, TaskId, VideoJob};

use crate::error::QueueResult;

/// Hands jobs to the video pipeline.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submit a job. Returns once the job is accepted, never waits for it.
    async fn submit(&self, job: &VideoJob) -> QueueResult<()>;

    /// Check the pipeline can accept jobs.
    async fn check_connectivity(&self) -> QueueResult<()>;

    /// Short name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Source of results reported by the pipeline.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Remove and return the result for a task, if one is waiting.
    ///
    /// A given result entry is returned to at most one caller, even when
    /// several callers claim the same task concurrently. Entries whose
    /// status is not recognised are left in place.
    async fn claim_result(&self, id: &TaskId) -> QueueResult<Option<JobResult>>;

    /// Return a claimed result that could not be applied.
    async fn release_result(&self, result: &JobResult) -> QueueResult<()>;
}
