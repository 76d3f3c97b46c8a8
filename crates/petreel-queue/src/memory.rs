//! In-process queue for development and tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use petreel_models::{JobOutcome, JobResult, TaskId, VideoJob};
use tracing::info;

use crate::error::QueueResult;
use crate::submitter::{JobSubmitter, ResultSource};

/// Queue held in memory. Jobs are never processed unless something pops
/// them and pushes a result back.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    jobs: Mutex<VecDeque<VideoJob>>,
    results: Mutex<Vec<JobResult>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest job, as a worker would.
    pub fn pop_job(&self) -> Option<VideoJob> {
        lock(&self.jobs).pop_front()
    }

    /// Snapshot of waiting jobs.
    pub fn jobs(&self) -> Vec<VideoJob> {
        lock(&self.jobs).iter().cloned().collect()
    }

    /// Report a result, as a worker would.
    pub fn push_result(&self, result: JobResult) {
        lock(&self.results).push(result);
    }

    pub fn results_len(&self) -> usize {
        lock(&self.results).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl JobSubmitter for InMemoryQueue {
    async fn submit(&self, job: &VideoJob) -> QueueResult<()> {
        lock(&self.jobs).push_back(job.clone());
        info!(task_id = %job.task_id, "Queued video job in memory");
        Ok(())
    }

    async fn check_connectivity(&self) -> QueueResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ResultSource for InMemoryQueue {
    async fn claim_result(&self, id: &TaskId) -> QueueResult<Option<JobResult>> {
        let mut results = lock(&self.results);
        Ok(results
            .iter()
            .position(|r| r.task_id == *id && !matches!(r.outcome(), JobOutcome::Unknown(_)))
            .map(|idx| results.remove(idx)))
    }

    async fn release_result(&self, result: &JobResult) -> QueueResult<()> {
        lock(&self.results).push(result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fifo_jobs() {
        let queue = InMemoryQueue::new();
        for id in ["A", "B"] {
            let job = VideoJob::new(TaskId::from(id), "/tmp/x.jpg", "hi", "a@b.com");
            queue.submit(&job).await.unwrap();
        }
        assert_eq!(queue.jobs().len(), 2);
        assert_eq!(queue.pop_job().unwrap().task_id, TaskId::from("A"));
        assert_eq!(queue.pop_job().unwrap().task_id, TaskId::from("B"));
        assert!(queue.pop_job().is_none());
    }

    #[tokio::test]
    async fn test_claim_removes_only_matching_entry() {
        let queue = InMemoryQueue::new();
        queue.push_result(JobResult::completed(TaskId::from("A"), "https://cdn/a.mp4"));
        queue.push_result(JobResult::failed(TaskId::from("B"), "boom"));

        let claimed = queue.claim_result(&TaskId::from("B")).await.unwrap().unwrap();
        assert_eq!(claimed.error.as_deref(), Some("boom"));
        assert_eq!(queue.results_len(), 1);
        assert!(queue.claim_result(&TaskId::from("B")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_status_is_left_in_place() {
        let queue = InMemoryQueue::new();
        let id = TaskId::from("T1");
        queue.push_result(JobResult {
            status: "in_progress".into(),
            ..JobResult::failed(id.clone(), "x")
        });

        assert!(queue.claim_result(&id).await.unwrap().is_none());
        assert_eq!(queue.results_len(), 1);
    }

    #[tokio::test]
    async fn test_released_result_can_be_claimed_again() {
        let queue = InMemoryQueue::new();
        let id = TaskId::from("T1");
        queue.push_result(JobResult::completed(id.clone(), "https://cdn/x.mp4"));

        let claimed = queue.claim_result(&id).await.unwrap().unwrap();
        queue.release_result(&claimed).await.unwrap();
        assert_eq!(queue.claim_result(&id).await.unwrap(), Some(claimed));
    }

    #[tokio::test]
    async fn test_concurrent_claims_see_entry_once() {
        let queue = Arc::new(InMemoryQueue::new());
        queue.push_result(JobResult::completed(TaskId::from("T1"), "https://cdn/x.mp4"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.claim_result(&TaskId::from("T1")).await.unwrap() })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }
}
