//! Job queue on Redis lists.
//!
//! Jobs are `RPUSH`ed onto the tasks list and popped by the worker from the
//! head. The worker reports outcomes by pushing onto the results list,
//! which this service scans and claims entries from with `LREM`.

use async_trait::async_trait;
use petreel_models::{JobOutcome, JobResult, TaskId, VideoJob};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::submitter::{JobSubmitter, ResultSource};

/// Redis list queue client.
#[derive(Clone)]
pub struct RedisJobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisJobQueue {
    /// Create a new queue client. Does not connect yet.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn conn(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Ping the server.
    pub async fn ping(&self) -> QueueResult<String> {
        let mut conn = self.conn().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    /// Number of jobs waiting for the worker.
    pub async fn len(&self) -> QueueResult<usize> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(&self.config.tasks_list).await?)
    }

    /// Number of unclaimed results.
    pub async fn results_len(&self) -> QueueResult<usize> {
        let mut conn = self.conn().await?;
        Ok(conn.llen(&self.config.results_list).await?)
    }

    /// Raw payloads of up to `limit` waiting jobs, head first.
    pub async fn pending_jobs(&self, limit: usize) -> QueueResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        Ok(conn
            .lrange(&self.config.tasks_list, 0, limit as isize - 1)
            .await?)
    }

    /// Payload of the next job the worker will pop, without removing it.
    pub async fn peek(&self) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        Ok(conn.lindex(&self.config.tasks_list, 0).await?)
    }

    /// Push a result as the worker would. Used by tooling and tests.
    pub async fn push_result(&self, result: &JobResult) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(result)?;
        conn.rpush::<_, _, ()>(&self.config.results_list, payload)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobSubmitter for RedisJobQueue {
    async fn submit(&self, job: &VideoJob) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(job)?;

        let depth: usize = conn.rpush(&self.config.tasks_list, &payload).await?;

        info!(
            task_id = %job.task_id,
            queue = %self.config.tasks_list,
            depth,
            "Enqueued video job"
        );
        Ok(())
    }

    async fn check_connectivity(&self) -> QueueResult<()> {
        self.ping().await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[async_trait]
impl ResultSource for RedisJobQueue {
    async fn claim_result(&self, id: &TaskId) -> QueueResult<Option<JobResult>> {
        let mut conn = self.conn().await?;
        let limit = self.config.result_scan_limit as isize;
        let entries: Vec<String> = conn
            .lrange(&self.config.results_list, 0, limit - 1)
            .await?;

        for raw in entries {
            let result: JobResult = match serde_json::from_str(&raw) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping malformed result entry: {}", e);
                    continue;
                }
            };
            if result.task_id != *id {
                continue;
            }
            if let JobOutcome::Unknown(status) = result.outcome() {
                warn!(task_id = %id, %status, "Leaving result with unknown status");
                continue;
            }

            // Only the caller whose LREM removed the entry owns it.
            let removed: i64 = conn.lrem(&self.config.results_list, 1, &raw).await?;
            if removed == 1 {
                info!(task_id = %id, status = %result.status, "Claimed job result");
                return Ok(Some(result));
            }
            debug!(task_id = %id, "Result entry claimed by another reader");
        }

        Ok(None)
    }

    async fn release_result(&self, result: &JobResult) -> QueueResult<()> {
        self.push_result(result).await?;
        info!(task_id = %result.task_id, "Returned job result to results list");
        Ok(())
    }
}
