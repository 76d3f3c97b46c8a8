//! Job submitter that launches the pipeline as a local process.
//!
//! Each job runs `PIPELINE_COMMAND PIPELINE_ARGS... <photo> <title>
//! <description> --email <email>`. Output lines go to the task log, and
//! the exit status becomes a result that the status handler can claim.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use petreel_models::{JobResult, TaskId, VideoJob};
use petreel_storage::{extract_result_url, TaskLog};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::memory::InMemoryQueue;
use crate::submitter::{JobSubmitter, ResultSource};

/// Launches one pipeline process per job.
#[derive(Clone)]
pub struct ProcessJobSubmitter {
    command: String,
    args: Vec<String>,
    log: TaskLog,
    results: Arc<InMemoryQueue>,
}

impl ProcessJobSubmitter {
    pub fn new(command: impl Into<String>, args: Vec<String>, log: TaskLog) -> Self {
        Self {
            command: command.into(),
            args,
            log,
            results: Arc::new(InMemoryQueue::new()),
        }
    }

    fn build_command(&self, job: &VideoJob) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(&job.photo_path)
            .arg(&job.product_title)
            .arg(&job.product_description)
            .arg("--email")
            .arg(&job.email)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);
        cmd
    }
}

#[async_trait]
impl JobSubmitter for ProcessJobSubmitter {
    async fn submit(&self, job: &VideoJob) -> QueueResult<()> {
        let mut child = self
            .build_command(job)
            .spawn()
            .map_err(|e| QueueError::LaunchFailed(format!("{}: {}", self.command, e)))?;

        info!(task_id = %job.task_id, pid = ?child.id(), "Launched pipeline process");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let task_id = job.task_id.clone();
        let log = self.log.clone();
        let results = self.results.clone();

        tokio::spawn(async move {
            let out = tokio::spawn(pump(stdout, task_id.clone(), log.clone()));
            let err = tokio::spawn(pump(stderr, task_id.clone(), log.clone()));

            let status = child.wait().await;
            let url = out.await.ok().flatten();
            let err_url = err.await.ok().flatten();

            let result = match status {
                Ok(status) if status.success() => {
                    info!(task_id = %task_id, "Pipeline process finished");
                    JobResult {
                        task_id: task_id.clone(),
                        status: "completed".to_string(),
                        video_url: url.or(err_url),
                        error: None,
                    }
                }
                Ok(status) => {
                    warn!(task_id = %task_id, %status, "Pipeline process failed");
                    JobResult::failed(task_id.clone(), format!("Pipeline exited with {status}"))
                }
                Err(e) => {
                    error!(task_id = %task_id, "Failed to wait for pipeline: {}", e);
                    JobResult::failed(task_id.clone(), e.to_string())
                }
            };

            if let Err(e) = log
                .append(&task_id, &format!("Pipeline finished: {}", result.status))
                .await
            {
                warn!(task_id = %task_id, "Failed to write task log: {}", e);
            }
            results.push_result(result);
        });

        Ok(())
    }

    async fn check_connectivity(&self) -> QueueResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

#[async_trait]
impl ResultSource for ProcessJobSubmitter {
    async fn claim_result(&self, id: &TaskId) -> QueueResult<Option<JobResult>> {
        self.results.claim_result(id).await
    }

    async fn release_result(&self, result: &JobResult) -> QueueResult<()> {
        self.results.release_result(result).await
    }
}

/// Copy a child stream into the task log; returns the last result URL seen.
async fn pump<R>(stream: Option<R>, task_id: TaskId, log: TaskLog) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let stream = stream?;
    let mut lines = BufReader::new(stream).lines();
    let mut url = None;

    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(found) = extract_result_url(&line) {
            url = Some(found);
        }
        if let Err(e) = log.append(&task_id, &line).await {
            warn!(task_id = %task_id, "Failed to write task log: {}", e);
        }
    }
    url
}
