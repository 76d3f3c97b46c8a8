//! Status polling for a single task.
//!
//! Requests in flight are never cancelled. A shared stop flag is checked
//! before each next poll is scheduled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use petreel_models::{TaskId, TaskStatus};
use tracing::{debug, warn};

use crate::client::{PetReelClient, StatusReply};
use crate::error::ClientError;
use crate::policy::PollPolicy;

const NO_VIDEO_LINK: &str =
    "Processing finished, but there was an issue getting the video link. Please contact support.";
const GENERATION_FAILED: &str = "Video generation failed. Please try again.";
const GAVE_UP: &str =
    "Failed to get processing status after multiple attempts. Please try again or contact support.";

/// How polling ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { result_url: String },
    Failed { reason: String },
    /// The stop flag was raised.
    Stopped,
}

/// Polls one task until it reaches a terminal status.
pub struct Poller {
    client: PetReelClient,
    policy: PollPolicy,
    stop: Arc<AtomicBool>,
}

impl Poller {
    pub fn new(client: PetReelClient, policy: PollPolicy) -> Self {
        Self {
            client,
            policy,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops polling once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Poll until the task completes, fails, the retry budget runs out or
    /// the stop flag is raised. `on_update` sees every status reply.
    pub async fn run<F>(&self, id: &TaskId, mut on_update: F) -> PollOutcome
    where
        F: FnMut(&StatusReply),
    {
        let mut retries: u32 = 0;

        loop {
            if self.stopped() {
                return PollOutcome::Stopped;
            }

            let delay = match self.client.status(id).await {
                Ok(reply) => {
                    on_update(&reply);
                    match reply.task_status() {
                        Some(TaskStatus::Complete) => {
                            return match reply.result_url {
                                Some(result_url) => PollOutcome::Completed { result_url },
                                None => PollOutcome::Failed {
                                    reason: NO_VIDEO_LINK.to_string(),
                                },
                            };
                        }
                        Some(TaskStatus::Failed) => {
                            return PollOutcome::Failed {
                                reason: reply.error.unwrap_or_else(|| GENERATION_FAILED.to_string()),
                            };
                        }
                        Some(TaskStatus::Processing | TaskStatus::Queued) => {
                            retries = 0;
                            self.policy.processing_delay
                        }
                        Some(TaskStatus::Pending) => {
                            retries = 0;
                            self.policy.pending_delay
                        }
                        None => {
                            warn!(task_id = %id, status = %reply.status, "Unknown task status");
                            retries = 0;
                            self.policy.pending_delay
                        }
                    }
                }
                Err(ClientError::NotFound) if retries < self.policy.not_found_budget => {
                    retries += 1;
                    debug!(task_id = %id, attempt = retries, "Task not found yet, retrying");
                    self.policy.backoff(retries)
                }
                Err(e) => {
                    retries += 1;
                    warn!(task_id = %id, attempt = retries, "Failed to poll status: {}", e);
                    if retries > self.policy.error_budget {
                        return PollOutcome::Failed {
                            reason: GAVE_UP.to_string(),
                        };
                    }
                    self.policy.backoff(retries)
                }
            };

            if self.stopped() {
                return PollOutcome::Stopped;
            }
            tokio::time::sleep(delay).await;
        }
    }
}
