//! Status reconciliation.
//!
//! A stored record can lag behind reality: the worker may have reported a
//! result on the results list, logged the CDN URL, or claimed completion
//! before the video reached disk. Reconciliation folds that evidence into
//! the record and persists the correction with a conditional write.

use petreel_models::{stages, JobOutcome, JobResult, TaskId, TaskRecord, TaskStatus};
use petreel_storage::WriteOutcome;
use tracing::{debug, error, info, warn};

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

/// Attempts before giving up on a record that keeps changing underneath us.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// What reconciliation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// COMPLETE without a reachable video, set back to PROCESSING
    Downgraded,
    /// Promoted from a claimed result
    Completed,
    Failed,
    /// Result URL picked up from the task log
    UrlScraped,
}

impl Correction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Correction::None => "none",
            Correction::Downgraded => "downgraded",
            Correction::Completed => "completed",
            Correction::Failed => "failed",
            Correction::UrlScraped => "url_scraped",
        }
    }
}

/// Reconciles one task's record.
pub struct Reconciler<'a> {
    state: &'a AppState,
    id: &'a TaskId,
    claimed: Option<JobResult>,
    claim_attempted: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(state: &'a AppState, id: &'a TaskId) -> Self {
        Self {
            state,
            id,
            claimed: None,
            claim_attempted: false,
        }
    }

    /// Reconcile `record` and return the record as now stored.
    ///
    /// A result claimed from the results list is re-applied if the record
    /// changed concurrently. If it still cannot be persisted it goes back on
    /// the results list for a later status check.
    pub async fn run(mut self, record: TaskRecord) -> ApiResult<TaskRecord> {
        let mut current = record;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (next, correction) = match self.apply(&current).await {
                Ok(applied) => applied,
                Err(e) => {
                    self.release_claim().await;
                    return Err(e);
                }
            };
            if correction == Correction::None {
                // A record that went terminal concurrently leaves the claim unused
                self.release_claim().await;
                return Ok(current);
            }

            let outcome = match self
                .state
                .status
                .write_if_unchanged(self.id, &current, next)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.release_claim().await;
                    return Err(e.into());
                }
            };

            match outcome {
                WriteOutcome::Written(stored) => {
                    info!(
                        task_id = %self.id,
                        status = %stored.status,
                        correction = correction.as_str(),
                        "Reconciled task status"
                    );
                    metrics::record_reconciliation(correction.as_str());
                    return Ok(stored);
                }
                WriteOutcome::Conflict(fresh) => {
                    debug!(task_id = %self.id, attempt, "Record changed during reconciliation");
                    current = fresh;
                }
            }
        }

        warn!(task_id = %self.id, "Record kept changing, reconciliation not persisted");
        self.release_claim().await;
        Ok(current)
    }

    /// Put an unpersisted claimed result back on the results list.
    async fn release_claim(&mut self) {
        let Some(result) = self.claimed.take() else {
            return;
        };
        match self.state.results.release_result(&result).await {
            Ok(()) => debug!(task_id = %self.id, "Returned claimed result to the results list"),
            Err(e) => error!(
                task_id = %self.id,
                result = ?result,
                "Lost claimed result, could not return it to the results list: {}",
                e
            ),
        }
    }

    /// Compute the corrected record without writing it.
    async fn apply(&mut self, record: &TaskRecord) -> ApiResult<(TaskRecord, Correction)> {
        let mut next = record.clone();
        let mut correction = Correction::None;

        if next.result_url.is_none() {
            if let Some(url) = self.state.task_log.scrape_result_url(self.id).await? {
                debug!(task_id = %self.id, "Found result URL in task log");
                next.result_url = Some(url);
                correction = Correction::UrlScraped;
            }
        }

        if !next.is_terminal() {
            if let Some(result) = self.claim().await {
                match result.outcome() {
                    JobOutcome::Completed { video_url } => {
                        next.complete(video_url);
                        correction = Correction::Completed;
                    }
                    JobOutcome::Failed { error } => {
                        next.fail(stages::GENERATION_FAILED, error);
                        correction = Correction::Failed;
                    }
                    JobOutcome::Unknown(status) => {
                        warn!(task_id = %self.id, %status, "Ignoring result with unknown status");
                    }
                }
            }
        }

        // Checked last so a completion claimed above is held to the same rule
        if next.status == TaskStatus::Complete
            && self.state.videos.recorded_video_missing(&next).await?
        {
            next.set_status(TaskStatus::Processing, stages::FINALIZING);
            correction = Correction::Downgraded;
        }

        Ok((next, correction))
    }

    /// Claim this task's result once per reconciliation.
    ///
    /// A queue outage must not make the status route fail, so errors are
    /// logged and treated as "no result yet".
    async fn claim(&mut self) -> Option<JobResult> {
        if !self.claim_attempted {
            self.claim_attempted = true;
            match self.state.results.claim_result(self.id).await {
                Ok(Some(result)) => {
                    metrics::record_result_claimed(&result.status);
                    self.claimed = Some(result);
                }
                Ok(None) => {}
                Err(e) => warn!(task_id = %self.id, "Failed to check results list: {}", e),
            }
        }
        self.claimed.clone()
    }
}
