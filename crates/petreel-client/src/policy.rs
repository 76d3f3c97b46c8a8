//! Poll timing.

use std::time::Duration;

/// Delays and retry budgets of the status poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after a PENDING (or unrecognised) status
    pub pending_delay: Duration,
    /// Delay after a QUEUED or PROCESSING status
    pub processing_delay: Duration,
    /// 404 answers tolerated in a row before they count as errors
    pub not_found_budget: u32,
    /// Consecutive failures after which polling gives up
    pub error_budget: u32,
    pub backoff_base: Duration,
    pub backoff_step: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            pending_delay: Duration::from_secs(5),
            processing_delay: Duration::from_secs(2),
            not_found_budget: 5,
            error_budget: 15,
            backoff_base: Duration::from_secs(3),
            backoff_step: Duration::from_secs(1),
        }
    }
}

impl PollPolicy {
    /// Delay after the `retries`-th consecutive failure.
    pub fn backoff(&self, retries: u32) -> Duration {
        self.backoff_base + self.backoff_step * retries
    }

    /// A policy with every delay scaled down to milliseconds.
    pub fn fast() -> Self {
        Self {
            pending_delay: Duration::from_millis(5),
            processing_delay: Duration::from_millis(2),
            backoff_base: Duration::from_millis(3),
            backoff_step: Duration::from_millis(1),
            ..Self::default()
        }
    }
}
