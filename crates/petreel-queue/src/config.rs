//! Queue configuration.

use std::str::FromStr;

use crate::error::QueueError;

/// How jobs reach the video pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitterKind {
    /// Push onto a Redis list consumed by the worker
    #[default]
    Redis,
    /// Launch the pipeline as a local process per job
    Process,
    /// Keep jobs in memory (development and tests)
    Memory,
}

impl FromStr for SubmitterKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "process" => Ok(Self::Process),
            "memory" => Ok(Self::Memory),
            other => Err(QueueError::Config(format!("unknown JOB_SUBMITTER: {other}"))),
        }
    }
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub submitter: SubmitterKind,
    /// Redis URL
    pub redis_url: String,
    /// List the worker pops jobs from
    pub tasks_list: String,
    /// List the worker pushes results onto
    pub results_list: String,
    /// Set QUEUED on the task record once the job is submitted
    pub mark_queued: bool,
    /// How many result entries a single claim scans
    pub result_scan_limit: usize,
    /// Pipeline executable for the process submitter
    pub pipeline_command: String,
    /// Arguments placed before the per-job arguments
    pub pipeline_args: Vec<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            submitter: SubmitterKind::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            tasks_list: "pet_video_tasks".to_string(),
            results_list: "pet_video_results".to_string(),
            mark_queued: false,
            result_scan_limit: 1000,
            pipeline_command: "python3".to_string(),
            pipeline_args: vec!["product_marketing_automation.py".to_string()],
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, QueueError> {
        let defaults = Self::default();

        let submitter = match std::env::var("JOB_SUBMITTER") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.submitter,
        };

        Ok(Self {
            submitter,
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            tasks_list: std::env::var("QUEUE_TASKS_LIST").unwrap_or(defaults.tasks_list),
            results_list: std::env::var("QUEUE_RESULTS_LIST").unwrap_or(defaults.results_list),
            mark_queued: std::env::var("QUEUE_MARK_QUEUED")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.mark_queued),
            result_scan_limit: std::env::var("QUEUE_RESULT_SCAN_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.result_scan_limit),
            pipeline_command: std::env::var("PIPELINE_COMMAND").unwrap_or(defaults.pipeline_command),
            pipeline_args: std::env::var("PIPELINE_ARGS")
                .map(|v| v.split_whitespace().map(String::from).collect())
                .unwrap_or(defaults.pipeline_args),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_worker_lists() {
        let config = QueueConfig::default();
        assert_eq!(config.tasks_list, "pet_video_tasks");
        assert_eq!(config.results_list, "pet_video_results");
        assert!(!config.mark_queued);
    }

    #[test]
    fn test_submitter_kind_parse() {
        assert_eq!("Redis".parse::<SubmitterKind>().unwrap(), SubmitterKind::Redis);
        assert_eq!("process".parse::<SubmitterKind>().unwrap(), SubmitterKind::Process);
        assert_eq!("memory".parse::<SubmitterKind>().unwrap(), SubmitterKind::Memory);
        assert!("kafka".parse::<SubmitterKind>().is_err());
    }
}
