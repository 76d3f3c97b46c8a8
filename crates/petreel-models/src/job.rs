//! Queue contract shared with the external video worker.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Product title sent with every job; the worker uses it in its prompt.
pub const PRODUCT_TITLE: &str = "Dog Birthday Video";

/// Job pushed onto the task list for the worker to consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoJob {
    /// Task the job belongs to
    pub task_id: TaskId,
    /// Uploaded photo (local path or remote URL)
    pub photo_path: String,
    /// Fixed product title
    pub product_title: String,
    /// Free-text prompt entered by the user
    pub product_description: String,
    /// Where the worker sends the finished video
    pub email: String,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

impl VideoJob {
    pub fn new(
        task_id: TaskId,
        photo_path: impl Into<String>,
        description: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            photo_path: photo_path.into(),
            product_title: PRODUCT_TITLE.to_string(),
            product_description: description.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

/// Record the worker pushes onto the results list when a job ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobResult {
    pub task_id: TaskId,
    /// Free-form status string, see [`JobResult::outcome`]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Interpreted result of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { video_url: Option<String> },
    Failed { error: String },
    /// Status string the service does not recognise; the entry is ignored.
    Unknown(String),
}

impl JobResult {
    pub fn completed(task_id: TaskId, video_url: impl Into<String>) -> Self {
        Self {
            task_id,
            status: "completed".to_string(),
            video_url: Some(video_url.into()),
            error: None,
        }
    }

    pub fn failed(task_id: TaskId, error: impl Into<String>) -> Self {
        Self {
            task_id,
            status: "failed".to_string(),
            video_url: None,
            error: Some(error.into()),
        }
    }

    /// Interpret the status string.
    pub fn outcome(&self) -> JobOutcome {
        match self.status.trim().to_ascii_lowercase().as_str() {
            "completed" | "complete" | "success" | "succeeded" => JobOutcome::Completed {
                video_url: self.video_url.clone(),
            },
            "failed" | "error" => JobOutcome::Failed {
                error: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "Video generation failed".to_string()),
            },
            other => JobOutcome::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_wire_format() {
        let job = VideoJob::new(TaskId::from("T1"), "/srv/Output/T1.jpg", "Happy Birthday Rex", "a@b.com");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["task_id"], "T1");
        assert_eq!(json["photo_path"], "/srv/Output/T1.jpg");
        assert_eq!(json["product_title"], PRODUCT_TITLE);
        assert_eq!(json["product_description"], "Happy Birthday Rex");
        assert_eq!(json["email"], "a@b.com");
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_result_outcomes() {
        let done: JobResult = serde_json::from_str(
            r#"{"task_id":"T1","status":"completed","video_url":"https://cdn/x.mp4"}"#,
        )
        .unwrap();
        assert_eq!(
            done.outcome(),
            JobOutcome::Completed { video_url: Some("https://cdn/x.mp4".into()) }
        );

        let failed: JobResult = serde_json::from_str(r#"{"task_id":"T1","status":"ERROR"}"#).unwrap();
        assert_eq!(
            failed.outcome(),
            JobOutcome::Failed { error: "Video generation failed".into() }
        );

        let odd = JobResult { status: "paused".into(), ..JobResult::failed(TaskId::from("T1"), "x") };
        assert_eq!(odd.outcome(), JobOutcome::Unknown("paused".into()));
    }
}
