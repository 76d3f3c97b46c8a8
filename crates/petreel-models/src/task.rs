//! Task records and the status lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Human-readable stage descriptions shown by the client while polling.
pub mod stages {
    pub const QUEUED_FOR_PROCESSING: &str = "Queued for processing...";
    pub const WAITING_FOR_WORKER: &str = "Waiting for worker processing...";
    pub const INITIALIZING: &str = "Initializing...";
    pub const FINALIZING: &str = "Finalizing your video...";
    pub const DELIVERED: &str = "Video sent to your email!";
    pub const QUEUE_FAILED: &str = "Failed to queue task";
    pub const GENERATION_FAILED: &str = "Video generation failed";
}

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Task status as recorded in the status file.
///
/// There is no enforced transition table: the upload handler, the status
/// handler and the external worker may each write any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task recorded, not yet picked up
    #[default]
    Pending,
    /// Job handed to the queue
    Queued,
    /// Worker is generating the video
    Processing,
    /// Video generated and delivered
    Complete,
    /// Generation or hand-off failed
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Complete => "COMPLETE",
            TaskStatus::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Case-insensitive; accepts the spellings the worker has used over time.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "QUEUED" => Ok(TaskStatus::Queued),
            "PROCESSING" | "RUNNING" => Ok(TaskStatus::Processing),
            "COMPLETE" | "COMPLETED" | "SUCCEEDED" => Ok(TaskStatus::Complete),
            "FAILED" | "ERROR" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A task's current state as stored in `{id}_status.json`.
///
/// Field names follow the file format shared with the worker, which mixes
/// camelCase (`userEmail`, `videoPath`) and snake_case (`result_url`,
/// `queued_at`). Fields this service does not know about are kept in
/// `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub status: TaskStatus,

    #[serde(default)]
    pub stage: String,

    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub queued_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<DateTime<Utc>>,

    /// Remote location of the generated video (CDN URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    /// Local path of the generated video
    #[serde(
        default,
        rename = "videoPath",
        alias = "video_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(
        default,
        rename = "userEmail",
        alias = "user_email",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_email: Option<String>,

    /// Bumped by every optimistic write from this service
    #[serde(default, skip_serializing_if = "is_zero")]
    pub revision: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    /// Create the initial record written by the upload handler.
    pub fn pending(user_email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            status: TaskStatus::Pending,
            stage: stages::QUEUED_FOR_PROCESSING.to_string(),
            created: Some(now),
            updated: Some(now),
            queued_at: None,
            completed: None,
            result_url: None,
            video_path: None,
            error: None,
            user_email,
            revision: 0,
            extra: Map::new(),
        }
    }

    /// Record returned for a task whose inputs exist but whose status file
    /// has not been written yet.
    pub fn initializing() -> Self {
        let mut record = Self::pending(None);
        record.stage = stages::INITIALIZING.to_string();
        record.created = None;
        record.updated = None;
        record.extra.insert(
            "message".to_string(),
            Value::String("Your request is being processed".to_string()),
        );
        record
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Update status and stage and bump the updated timestamp.
    pub fn set_status(&mut self, status: TaskStatus, stage: impl Into<String>) {
        self.status = status;
        self.stage = stage.into();
        self.touch();
    }

    /// Record that the job was handed to the queue.
    ///
    /// Older revisions left the status at PENDING after enqueueing; pass
    /// `mark_queued = false` to keep that behaviour.
    pub fn mark_queued(&mut self, mark_queued: bool) {
        let status = if mark_queued {
            TaskStatus::Queued
        } else {
            self.status
        };
        self.queued_at = Some(Utc::now());
        self.set_status(status, stages::WAITING_FOR_WORKER);
    }

    /// Mark the task complete with an optional remote result.
    pub fn complete(&mut self, result_url: Option<String>) {
        if result_url.is_some() {
            self.result_url = result_url;
        }
        self.error = None;
        self.completed = Some(Utc::now());
        self.set_status(TaskStatus::Complete, stages::DELIVERED);
    }

    /// Mark the task failed with an error message.
    pub fn fail(&mut self, stage: impl Into<String>, error: impl Into<String>) {
        self.error = Some(error.into());
        self.completed = Some(Utc::now());
        self.set_status(TaskStatus::Failed, stage);
    }

    /// Whether the result lives at a remote URL rather than on local disk.
    pub fn has_remote_result(&self) -> bool {
        self.result_url.as_deref().is_some_and(is_remote_url)
            || self.video_path.as_deref().is_some_and(is_remote_url)
    }

    pub fn touch(&mut self) {
        self.updated = Some(Utc::now());
    }
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Whether a location string names a remote resource.
pub fn is_remote_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
