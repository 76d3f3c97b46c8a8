//! Per-task processing log.
//!
//! The upload handler starts the log, the worker appends to it, and the
//! status handler scrapes it for the CDN URL of the finished video.

use std::sync::LazyLock;

use chrono::Utc;
use petreel_models::timestamp::format_timestamp;
use petreel_models::TaskId;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::StorageResult;
use crate::layout::{check_task_id, OutputLayout};

/// Line the worker prints once the video has been uploaded to the CDN.
static SECURE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Secure URL:\s*(https?://\S+)").unwrap());

/// Any HTTPS link to an mp4 file.
static MP4_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https://[^\s"'<>]+?\.mp4\b"#).unwrap());

/// Append-only task logs in the output directory.
#[derive(Debug, Clone)]
pub struct TaskLog {
    layout: OutputLayout,
}

impl TaskLog {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    /// Start a task's log, replacing any previous one.
    pub async fn create(&self, id: &TaskId, lines: &[String]) -> StorageResult<()> {
        check_task_id(id)?;
        let mut body = String::new();
        for line in lines {
            body.push_str(&stamp(line));
        }
        tokio::fs::write(self.layout.log_path(id), body).await?;
        Ok(())
    }

    /// Append a timestamped line.
    pub async fn append(&self, id: &TaskId, line: &str) -> StorageResult<()> {
        check_task_id(id)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.layout.log_path(id))
            .await?;
        file.write_all(stamp(line).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read the whole log. `Ok(None)` when the task has no log.
    pub async fn read(&self, id: &TaskId) -> StorageResult<Option<String>> {
        check_task_id(id)?;
        match tokio::fs::read(self.layout.log_path(id)).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look for the result URL the worker logged.
    pub async fn scrape_result_url(&self, id: &TaskId) -> StorageResult<Option<String>> {
        Ok(self.read(id).await?.as_deref().and_then(extract_result_url))
    }
}

fn stamp(line: &str) -> String {
    format!("[{}] {}\n", format_timestamp(&Utc::now()), line.trim_end())
}

/// Extract a result URL from log text.
///
/// The last `Secure URL:` line wins; without one, the last HTTPS link to an
/// mp4 file is used.
pub fn extract_result_url(text: &str) -> Option<String> {
    if let Some(caps) = SECURE_URL.captures_iter(text).last() {
        return Some(caps[1].to_string());
    }
    MP4_URL.find_iter(text).last().map(|m| m.as_str().to_string())
}
