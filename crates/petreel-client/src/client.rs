//! HTTP client for the upload and status routes.

use std::path::Path;
use std::time::Duration;

use petreel_models::{photo_extension, TaskId, TaskStatus};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("PETREEL_API_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("PETREEL_CLIENT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Photo to upload.
#[derive(Debug, Clone)]
pub struct Photo {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Photo {
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());
        Ok(Self { file_name, data })
    }

    fn mime(&self) -> &'static str {
        match photo_extension(&self.file_name).as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            _ => "image/jpeg",
        }
    }
}

/// Status route reply. Statuses are kept as strings so that values this
/// client does not know are still reported.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReply {
    pub status: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusReply {
    pub fn task_status(&self) -> Option<TaskStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

/// Client for the PetReel API.
#[derive(Clone)]
pub struct PetReelClient {
    http: Client,
    base_url: String,
}

impl PetReelClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upload a photo with its prompt and email, returning the new task id.
    pub async fn upload(&self, photo: Photo, message: &str, email: &str) -> ClientResult<TaskId> {
        let mime = photo.mime();
        let part = Part::bytes(photo.data)
            .file_name(photo.file_name)
            .mime_str(mime)?;
        let form = Form::new()
            .part("dogPhoto", part)
            .text("message", message.to_string())
            .text("email", email.to_string());

        let response = self
            .http
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response
                .json::<ErrorReply>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| "Upload request failed".to_string());
            return Err(ClientError::UploadRejected(message));
        }

        let reply: UploadReply = response.json().await?;
        match reply.task_id {
            Some(id) if reply.success => {
                debug!(task_id = %id, "Upload accepted");
                Ok(TaskId::from(id))
            }
            _ => Err(ClientError::InvalidResponse(
                reply
                    .message
                    .unwrap_or_else(|| "Failed to start processing task.".to_string()),
            )),
        }
    }

    /// Fetch a task's status once.
    pub async fn status(&self, id: &TaskId) -> ClientResult<StatusReply> {
        let response = self
            .http
            .get(format!("{}/api/status/{}", self.base_url, id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            status if status.is_success() => Ok(response.json().await?),
            status => {
                let message = response
                    .json::<ErrorReply>()
                    .await
                    .map(|e| e.error)
                    .unwrap_or_else(|_| status.to_string());
                Err(ClientError::Http {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
