//! Shared fixtures for the API integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use petreel_api::{create_router, ApiConfig, AppState};
use petreel_models::{JobResult, TaskId, VideoJob};
use petreel_payments::{PaymentConfig, StripeClient};
use petreel_queue::{
    InMemoryQueue, JobSubmitter, QueueError, QueueHandles, QueueResult, ResultSource,
};
use petreel_storage::{LocalArtifactStore, OutputLayout, StorageConfig};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "petreel-test-boundary";

/// Router over a temporary output directory.
pub struct TestApp {
    pub dir: TempDir,
    pub queue: Arc<InMemoryQueue>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(false, PaymentConfig::default(), None)
    }

    pub fn with_mark_queued() -> Self {
        Self::build(true, PaymentConfig::default(), None)
    }

    pub fn with_payments(api_base: &str) -> Self {
        let payments = PaymentConfig {
            secret_key: Some("sk_test_123".to_string()),
            api_base: api_base.to_string(),
            max_retries: 0,
            ..PaymentConfig::default()
        };
        Self::build(false, payments, None)
    }

    pub fn with_failing_queue() -> Self {
        Self::build(false, PaymentConfig::default(), Some(Arc::new(FailingSubmitter)))
    }

    fn build(
        mark_queued: bool,
        payments: PaymentConfig,
        submitter: Option<Arc<FailingSubmitter>>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig::for_dir(dir.path());
        let queue = Arc::new(InMemoryQueue::new());
        let handles = match submitter {
            Some(failing) => QueueHandles::shared(failing),
            None => QueueHandles::shared(queue.clone()),
        };

        let state = AppState::new(
            ApiConfig::default(),
            &storage,
            Arc::new(LocalArtifactStore::new(OutputLayout::new(dir.path()))),
            handles,
            mark_queued,
            StripeClient::new(payments).unwrap(),
        );

        Self { dir, queue, state }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone(), None)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Upload with any subset of the form fields.
    pub async fn upload(&self, form: &UploadForm<'_>) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(form.encode()))
                .unwrap(),
        )
        .await
    }

    /// Upload the canonical birthday request and return the task id.
    pub async fn upload_rex(&self) -> TaskId {
        let response = self.upload(&UploadForm::rex()).await;
        assert_eq!(response.status(), 200);
        let body = json_body(response).await;
        TaskId::from(body["task_id"].as_str().unwrap())
    }

    /// Names of the files in the output directory.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Multipart upload fields.
#[derive(Default)]
pub struct UploadForm<'a> {
    pub photo: Option<(&'a str, &'a [u8])>,
    pub message: Option<&'a str>,
    pub email: Option<&'a str>,
}

impl<'a> UploadForm<'a> {
    pub fn rex() -> Self {
        Self {
            photo: Some(("dog.jpg", b"\xff\xd8\xff\xe0fake-jpeg")),
            message: Some("Happy Birthday Rex"),
            email: Some("a@b.com"),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((name, data)) = self.photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"dogPhoto\"; filename=\"{name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        for (field, value) in [("message", self.message), ("email", self.email)] {
            if let Some(value) = value {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submitter whose pipeline is always down.
pub struct FailingSubmitter;

#[async_trait]
impl JobSubmitter for FailingSubmitter {
    async fn submit(&self, _job: &VideoJob) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn check_connectivity(&self) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[async_trait]
impl ResultSource for FailingSubmitter {
    async fn claim_result(&self, _id: &TaskId) -> QueueResult<Option<JobResult>> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn release_result(&self, _result: &JobResult) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }
}
