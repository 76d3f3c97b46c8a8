//! API error types.
//!
//! Every error renders as a JSON body with an `error` field. Messages of
//! internal errors are replaced by a generic one in production.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use petreel_models::ModelError;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned when the task id names nothing.
pub const TASK_NOT_FOUND: &str = "Task not found";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    /// Internal failure with a message that is safe to show.
    #[error("{0}")]
    Internal(String),

    /// The status route's own failure shape.
    #[error("Failed to check status")]
    StatusCheckFailed,

    #[error("{0}")]
    Validation(#[from] ModelError),

    #[error("Storage error: {0}")]
    Storage(#[from] petreel_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] petreel_queue::QueueError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_)
            | ApiError::StatusCheckFailed
            | ApiError::Storage(_)
            | ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let error = match &self {
            ApiError::Storage(_) | ApiError::Queue(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error,
            status: matches!(self, ApiError::StatusCheckFailed).then_some("FAILED"),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_fields_is_400() {
        let (status, body) = body_json(ModelError::MissingFields.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields (dogPhoto, message, or email)");
    }

    #[tokio::test]
    async fn test_status_check_failed_shape() {
        let (status, body) = body_json(ApiError::StatusCheckFailed).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": "Failed to check status", "status": "FAILED"}));
    }

    #[tokio::test]
    async fn test_not_found_shape() {
        let (status, body) = body_json(ApiError::not_found(TASK_NOT_FOUND)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"error": "Task not found"}));
    }
}
