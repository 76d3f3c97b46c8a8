//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub queue: CheckStatus,
    pub output_dir: CheckStatus,
    pub artifacts: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn from_result<E: std::fmt::Display>(
        backend: Option<&'static str>,
        started: Instant,
        result: Result<(), E>,
    ) -> Self {
        match result {
            Ok(()) => Self {
                status: "ok".to_string(),
                backend,
                error: None,
                latency_ms: Some(started.elapsed().as_millis() as u64),
            },
            Err(e) => Self {
                status: "error".to_string(),
                backend,
                error: Some(e.to_string()),
                latency_ms: None,
            },
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the job submitter, the output directory and the artifact store.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let start = Instant::now();
    let queue = CheckStatus::from_result(
        Some(state.submitter.name()),
        start,
        state.submitter.check_connectivity().await,
    );

    let start = Instant::now();
    let output_dir = CheckStatus::from_result(None, start, state.status.check_writable().await);

    let start = Instant::now();
    let artifacts = CheckStatus::from_result(
        Some(state.artifacts.backend()),
        start,
        state.artifacts.check_connectivity().await,
    );

    let all_ok = queue.is_ok() && output_dir.is_ok() && artifacts.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            queue,
            output_dir,
            artifacts,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
