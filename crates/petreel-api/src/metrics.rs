//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "petreel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "petreel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "petreel_http_requests_in_flight";

    // Task lifecycle
    pub const UPLOADS_TOTAL: &str = "petreel_uploads_total";
    pub const JOBS_SUBMITTED_TOTAL: &str = "petreel_jobs_submitted_total";
    pub const JOBS_SUBMIT_FAILED_TOTAL: &str = "petreel_jobs_submit_failed_total";
    pub const RESULTS_CLAIMED_TOTAL: &str = "petreel_results_claimed_total";
    pub const RECONCILIATIONS_TOTAL: &str = "petreel_reconciliations_total";

    // Payments
    pub const PAYMENT_INTENTS_TOTAL: &str = "petreel_payment_intents_total";
    pub const PAYMENT_VERIFICATIONS_TOTAL: &str = "petreel_payment_verifications_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "petreel_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an accepted upload.
pub fn record_upload(artifact_backend: &str) {
    let labels = [("artifacts", artifact_backend.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
}

/// Record a job handed to the pipeline.
pub fn record_job_submitted(submitter: &str) {
    let labels = [("submitter", submitter.to_string())];
    counter!(names::JOBS_SUBMITTED_TOTAL, &labels).increment(1);
}

/// Record a job the pipeline did not accept.
pub fn record_job_submit_failed(submitter: &str) {
    let labels = [("submitter", submitter.to_string())];
    counter!(names::JOBS_SUBMIT_FAILED_TOTAL, &labels).increment(1);
}

/// Record a result claimed from the results list.
pub fn record_result_claimed(status: &str) {
    let labels = [("status", status.to_lowercase())];
    counter!(names::RESULTS_CLAIMED_TOTAL, &labels).increment(1);
}

/// Record a persisted status correction.
pub fn record_reconciliation(correction: &str) {
    let labels = [("correction", correction.to_string())];
    counter!(names::RECONCILIATIONS_TOTAL, &labels).increment(1);
}

/// Record a payment intent creation attempt.
pub fn record_payment_intent(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::PAYMENT_INTENTS_TOTAL, &labels).increment(1);
}

/// Record a payment verification.
pub fn record_payment_verification(payment_status: &str) {
    let labels = [("payment_status", payment_status.to_string())];
    counter!(names::PAYMENT_VERIFICATIONS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static TASK_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/(status|result)/[^/]+").unwrap());

/// Sanitize path for metrics labels (replace task ids).
fn sanitize_path(path: &str) -> String {
    TASK_PATH.replace(path, "/api/$1/:id").into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
