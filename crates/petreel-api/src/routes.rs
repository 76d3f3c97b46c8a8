//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_payment_intent, get_result, get_status, health, ready, upload, verify_payment,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let task_routes = Router::new()
        .route("/upload", post(upload))
        .route("/status/:id", get(get_status))
        .route("/result/:id", get(get_result));

    let payment_routes = Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/verify-payment", post(verify_payment));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(task_routes)
        .merge(payment_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Multipart extraction has its own 2MB default
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        // request_id runs first so the logger sees it
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
