//! API middleware.

use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;

/// Per-IP rate limiter using governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Upper bound on tracked client IPs.
const MAX_RATE_LIMITER_ENTRIES: usize = 10_000;

/// Request ID header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// IP-based rate limiter cache with expiry.
#[derive(Clone)]
pub struct RateLimiterCache {
    limiters: Arc<RwLock<HashMap<IpAddr, (Arc<IpRateLimiter>, Instant)>>>,
    quota: Quota,
    ttl: Duration,
}

impl RateLimiterCache {
    /// Create a cache allowing `requests_per_second` per IP, with a burst of
    /// twice that.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = rps.saturating_mul(NonZeroU32::MIN.saturating_add(1));
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            quota: Quota::per_second(rps).allow_burst(burst),
            ttl: Duration::from_secs(3600),
        }
    }

    async fn cleanup_expired(&self) {
        let mut limiters = self.limiters.write().await;
        let now = Instant::now();
        limiters.retain(|_, (_, created_at)| now.duration_since(*created_at) < self.ttl);

        if limiters.len() >= MAX_RATE_LIMITER_ENTRIES {
            let mut entries: Vec<_> = limiters.iter().map(|(ip, (_, t))| (*ip, *t)).collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = limiters.len() + 1 - MAX_RATE_LIMITER_ENTRIES;
            for (ip, _) in entries.into_iter().take(to_remove) {
                limiters.remove(&ip);
            }
            warn!("Rate limiter cache exceeded capacity, removed {} entries", to_remove);
        }
    }

    /// Get or create the limiter for an IP.
    pub async fn get_limiter(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        if let Some((limiter, _)) = self.limiters.read().await.get(&ip) {
            return Arc::clone(limiter);
        }

        if self.limiters.read().await.len() >= MAX_RATE_LIMITER_ENTRIES {
            self.cleanup_expired().await;
        }

        let mut limiters = self.limiters.write().await;
        let (limiter, _) = limiters
            .entry(ip)
            .or_insert_with(|| (Arc::new(RateLimiter::direct(self.quota)), Instant::now()));
        Arc::clone(limiter)
    }

    /// Whether a request from `ip` is allowed now.
    pub async fn check(&self, ip: IpAddr) -> bool {
        self.get_limiter(ip).await.check().is_ok()
    }
}

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
            .allow_origin(Any)
            .max_age(Duration::from_secs(600));
    }

    // Credentials cannot be combined with wildcard headers.
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
        .allow_origin(origins)
        .max_age(Duration::from_secs(600))
}

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("camera=(), geolocation=(), microphone=(), usb=()"),
    );
    headers.insert(
        "x-permitted-cross-domain-policies",
        HeaderValue::from_static("none"),
    );

    response
}

/// Request ID middleware: reuse the caller's `X-Request-ID` or mint one.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Request ID stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Request logging middleware. Health probes are not logged.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(request).await;

    if !matches!(uri.path(), "/health" | "/healthz" | "/ready" | "/metrics") {
        info!(
            method = %method,
            uri = %uri,
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            request_id = %request_id,
            "Request completed"
        );
    }

    response
}

/// Rate limiting middleware keyed by client IP.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiterCache>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if let Some(ip) = extract_client_ip(&request) {
        if !rate_limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            let mut response = ApiError::RateLimited.into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            return response;
        }
    }

    next.run(request).await
}

/// Client IP from proxy headers or the connection.
fn extract_client_ip(request: &Request<Body>) -> Option<IpAddr> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_blocks_after_burst() {
        let cache = RateLimiterCache::new(1);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(cache.check(ip).await);
        assert!(cache.check(ip).await);
        assert!(!cache.check(ip).await);

        let other: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(cache.check(other).await);
    }

    #[test]
    fn test_extract_client_ip_prefers_forwarded_for() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "198.51.100.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request), Some("203.0.113.7".parse().unwrap()));
    }
}
