//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use petreel_api::{create_router, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    if let Err(e) = run().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "petreel=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting petreel-api");

    let config = ApiConfig::from_env();
    info!(
        "API config: host={}, port={}, production={}",
        config.host,
        config.port,
        config.is_production()
    );

    let state = AppState::from_env(config.clone())
        .await
        .context("Failed to create application state")?;

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install metrics recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
