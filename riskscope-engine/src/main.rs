//! riskscope-engine service entry point.

use anyhow::{Context, Result};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use riskscope_common::config::Config;
use riskscope_common::logging::init_logging_with_exclusions;
use riskscope_engine::{
    build_router, request_timeout, AppState, AssessmentService, NoHistory, SharedTrendFeed,
    TrendFeed,
};

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = Config::load_and_validate()?;
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Riskscope Engine v{}", env!("CARGO_PKG_VERSION"));

    let trends = Arc::new(SharedTrendFeed::default());
    let service = AssessmentService::from_config(
        &config,
        Arc::clone(&trends) as Arc<dyn TrendFeed>,
        Arc::new(NoHistory),
    )
    .context("Failed to build assessment pipeline")?;

    let state = AppState {
        service: Arc::new(service),
        trends,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(state, config.service.body_limit_bytes).layer(
        ServiceBuilder::new()
            .layer(cors)
            .layer(TimeoutLayer::new(request_timeout(
                config.analysis.job_deadline_secs,
            ))),
    );

    let addr = config.bind_address();

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
