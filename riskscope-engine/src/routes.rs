//! HTTP API routes.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::RiskError;
use crate::service::AssessmentService;
use crate::trend_feed::{SharedTrendFeed, TrendFeed, TrendingPhrase};
use crate::types::{AnalysisJob, JobRequest};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssessmentService>,
    pub trends: Arc<SharedTrendFeed>,
}

/// Slack on top of the job deadline before the HTTP layer gives up.
pub const REQUEST_TIMEOUT_SLACK_SECS: u64 = 10;

/// HTTP request timeout for a given job deadline.
pub fn request_timeout(job_deadline_secs: u64) -> Duration {
    Duration::from_secs(job_deadline_secs.saturating_add(REQUEST_TIMEOUT_SLACK_SECS))
}

/// Build the application router.
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Analysis
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/reanalyze", post(reanalyze))
        // Trend snapshot
        .route("/api/v1/trends", get(list_trends).put(replace_trends))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(state)
}

// ============ Health Check ============

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let signals: Vec<&str> = state
        .service
        .orchestrator()
        .registered_kinds()
        .iter()
        .map(|k| k.as_str())
        .collect();

    Json(serde_json::json!({
        "status": "healthy",
        "service": "riskscope-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "signals": signals,
    }))
}

// ============ Analysis ============

// Dropping the handler future (client disconnect) drops the orchestrator's
// task set, which aborts the in-flight analyzers.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<impl IntoResponse, RiskError> {
    let job = AnalysisJob::from_request(request)?;
    let result = state.service.submit_for_analysis(job).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": result
    })))
}

#[derive(Debug, Deserialize)]
struct ReanalyzeRequest {
    previous_job_id: Uuid,
    #[serde(flatten)]
    job: JobRequest,
}

async fn reanalyze(
    State(state): State<AppState>,
    Json(request): Json<ReanalyzeRequest>,
) -> Result<impl IntoResponse, RiskError> {
    let result = state
        .service
        .reanalyze(request.previous_job_id, request.job)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": result
    })))
}

// ============ Trends ============

async fn list_trends(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": {
            "phrases": state.trends.snapshot(),
            "refreshed_at": state.trends.refreshed_at(),
        }
    }))
}

async fn replace_trends(
    State(state): State<AppState>,
    Json(phrases): Json<Vec<TrendingPhrase>>,
) -> impl IntoResponse {
    let count = state.trends.replace(phrases);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "data": { "phrases": count }
        })),
    )
}
