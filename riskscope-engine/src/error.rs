//! Request-level errors for the assessment pipeline.
//!
//! Provider failures never appear here: they are absorbed into
//! `SignalResult::status` and reflected in confidence.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can cross the pipeline boundary.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Malformed or empty job, rejected before orchestration
    #[error("Validation error: {0}")]
    Validation(String),

    /// Weight configuration violates an aggregation invariant (startup only)
    #[error("Aggregation inconsistency: {0}")]
    AggregationInconsistency(String),

    /// Job was cancelled before all signals were collected
    #[error("Analysis job {job_id} was cancelled")]
    Cancelled { job_id: Uuid },

    /// Invalid service configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RiskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Cancelled { .. } => 499,
            Self::AggregationInconsistency(_) | Self::Config(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_REQUEST",
            Self::Cancelled { .. } => "CANCELLED",
            Self::AggregationInconsistency(_) => "AGGREGATION_INCONSISTENCY",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// API error body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "success": false,
            "error": ApiError {
                code: self.code().to_string(),
                message: self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<riskscope_common::ValidationError> for RiskError {
    fn from(err: riskscope_common::ValidationError) -> Self {
        Self::Config(err.to_string())
    }
}
