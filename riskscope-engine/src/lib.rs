//! riskscope-engine - Multi-signal content risk assessment.
//!
//! Runs sentiment, controversy, audience-reaction and trend analyzers
//! concurrently over a piece of draft content, aggregates their output into a
//! bounded, explainable risk score and category, and proposes prioritized
//! edits to lower it.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod aggregator;
pub mod analyzer;
pub mod error;
pub mod explanation;
pub mod history;
pub mod orchestrator;
pub mod providers;
pub mod recommendation;
pub mod routes;
pub mod scoring;
pub mod service;
pub mod trend_feed;
pub mod types;

pub use aggregator::{
    aggregate, ContributingFactor, RiskAggregator, RiskAssessment, RiskCategory, WeightConfig,
};
pub use analyzer::AnalyzerAdapter;
pub use error::RiskError;
pub use explanation::{explain, Explanation, HighlightedIssue};
pub use history::{
    Comparison, HistoricalIncident, HistoricalIncidentLookup, InMemoryIncidentStore, NoHistory,
};
pub use orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
pub use providers::{ProviderContext, ProviderError, ProviderOutput, SignalProvider};
pub use recommendation::{
    Recommendation, RecommendationConfig, RecommendationEngine, RecommendationKind,
    RecommendationSet,
};
pub use routes::{build_router, request_timeout, AppState};
pub use service::{AssessmentResult, AssessmentService};
pub use trend_feed::{SharedTrendFeed, TrendFeed, TrendingPhrase};
pub use types::{
    AnalysisJob, AudienceProfile, ContentKind, ContentSection, JobRequest, Platform, SignalKind,
    SignalResult, SignalSet, SignalStatus,
};
