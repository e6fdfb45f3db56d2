//! Assessment service: the full pipeline behind a single entry point.
//!
//! Orchestrator → aggregator → recommendation engine → explanation builder.
//! Every submission, including re-analysis, takes the same path; nothing is
//! remembered between jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregator::{RiskAggregator, RiskAssessment, WeightConfig};
use crate::error::RiskError;
use crate::explanation::{explain, Explanation};
use crate::history::{Comparison, HistoricalIncidentLookup};
use crate::orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
use crate::providers::{build_providers, SignalProvider};
use crate::recommendation::{RecommendationConfig, RecommendationEngine, RecommendationSet};
use crate::trend_feed::TrendFeed;
use crate::types::{AnalysisJob, JobRequest, SignalSet};
use riskscope_common::Config;

/// Everything produced for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub job_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_job_id: Option<Uuid>,
    pub analyzed_at: DateTime<Utc>,
    pub assessment: RiskAssessment,
    pub recommendations: RecommendationSet,
    pub explanation: Explanation,
    pub signals: SignalSet,
}

pub struct AssessmentService {
    orchestrator: AnalysisOrchestrator,
    aggregator: RiskAggregator,
    recommendations: RecommendationEngine,
    history: Arc<dyn HistoricalIncidentLookup>,
}

impl AssessmentService {
    pub fn new(
        orchestrator: AnalysisOrchestrator,
        aggregator: RiskAggregator,
        recommendations: RecommendationEngine,
        history: Arc<dyn HistoricalIncidentLookup>,
    ) -> Self {
        Self {
            orchestrator,
            aggregator,
            recommendations,
            history,
        }
    }

    /// Assemble the pipeline from configuration.
    ///
    /// Fails with `AggregationInconsistency` when the configured weights are
    /// invalid, so a misconfigured service never starts.
    pub fn from_config(
        config: &Config,
        trend_feed: Arc<dyn TrendFeed>,
        history: Arc<dyn HistoricalIncidentLookup>,
    ) -> Result<Self, RiskError> {
        let weights = WeightConfig::from_config(&config.analysis.weights)?;
        let providers = build_providers(&config.providers, trend_feed)
            .map_err(|e| RiskError::Config(format!("signal providers: {e}")))?;

        tracing::info!(
            provider_mode = ?config.providers.mode,
            worker_pool_size = config.analysis.worker_pool_size,
            job_deadline_secs = config.analysis.job_deadline_secs,
            "Assessment pipeline configured"
        );

        Ok(Self::with_providers(providers, weights, config, history))
    }

    /// Assemble the pipeline around explicit providers.
    pub fn with_providers(
        providers: Vec<Arc<dyn SignalProvider>>,
        weights: WeightConfig,
        config: &Config,
        history: Arc<dyn HistoricalIncidentLookup>,
    ) -> Self {
        Self::new(
            AnalysisOrchestrator::new(providers, OrchestratorConfig::from(&config.analysis)),
            RiskAggregator::new(weights),
            RecommendationEngine::new(RecommendationConfig::from(&config.recommendations)),
            history,
        )
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator {
        &self.orchestrator
    }

    pub async fn submit_for_analysis(&self, job: AnalysisJob) -> Result<AssessmentResult, RiskError> {
        self.submit_with_cancel(job, CancellationToken::new()).await
    }

    /// Analyze modified content of an earlier submission as a fresh job.
    pub async fn reanalyze(
        &self,
        previous_job_id: Uuid,
        modified: JobRequest,
    ) -> Result<AssessmentResult, RiskError> {
        let job = AnalysisJob::revision_of(previous_job_id, modified)?;
        self.submit_for_analysis(job).await
    }

    /// Historical comparisons for `job`, bounded by the job deadline.
    ///
    /// Runs alongside the analyzers. A failed, slow or cancelled lookup
    /// yields no comparisons.
    async fn find_comparisons(
        &self,
        job: &AnalysisJob,
        cancel: &CancellationToken,
    ) -> Vec<Comparison> {
        let deadline = self.orchestrator.config().job_deadline;
        let lookup = tokio::time::timeout(deadline, self.history.find_similar(job.text()));

        tokio::select! {
            _ = cancel.cancelled() => Vec::new(),
            outcome = lookup => match outcome {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => {
                    tracing::warn!(job_id = %job.id(), error = %e, "Historical lookup failed");
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!(
                        job_id = %job.id(),
                        deadline_secs = deadline.as_secs(),
                        "Historical lookup exceeded the job deadline"
                    );
                    Vec::new()
                }
            },
        }
    }

    pub async fn submit_with_cancel(
        &self,
        job: AnalysisJob,
        cancel: CancellationToken,
    ) -> Result<AssessmentResult, RiskError> {
        let job = Arc::new(job);
        tracing::info!(
            job_id = %job.id(),
            previous_job_id = ?job.previous_job_id(),
            content_kind = ?job.content_kind(),
            platforms = job.platforms().len(),
            chars = job.text().chars().count(),
            "Analysis job submitted"
        );

        let (signals, comparisons) = tokio::join!(
            self.orchestrator.run_analysis(Arc::clone(&job), cancel.clone()),
            self.find_comparisons(&job, &cancel),
        );
        let signals = signals?;
        let assessment = self.aggregator.aggregate(&signals);
        let recommendations = self.recommendations.generate(&job, &assessment, &signals);
        let explanation = explain(&assessment, &recommendations, &signals, comparisons);

        tracing::info!(
            job_id = %job.id(),
            risk_score = assessment.risk_score,
            risk_category = %assessment.risk_category,
            confidence = assessment.confidence_level,
            degraded = assessment.degraded,
            recommendations = recommendations.len(),
            "Assessment complete"
        );

        Ok(AssessmentResult {
            job_id: job.id(),
            previous_job_id: job.previous_job_id(),
            analyzed_at: Utc::now(),
            assessment,
            recommendations,
            explanation,
            signals,
        })
    }
}
