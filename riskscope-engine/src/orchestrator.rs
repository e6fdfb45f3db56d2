//! Analysis orchestrator.
//!
//! Fans a job out to every registered analyzer concurrently and collects one
//! [`SignalResult`] per kind. A shared semaphore caps in-flight analyzer
//! tasks across all jobs; a per-job deadline bounds the total wait.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::analyzer::AnalyzerAdapter;
use crate::error::RiskError;
use crate::providers::SignalProvider;
use crate::types::{AnalysisJob, ContentKind, SignalKind, SignalResult, SignalSet};
use riskscope_common::AnalysisConfig;

/// Timing and capacity settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sentiment and controversy, and every signal of text-only jobs
    pub fast_timeout: Duration,
    /// Audience and trend for media-heavy jobs
    pub media_timeout: Duration,
    pub job_deadline: Duration,
    pub worker_pool_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for OrchestratorConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            fast_timeout: Duration::from_secs(config.fast_timeout_secs),
            media_timeout: Duration::from_secs(config.media_timeout_secs),
            job_deadline: Duration::from_secs(config.job_deadline_secs),
            worker_pool_size: config.worker_pool_size,
        }
    }
}

pub struct AnalysisOrchestrator {
    adapters: BTreeMap<SignalKind, AnalyzerAdapter>,
    pool: Arc<Semaphore>,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    /// Register one adapter per provider. A later provider for the same kind
    /// replaces an earlier one.
    pub fn new(providers: Vec<Arc<dyn SignalProvider>>, config: OrchestratorConfig) -> Self {
        let adapters = providers
            .into_iter()
            .map(|p| (p.kind(), AnalyzerAdapter::new(p)))
            .collect();

        Self {
            adapters,
            pool: Arc::new(Semaphore::new(config.worker_pool_size.max(1))),
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Kinds with a registered analyzer.
    pub fn registered_kinds(&self) -> Vec<SignalKind> {
        self.adapters.keys().copied().collect()
    }

    /// Per-signal timeout for a job of the given content kind.
    pub fn timeout_for(&self, kind: SignalKind, content_kind: ContentKind) -> Duration {
        match kind {
            SignalKind::Audience | SignalKind::Trend if content_kind.is_media_heavy() => {
                self.config.media_timeout
            }
            _ => self.config.fast_timeout,
        }
    }

    /// Run every analyzer for `job` and collect their results.
    ///
    /// Always yields one result per signal kind unless `cancel` fires first,
    /// in which case in-flight analyzers are aborted and `Cancelled` is
    /// returned.
    pub async fn run_analysis(
        &self,
        job: Arc<AnalysisJob>,
        cancel: CancellationToken,
    ) -> Result<SignalSet, RiskError> {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for (kind, adapter) in &self.adapters {
            let kind = *kind;
            let adapter = adapter.clone();
            let job = Arc::clone(&job);
            let pool = Arc::clone(&self.pool);
            let timeout = self.timeout_for(kind, job.content_kind());

            tasks.spawn(async move {
                match pool.acquire_owned().await {
                    Ok(_permit) => adapter.run(&job, timeout).await,
                    Err(_) => SignalResult::failed(kind, "worker pool closed", 0),
                }
            });
        }

        let mut signals = SignalSet::new();
        let mut deadline_hit = false;
        let deadline = tokio::time::sleep(self.config.job_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    tracing::info!(
                        job_id = %job.id(),
                        collected = signals.len(),
                        "Analysis cancelled"
                    );
                    return Err(RiskError::Cancelled { job_id: job.id() });
                }

                _ = &mut deadline => {
                    deadline_hit = true;
                    tasks.abort_all();
                    tracing::warn!(
                        job_id = %job.id(),
                        deadline_secs = self.config.job_deadline.as_secs(),
                        pending = tasks.len(),
                        "Job deadline reached, abandoning pending analyzers"
                    );
                    break;
                }

                next = tasks.join_next() => match next {
                    None => break,
                    Some(Ok(result)) => {
                        signals.insert(result);
                    }
                    Some(Err(e)) => {
                        tracing::error!(job_id = %job.id(), error = %e, "Analyzer task failed");
                    }
                },
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        for kind in SignalKind::ALL {
            if signals.contains(kind) {
                continue;
            }
            let result = if !self.adapters.contains_key(&kind) {
                SignalResult::failed(kind, "no analyzer registered", 0)
            } else if deadline_hit {
                SignalResult::timed_out(kind, "job deadline exceeded", elapsed_ms)
            } else {
                SignalResult::failed(kind, "analyzer task aborted", elapsed_ms)
            };
            signals.insert(result);
        }

        tracing::info!(
            job_id = %job.id(),
            ok = SignalKind::ALL.len() - signals.unavailable_kinds().len(),
            unavailable = ?signals.unavailable_kinds(),
            elapsed_ms,
            "Signals collected"
        );

        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ProviderContext, ProviderError, ProviderOutput, RawAudience, RawControversy,
        RawSentiment, RawTrend,
    };
    use crate::types::{JobRequest, SignalStatus};
    use async_trait::async_trait;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct ScriptedProvider {
        kind: SignalKind,
        delay: Duration,
        behavior: Behavior,
    }

    fn provider(kind: SignalKind, delay_secs: u64, behavior: Behavior) -> Arc<dyn SignalProvider> {
        Arc::new(ScriptedProvider {
            kind,
            delay: Duration::from_secs(delay_secs),
            behavior,
        })
    }

    fn output_for(kind: SignalKind) -> ProviderOutput {
        match kind {
            SignalKind::Sentiment => ProviderOutput::Sentiment(RawSentiment {
                label: "neutral".into(),
                intensity: 0.1,
                negative_weight: 0.0,
                flagged_terms: vec![],
            }),
            SignalKind::Controversy => ProviderOutput::Controversy(RawControversy {
                dimensions: BTreeMap::new(),
            }),
            SignalKind::Audience => ProviderOutput::Audience(RawAudience {
                positive: 1.0,
                negative: 1.0,
                neutral: 2.0,
                platform_notes: vec![],
            }),
            SignalKind::Trend => ProviderOutput::Trend(RawTrend::default()),
        }
    }

    #[async_trait]
    impl SignalProvider for ScriptedProvider {
        fn kind(&self) -> SignalKind {
            self.kind
        }

        fn name(&self) -> &str {
            "scripted"
        }

        async fn analyze(
            &self,
            _content: &str,
            _context: &ProviderContext,
        ) -> Result<ProviderOutput, ProviderError> {
            tokio::time::sleep(self.delay).await;
            match self.behavior {
                Behavior::Succeed => Ok(output_for(self.kind)),
                Behavior::Fail => Err(ProviderError::Unavailable("scripted failure".into())),
                Behavior::Panic => panic!("scripted panic"),
            }
        }
    }

    fn all_providers(delay_secs: u64) -> Vec<Arc<dyn SignalProvider>> {
        SignalKind::ALL
            .into_iter()
            .map(|k| provider(k, delay_secs, Behavior::Succeed))
            .collect()
    }

    fn config(fast: u64, media: u64, deadline: u64, pool: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            fast_timeout: Duration::from_secs(fast),
            media_timeout: Duration::from_secs(media),
            job_deadline: Duration::from_secs(deadline),
            worker_pool_size: pool,
        }
    }

    fn job(content_kind: &str) -> Arc<AnalysisJob> {
        Arc::new(
            AnalysisJob::from_request(JobRequest {
                content: Some("launch day".into()),
                content_kind: Some(content_kind.into()),
                platforms: vec!["twitter".into()],
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_signals_collected() {
        let orchestrator = AnalysisOrchestrator::new(all_providers(1), config(30, 120, 150, 32));
        let signals = orchestrator
            .run_analysis(job("text"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(signals.len(), 4);
        assert!(signals.unavailable_kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_and_timeout_do_not_abort_job() {
        let providers = vec![
            provider(SignalKind::Sentiment, 60, Behavior::Succeed),
            provider(SignalKind::Controversy, 0, Behavior::Fail),
            provider(SignalKind::Audience, 1, Behavior::Succeed),
            provider(SignalKind::Trend, 1, Behavior::Succeed),
        ];
        let orchestrator = AnalysisOrchestrator::new(providers, config(30, 120, 150, 32));
        let signals = orchestrator
            .run_analysis(job("text"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            signals.get(SignalKind::Sentiment).unwrap().status,
            SignalStatus::TimedOut
        );
        assert_eq!(
            signals.get(SignalKind::Controversy).unwrap().status,
            SignalStatus::Failed
        );
        assert!(signals.get(SignalKind::Audience).unwrap().is_ok());
        assert!(signals.get(SignalKind::Trend).unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_jobs_extend_audience_and_trend_timeouts() {
        let orchestrator = AnalysisOrchestrator::new(all_providers(60), config(30, 120, 150, 32));

        let media = orchestrator
            .run_analysis(job("video"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            media.unavailable_kinds(),
            vec![SignalKind::Sentiment, SignalKind::Controversy]
        );

        let text = orchestrator
            .run_analysis(job("text"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text.unavailable_kinds().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_deadline_marks_pending_kinds_timed_out() {
        let providers = vec![
            provider(SignalKind::Sentiment, 1, Behavior::Succeed),
            provider(SignalKind::Controversy, 1, Behavior::Succeed),
            provider(SignalKind::Audience, 100, Behavior::Succeed),
            provider(SignalKind::Trend, 100, Behavior::Succeed),
        ];
        let orchestrator = AnalysisOrchestrator::new(providers, config(30, 120, 10, 32));

        let started = Instant::now();
        let signals = orchestrator
            .run_analysis(job("video"), CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(11));
        assert!(signals.get(SignalKind::Sentiment).unwrap().is_ok());
        for kind in [SignalKind::Audience, SignalKind::Trend] {
            let result = signals.get(kind).unwrap();
            assert_eq!(result.status, SignalStatus::TimedOut);
            assert_eq!(result.error.as_deref(), Some("job deadline exceeded"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_cancelled() {
        let orchestrator = AnalysisOrchestrator::new(all_providers(10), config(30, 120, 150, 32));
        let job = job("text");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = orchestrator
            .run_analysis(Arc::clone(&job), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::Cancelled { job_id } if job_id == job.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_adapter_and_panic_yield_failed_results() {
        let providers = vec![
            provider(SignalKind::Sentiment, 0, Behavior::Panic),
            provider(SignalKind::Audience, 0, Behavior::Succeed),
        ];
        let orchestrator = AnalysisOrchestrator::new(providers, config(30, 120, 150, 32));
        let signals = orchestrator
            .run_analysis(job("text"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(signals.len(), 4);
        assert_eq!(
            signals.get(SignalKind::Sentiment).unwrap().error.as_deref(),
            Some("analyzer task aborted")
        );
        assert_eq!(
            signals.get(SignalKind::Trend).unwrap().error.as_deref(),
            Some("no analyzer registered")
        );
        assert!(signals.get(SignalKind::Audience).unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_pool_queues_excess_work() {
        let orchestrator = AnalysisOrchestrator::new(all_providers(5), config(30, 120, 150, 1));

        let started = Instant::now();
        let signals = orchestrator
            .run_analysis(job("text"), CancellationToken::new())
            .await
            .unwrap();

        assert!(signals.unavailable_kinds().is_empty());
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[test]
    fn test_timeout_selection() {
        let orchestrator = AnalysisOrchestrator::new(vec![], OrchestratorConfig::default());
        assert_eq!(
            orchestrator.timeout_for(SignalKind::Trend, ContentKind::Video),
            Duration::from_secs(120)
        );
        assert_eq!(
            orchestrator.timeout_for(SignalKind::Trend, ContentKind::Text),
            Duration::from_secs(30)
        );
        assert_eq!(
            orchestrator.timeout_for(SignalKind::Sentiment, ContentKind::Mixed),
            Duration::from_secs(30)
        );
        assert!(orchestrator.registered_kinds().is_empty());
    }
}
