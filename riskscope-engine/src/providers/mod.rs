//! Signal provider capability.
//!
//! A provider turns content into raw, provider-shaped output for one signal
//! kind. Providers know nothing about severities, weights or timeouts; the
//! [`AnalyzerAdapter`](crate::analyzer::AnalyzerAdapter) normalizes their
//! output and absorbs their failures.
//!
//! Two families ship with the engine:
//! - [`lexicon`]: deterministic local providers (default)
//! - [`http`]: a client for an external model host

pub mod http;
pub mod lexicon;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::trend_feed::TrendFeed;
use crate::types::{AnalysisJob, AudienceProfile, ContentKind, Platform, SignalKind};
use riskscope_common::{ProviderMode, ProvidersConfig};

pub use http::HttpSignalProvider;
pub use lexicon::{
    FeedTrendProvider, LexiconAudienceProvider, LexiconControversyProvider,
    LexiconSentimentProvider,
};

// ============================================================================
// Errors
// ============================================================================

/// Provider failure. Recorded on the signal result, never surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed provider output: {0}")]
    Malformed(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider timed out after {0}ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether retrying the same request can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::Unavailable(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// Job metadata handed to providers alongside the content.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderContext {
    pub job_id: Uuid,
    pub content_kind: ContentKind,
    pub platforms: Vec<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<AudienceProfile>,
}

impl ProviderContext {
    pub fn for_job(job: &AnalysisJob) -> Self {
        Self {
            job_id: job.id(),
            content_kind: job.content_kind(),
            platforms: job.platforms().to_vec(),
            audience: job.audience().cloned(),
        }
    }
}

// ============================================================================
// Raw Output
// ============================================================================

/// A byte range into the analyzed content, as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub start: usize,
    pub end: usize,
    /// Optional per-span weight in [0, 1]
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSentiment {
    pub label: String,
    pub intensity: f64,
    pub negative_weight: f64,
    #[serde(default)]
    pub flagged_terms: Vec<RawSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDimension {
    /// Probability-like score in [0, 1]
    pub score: f64,
    #[serde(default)]
    pub triggers: Vec<RawSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawControversy {
    /// Keyed by dimension name; unknown names are ignored, missing ones score 0
    pub dimensions: BTreeMap<String, RawDimension>,
}

/// Unnormalized reaction weights; any non-negative scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAudience {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    #[serde(default)]
    pub platform_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrendMatch {
    pub phrase: String,
    pub start: usize,
    pub end: usize,
    pub volume: u64,
    pub sentiment: String,
    /// Provider-assessed severity in [0, 100]; derived from volume when absent
    #[serde(default)]
    pub severity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTrend {
    #[serde(default)]
    pub matches: Vec<RawTrendMatch>,
}

/// Provider output, tagged by the signal it answers.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutput {
    Sentiment(RawSentiment),
    Controversy(RawControversy),
    Audience(RawAudience),
    Trend(RawTrend),
}

impl ProviderOutput {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Sentiment(_) => SignalKind::Sentiment,
            Self::Controversy(_) => SignalKind::Controversy,
            Self::Audience(_) => SignalKind::Audience,
            Self::Trend(_) => SignalKind::Trend,
        }
    }

    /// Decode a JSON payload for the given kind.
    pub fn from_json(kind: SignalKind, value: serde_json::Value) -> Result<Self, ProviderError> {
        let malformed = |e: serde_json::Error| ProviderError::Malformed(e.to_string());
        Ok(match kind {
            SignalKind::Sentiment => Self::Sentiment(serde_json::from_value(value).map_err(malformed)?),
            SignalKind::Controversy => {
                Self::Controversy(serde_json::from_value(value).map_err(malformed)?)
            }
            SignalKind::Audience => Self::Audience(serde_json::from_value(value).map_err(malformed)?),
            SignalKind::Trend => Self::Trend(serde_json::from_value(value).map_err(malformed)?),
        })
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Analysis capability for one signal kind.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Signal this provider answers.
    fn kind(&self) -> SignalKind;

    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Analyze `content` (the job's full normalized text).
    async fn analyze(
        &self,
        content: &str,
        context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError>;
}

/// Build the provider for every signal kind according to configuration.
pub fn build_providers(
    config: &ProvidersConfig,
    trend_feed: Arc<dyn TrendFeed>,
) -> Result<Vec<Arc<dyn SignalProvider>>, ProviderError> {
    match config.mode {
        ProviderMode::Local => Ok(vec![
            Arc::new(LexiconSentimentProvider::new()?) as Arc<dyn SignalProvider>,
            Arc::new(LexiconControversyProvider::new()?),
            Arc::new(LexiconAudienceProvider::new()?),
            Arc::new(FeedTrendProvider::new(trend_feed)),
        ]),
        ProviderMode::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("no provider endpoint configured".into()))?;
            SignalKind::ALL
                .into_iter()
                .map(|kind| {
                    HttpSignalProvider::new(kind, &endpoint, config)
                        .map(|p| Arc::new(p) as Arc<dyn SignalProvider>)
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend_feed::SharedTrendFeed;

    #[test]
    fn test_recoverable_errors() {
        assert!(ProviderError::Network("reset".into()).is_recoverable());
        assert!(ProviderError::Http {
            status: 503,
            body: String::new()
        }
        .is_recoverable());
        assert!(ProviderError::Http {
            status: 429,
            body: String::new()
        }
        .is_recoverable());
        assert!(!ProviderError::Http {
            status: 400,
            body: String::new()
        }
        .is_recoverable());
        assert!(!ProviderError::Malformed("bad".into()).is_recoverable());
    }

    #[test]
    fn test_output_from_json() {
        let value = serde_json::json!({
            "label": "negative",
            "intensity": 0.7,
            "negative_weight": 0.9,
            "flagged_terms": [{"start": 0, "end": 4}]
        });
        let output = ProviderOutput::from_json(SignalKind::Sentiment, value).unwrap();
        assert_eq!(output.kind(), SignalKind::Sentiment);

        let bad = ProviderOutput::from_json(SignalKind::Audience, serde_json::json!({"x": 1}));
        assert!(matches!(bad, Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_build_local_providers_covers_every_kind() {
        let feed = Arc::new(SharedTrendFeed::default());
        let providers = build_providers(&ProvidersConfig::default(), feed).unwrap();
        let kinds: Vec<_> = providers.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, SignalKind::ALL.to_vec());
    }

    #[test]
    fn test_build_http_providers_requires_endpoint() {
        let feed = Arc::new(SharedTrendFeed::default());
        let config = ProvidersConfig {
            mode: ProviderMode::Http,
            ..Default::default()
        };
        assert!(build_providers(&config, feed).is_err());
    }
}
