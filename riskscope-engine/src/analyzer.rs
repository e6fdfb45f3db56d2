//! Analyzer adapter: runs one provider under a timeout and normalizes its
//! raw output into a [`SignalResult`].
//!
//! Provider failures stop here. Whatever happens inside the provider, the
//! adapter always yields exactly one result for its kind.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::providers::{
    ProviderContext, ProviderError, ProviderOutput, RawAudience, RawControversy, RawSentiment,
    RawSpan, RawTrend, SignalProvider,
};
use crate::scoring::{clamp_severity, clamp_unit, volume_severity};
use crate::types::{
    AnalysisJob, AudienceDetail, ControversyDetail, ControversyDimension, DimensionScore,
    FlaggedTerm, ReactionDistribution, SentimentDetail, SentimentLabel, SignalDetail, SignalKind,
    SignalResult, TextSpan, TrendDetail, TrendMatch, TrendSentiment,
};

/// Uniform wrapper around a signal provider.
#[derive(Clone)]
pub struct AnalyzerAdapter {
    provider: Arc<dyn SignalProvider>,
}

impl AnalyzerAdapter {
    pub fn new(provider: Arc<dyn SignalProvider>) -> Self {
        Self { provider }
    }

    pub fn kind(&self) -> SignalKind {
        self.provider.kind()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run the provider for `job`, bounded by `timeout`.
    ///
    /// The audience adapter skips its provider when the job carries neither an
    /// audience profile nor target platforms and returns the neutral baseline.
    pub async fn run(&self, job: &AnalysisJob, timeout: Duration) -> SignalResult {
        let kind = self.kind();
        if kind == SignalKind::Audience && !job.has_audience_inputs() {
            tracing::debug!(job_id = %job.id(), "No audience inputs, using baseline");
            return SignalResult::audience_baseline();
        }

        let context = ProviderContext::for_job(job);
        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.provider.analyze(job.text(), &context)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Err(_) => SignalResult::timed_out(
                kind,
                format!("no response within {}ms", timeout.as_millis()),
                elapsed_ms,
            ),
            Ok(Err(e)) => SignalResult::failed(kind, e.to_string(), elapsed_ms),
            Ok(Ok(output)) => match normalize(kind, output, job.text()) {
                Ok(detail) => SignalResult::ok(detail, elapsed_ms),
                Err(e) => SignalResult::failed(kind, e.to_string(), elapsed_ms),
            },
        };

        if result.is_ok() {
            tracing::debug!(
                job_id = %job.id(),
                signal = %kind,
                provider = self.provider_name(),
                severity = result.severity,
                elapsed_ms,
                "Signal collected"
            );
        } else {
            tracing::warn!(
                job_id = %job.id(),
                signal = %kind,
                provider = self.provider_name(),
                status = ?result.status,
                reason = result.error.as_deref().unwrap_or_default(),
                elapsed_ms,
                "Signal unavailable"
            );
        }

        result
    }
}

/// Convert raw provider output into a detail payload over `text`.
///
/// Scores are clamped into range; spans that fall outside `text` or off char
/// boundaries are dropped. Non-finite headline numbers and mismatched kinds
/// are rejected.
pub fn normalize(
    kind: SignalKind,
    output: ProviderOutput,
    text: &str,
) -> Result<SignalDetail, ProviderError> {
    if output.kind() != kind {
        return Err(ProviderError::Malformed(format!(
            "expected {kind} output, got {}",
            output.kind()
        )));
    }

    match output {
        ProviderOutput::Sentiment(raw) => normalize_sentiment(raw, text).map(SignalDetail::Sentiment),
        ProviderOutput::Controversy(raw) => {
            normalize_controversy(raw, text).map(SignalDetail::Controversy)
        }
        ProviderOutput::Audience(raw) => Ok(SignalDetail::Audience(normalize_audience(raw))),
        ProviderOutput::Trend(raw) => Ok(SignalDetail::Trend(normalize_trend(raw, text))),
    }
}

fn require_finite(field: &str, value: f64) -> Result<f64, ProviderError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProviderError::Malformed(format!("{field} is not a finite number")))
    }
}

fn resolve_span(text: &str, raw: &RawSpan) -> Option<TextSpan> {
    let span = TextSpan::from_source(text, raw.start, raw.end);
    if span.is_none() {
        tracing::debug!(start = raw.start, end = raw.end, "Dropping out-of-range span");
    }
    span
}

fn parse_sentiment_label(label: &str) -> Result<SentimentLabel, ProviderError> {
    match label.trim().to_lowercase().as_str() {
        "positive" => Ok(SentimentLabel::Positive),
        "neutral" => Ok(SentimentLabel::Neutral),
        "negative" => Ok(SentimentLabel::Negative),
        "mixed" => Ok(SentimentLabel::Mixed),
        other => Err(ProviderError::Malformed(format!(
            "unknown sentiment label '{other}'"
        ))),
    }
}

fn normalize_sentiment(raw: RawSentiment, text: &str) -> Result<SentimentDetail, ProviderError> {
    let label = parse_sentiment_label(&raw.label)?;
    let intensity = clamp_unit(require_finite("intensity", raw.intensity)?);
    let negative_weight = clamp_unit(require_finite("negative_weight", raw.negative_weight)?);

    let flagged_terms = raw
        .flagged_terms
        .iter()
        .filter_map(|s| {
            resolve_span(text, s).map(|span| FlaggedTerm {
                span,
                weight: clamp_unit(s.weight.unwrap_or(1.0)),
            })
        })
        .collect();

    Ok(SentimentDetail {
        label,
        intensity,
        negative_weight,
        flagged_terms,
    })
}

fn normalize_controversy(
    raw: RawControversy,
    text: &str,
) -> Result<ControversyDetail, ProviderError> {
    let mut dimensions: Vec<DimensionScore> = ControversyDimension::ALL
        .into_iter()
        .map(|dimension| DimensionScore {
            dimension,
            score: 0.0,
            triggers: Vec::new(),
        })
        .collect();

    for (name, dim) in raw.dimensions {
        let Some(dimension) = ControversyDimension::parse(&name) else {
            tracing::debug!(dimension = %name, "Ignoring unknown controversy dimension");
            continue;
        };
        let score = require_finite(&format!("dimensions.{name}.score"), dim.score)?;
        if let Some(slot) = dimensions.iter_mut().find(|d| d.dimension == dimension) {
            slot.score = clamp_severity(score * 100.0);
            slot.triggers = dim
                .triggers
                .iter()
                .filter_map(|s| resolve_span(text, s))
                .collect();
        }
    }

    Ok(ControversyDetail { dimensions })
}

fn normalize_audience(raw: RawAudience) -> AudienceDetail {
    AudienceDetail {
        distribution: ReactionDistribution::normalized(raw.positive, raw.negative, raw.neutral),
        platform_notes: raw.platform_notes,
        baseline: false,
    }
}

fn normalize_trend(raw: RawTrend, text: &str) -> TrendDetail {
    let matches = raw
        .matches
        .into_iter()
        .filter_map(|m| {
            let span = TextSpan::from_source(text, m.start, m.end)?;
            let severity = m
                .severity
                .map(clamp_severity)
                .unwrap_or_else(|| volume_severity(m.volume));
            Some(TrendMatch {
                phrase: m.phrase,
                span,
                volume: m.volume,
                sentiment: TrendSentiment::parse(&m.sentiment),
                severity,
            })
        })
        .collect();

    TrendDetail { matches }
}
