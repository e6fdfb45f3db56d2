//! Per-signal severity reductions.
//!
//! Every analyzer detail collapses into a single severity in [0, 100]. These
//! functions are pure; the aggregator only ever sees their output.

use crate::types::{
    AudienceDetail, ControversyDetail, SentimentDetail, SignalDetail, TrendDetail, TrendSentiment,
};

/// Clamp to [0, 100], mapping non-finite values to 0.
pub fn clamp_severity(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Clamp to [0, 1], mapping non-finite values to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Severity of any signal detail.
pub fn severity(detail: &SignalDetail) -> f64 {
    let raw = match detail {
        SignalDetail::Sentiment(d) => sentiment_severity(d),
        SignalDetail::Controversy(d) => controversy_severity(d),
        SignalDetail::Audience(d) => audience_severity(d),
        SignalDetail::Trend(d) => trend_severity(d),
    };
    clamp_severity(raw)
}

/// Negative or mixed content counts at least half its intensity; positive and
/// neutral content only counts through its negative share.
pub fn sentiment_severity(detail: &SentimentDetail) -> f64 {
    let intensity = clamp_unit(detail.intensity);
    let negative = clamp_unit(detail.negative_weight);

    if detail.label.is_negative_leaning() {
        100.0 * intensity * (0.5 + 0.5 * negative)
    } else {
        100.0 * intensity * 0.5 * negative
    }
}

pub fn controversy_severity(detail: &ControversyDetail) -> f64 {
    detail
        .dimensions
        .iter()
        .map(|d| clamp_severity(d.score))
        .fold(0.0, f64::max)
}

pub fn audience_severity(detail: &AudienceDetail) -> f64 {
    clamp_severity(detail.distribution.negative)
}

pub fn trend_severity(detail: &TrendDetail) -> f64 {
    detail
        .matches
        .iter()
        .map(|m| clamp_severity(m.severity) * sentiment_factor(m.sentiment))
        .fold(0.0, f64::max)
}

/// How strongly a trend's conversation sentiment carries over into risk.
pub fn sentiment_factor(sentiment: TrendSentiment) -> f64 {
    match sentiment {
        TrendSentiment::Negative => 1.0,
        TrendSentiment::Neutral => 0.8,
        TrendSentiment::Positive => 0.6,
    }
}

/// Trend severity from conversation volume: logarithmic, saturating at 100
/// around 100k mentions.
pub fn volume_severity(volume: u64) -> f64 {
    clamp_severity(20.0 * ((volume as f64) + 1.0).log10())
}
