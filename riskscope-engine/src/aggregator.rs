//! Risk aggregation.
//!
//! Turns a [`SignalSet`] into a bounded score, category, confidence and
//! factor breakdown. Aggregation is a pure function of its inputs: the same
//! signals and weights always yield the same assessment.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RiskError;
use crate::scoring::{clamp_severity, round2};
use crate::types::{SignalKind, SignalSet};
use riskscope_common::validation::WEIGHT_SUM_TOLERANCE;
use riskscope_common::WeightsConfig;

/// Confidence below which an assessment is flagged as low-confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 50.0;

// ============================================================================
// Weights
// ============================================================================

/// Validated per-signal weights. Non-negative and summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightConfig {
    sentiment: f64,
    controversy: f64,
    audience: f64,
    trend: f64,
}

impl WeightConfig {
    pub fn new(sentiment: f64, controversy: f64, audience: f64, trend: f64) -> Result<Self, RiskError> {
        let weights = Self {
            sentiment,
            controversy,
            audience,
            trend,
        };

        for kind in SignalKind::ALL {
            let w = weights.weight(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(RiskError::AggregationInconsistency(format!(
                    "{kind} weight must be a non-negative number, got {w}"
                )));
            }
        }

        let total = weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RiskError::AggregationInconsistency(format!(
                "weights must sum to 1.0, got {total:.6}"
            )));
        }

        Ok(weights)
    }

    pub fn from_config(config: &WeightsConfig) -> Result<Self, RiskError> {
        Self::new(
            config.sentiment,
            config.controversy,
            config.audience,
            config.trend,
        )
    }

    pub fn weight(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Sentiment => self.sentiment,
            SignalKind::Controversy => self.controversy,
            SignalKind::Audience => self.audience,
            SignalKind::Trend => self.trend,
        }
    }

    pub fn total(&self) -> f64 {
        self.sentiment + self.controversy + self.audience + self.trend
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            sentiment: 0.25,
            controversy: 0.35,
            audience: 0.25,
            trend: 0.15,
        }
    }
}

// ============================================================================
// Assessment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskCategory {
    /// Bucket for a score: Low [0, 25], Moderate (25, 50], High (50, 75],
    /// Critical (75, 100].
    pub fn from_score(score: f64) -> Self {
        if score <= 25.0 {
            Self::Low
        } else if score <= 50.0 {
            Self::Moderate
        } else if score <= 75.0 {
            Self::High
        } else {
            Self::Critical
        }
    }

    /// Fewest recommendations an assessment of this category must carry.
    pub fn minimum_recommendations(&self) -> usize {
        match self {
            Self::Low => 0,
            Self::Moderate => 3,
            Self::High | Self::Critical => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signal's share of the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub kind: SignalKind,
    pub severity: f64,
    pub weight: f64,
    /// `weight × severity`, in score points
    pub weighted_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    pub confidence_level: f64,
    /// Non-zero factors, largest weighted impact first
    pub factors: Vec<ContributingFactor>,
    /// Some signal failed, timed out or is missing
    pub degraded: bool,
    pub low_confidence: bool,
    pub unavailable_signals: Vec<SignalKind>,
}

impl RiskAssessment {
    pub fn dominant_factor(&self) -> Option<&ContributingFactor> {
        self.factors.first()
    }

    pub fn factor(&self, kind: SignalKind) -> Option<&ContributingFactor> {
        self.factors.iter().find(|f| f.kind == kind)
    }
}

// ============================================================================
// Aggregator
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RiskAggregator {
    weights: WeightConfig,
}

impl RiskAggregator {
    pub fn new(weights: WeightConfig) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    pub fn aggregate(&self, signals: &SignalSet) -> RiskAssessment {
        aggregate(signals, &self.weights)
    }
}

/// Aggregate `signals` under `weights`.
///
/// Unavailable signals contribute nothing to the score and withdraw their
/// weight from the confidence level.
pub fn aggregate(signals: &SignalSet, weights: &WeightConfig) -> RiskAssessment {
    let mut score = 0.0;
    let mut available_weight = 0.0;
    let mut factors = Vec::new();

    for result in signals.iter().filter(|r| r.is_ok()) {
        let weight = weights.weight(result.kind);
        let severity = clamp_severity(result.severity);
        let weighted_impact = weight * severity;

        available_weight += weight;
        score += weighted_impact;

        if weighted_impact > 0.0 {
            factors.push(ContributingFactor {
                kind: result.kind,
                severity,
                weight,
                weighted_impact,
            });
        }
    }

    factors.sort_by(|a, b| {
        b.weighted_impact
            .total_cmp(&a.weighted_impact)
            .then(a.kind.cmp(&b.kind))
    });

    let risk_score = round2(clamp_severity(score));
    let confidence_level = round2(clamp_severity(available_weight * 100.0));
    let unavailable_signals = signals.unavailable_kinds();
    let all_unavailable = unavailable_signals.len() == SignalKind::ALL.len();

    RiskAssessment {
        risk_score,
        risk_category: RiskCategory::from_score(risk_score),
        confidence_level,
        factors,
        degraded: !unavailable_signals.is_empty(),
        low_confidence: all_unavailable || confidence_level < LOW_CONFIDENCE_THRESHOLD,
        unavailable_signals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalResult, SignalStatus};
    use test_case::test_case;

    fn ok(kind: SignalKind, severity: f64) -> SignalResult {
        SignalResult {
            kind,
            status: SignalStatus::Ok,
            severity,
            detail: None,
            error: None,
            elapsed_ms: 1,
        }
    }

    #[test_case(0.0, RiskCategory::Low)]
    #[test_case(25.0, RiskCategory::Low)]
    #[test_case(25.01, RiskCategory::Moderate)]
    #[test_case(50.0, RiskCategory::Moderate)]
    #[test_case(50.5, RiskCategory::High)]
    #[test_case(75.0, RiskCategory::High)]
    #[test_case(75.01, RiskCategory::Critical)]
    #[test_case(100.0, RiskCategory::Critical)]
    fn test_category_boundaries(score: f64, expected: RiskCategory) {
        assert_eq!(RiskCategory::from_score(score), expected);
    }

    #[test]
    fn test_weight_validation() {
        assert!(WeightConfig::new(0.25, 0.35, 0.25, 0.15).is_ok());
        assert!(matches!(
            WeightConfig::new(0.5, 0.5, 0.5, 0.0),
            Err(RiskError::AggregationInconsistency(_))
        ));
        assert!(WeightConfig::new(-0.25, 0.75, 0.25, 0.25).is_err());
        assert!(WeightConfig::new(f64::INFINITY, 0.0, 0.0, 0.0).is_err());
        assert_eq!(
            WeightConfig::from_config(&WeightsConfig::default()).unwrap(),
            WeightConfig::default()
        );
    }

    #[test]
    fn test_full_signal_example() {
        let signals: SignalSet = [
            ok(SignalKind::Sentiment, 80.0),
            ok(SignalKind::Controversy, 90.0),
            ok(SignalKind::Audience, 60.0),
            ok(SignalKind::Trend, 30.0),
        ]
        .into_iter()
        .collect();

        let assessment = aggregate(&signals, &WeightConfig::default());
        assert_eq!(assessment.risk_score, 71.0);
        assert_eq!(assessment.risk_category, RiskCategory::High);
        assert_eq!(assessment.confidence_level, 100.0);
        assert!(!assessment.degraded);
        assert!(!assessment.low_confidence);

        let order: Vec<_> = assessment.factors.iter().map(|f| f.kind).collect();
        assert_eq!(
            order,
            vec![
                SignalKind::Controversy,
                SignalKind::Sentiment,
                SignalKind::Audience,
                SignalKind::Trend
            ]
        );
    }

    #[test]
    fn test_degraded_example() {
        let signals: SignalSet = [
            SignalResult::failed(SignalKind::Sentiment, "down", 5),
            ok(SignalKind::Controversy, 95.0),
            SignalResult::timed_out(SignalKind::Trend, "slow", 30_000),
        ]
        .into_iter()
        .collect();

        let assessment = aggregate(&signals, &WeightConfig::default());
        assert_eq!(assessment.risk_score, 33.25);
        assert_eq!(assessment.confidence_level, 35.0);
        assert_eq!(assessment.risk_category, RiskCategory::Moderate);
        assert!(assessment.degraded);
        assert!(assessment.low_confidence);
        assert_eq!(
            assessment.unavailable_signals,
            vec![SignalKind::Sentiment, SignalKind::Audience, SignalKind::Trend]
        );
    }

    #[test]
    fn test_all_failed_is_low_with_zero_confidence() {
        let signals: SignalSet = SignalKind::ALL
            .into_iter()
            .map(|k| SignalResult::failed(k, "down", 1))
            .collect();

        let assessment = aggregate(&signals, &WeightConfig::default());
        assert_eq!(assessment.risk_score, 0.0);
        assert_eq!(assessment.risk_category, RiskCategory::Low);
        assert_eq!(assessment.confidence_level, 0.0);
        assert!(assessment.low_confidence);
        assert!(assessment.factors.is_empty());

        let empty = aggregate(&SignalSet::new(), &WeightConfig::default());
        assert_eq!(empty, assessment);
    }

    #[test]
    fn test_zero_severity_ok_signal_counts_for_confidence_only() {
        let signals: SignalSet = [
            SignalResult::audience_baseline(),
            ok(SignalKind::Sentiment, 40.0),
        ]
        .into_iter()
        .collect();

        let assessment = aggregate(&signals, &WeightConfig::default());
        assert_eq!(assessment.confidence_level, 50.0);
        assert!(!assessment.low_confidence);
        assert_eq!(assessment.factors.len(), 1);
        assert_eq!(assessment.risk_score, 10.0);
    }
}
