//! Recommendation engine.
//!
//! Derives targeted edits from the factors that drive the score, estimates
//! how many score points each edit would remove, tops the list up with
//! generic suggestions until the category minimum is met, then orders and
//! truncates it. Generation is deterministic and keeps no state between jobs.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::aggregator::{ContributingFactor, RiskAssessment};
use crate::scoring::{clamp_severity, round2, sentiment_factor};
use crate::types::{AnalysisJob, SignalKind, SignalSet, TextSpan, TrendSentiment};
use riskscope_common::RecommendationsConfig;

/// Controversy dimensions at or above this score get their triggers removed.
pub const REMOVAL_THRESHOLD: f64 = 75.0;

/// Negative-reaction share that warrants clarifying context.
const CLARIFY_NEGATIVE_PCT: f64 = 50.0;

/// Softer alternatives for charged words.
static SOFTER_WORDING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("hate", "dislike"),
        ("disgusting", "disappointing"),
        ("idiot", "person"),
        ("idiots", "people"),
        ("liar", "mistaken"),
        ("liars", "mistaken"),
        ("evil", "harmful"),
        ("kill", "stop"),
        ("stupid", "misguided"),
        ("terrible", "disappointing"),
        ("awful", "poor"),
        ("worst", "weakest"),
        ("pathetic", "underwhelming"),
        ("horrible", "unpleasant"),
        ("furious", "frustrated"),
        ("shameful", "unfortunate"),
        ("corrupt", "questionable"),
        ("scam", "questionable offer"),
        ("garbage", "low quality"),
        ("trash", "low quality"),
        ("useless", "unhelpful"),
        ("disaster", "setback"),
        ("destroy", "beat"),
        ("crap", "poor"),
        ("toxic", "unhealthy"),
        ("dumb", "unwise"),
        ("angry", "concerned"),
        ("ridiculous", "surprising"),
        ("failure", "setback"),
        ("ugly", "unappealing"),
        ("fake", "inaccurate"),
        ("bad", "not ideal"),
        ("annoying", "frustrating"),
        ("insane", "surprising"),
        ("lazy", "slow"),
        ("boring", "quiet"),
        ("sad", "disappointing"),
        ("not good", "could be better"),
        ("not great", "could be better"),
    ])
});

/// Generic suggestions used to reach the category minimum.
const GENERIC_SUGGESTIONS: [(RecommendationKind, &str, &str); 6] = [
    (
        RecommendationKind::ToneAdjustment,
        "Lead with the constructive point before any criticism",
        "Opening on the constructive point frames the rest of the post",
    ),
    (
        RecommendationKind::Addition,
        "Add a short note explaining the intent behind the post",
        "Stated intent reduces uncharitable readings",
    ),
    (
        RecommendationKind::ToneAdjustment,
        "Replace absolute statements with qualified ones",
        "Absolute claims invite pile-on replies",
    ),
    (
        RecommendationKind::Addition,
        "Add a source or link for factual claims",
        "Sourced claims are harder to dispute",
    ),
    (
        RecommendationKind::ToneAdjustment,
        "Shorten the post so the core message stands on its own",
        "Shorter posts are less likely to be quoted out of context",
    ),
    (
        RecommendationKind::Addition,
        "Invite respectful discussion at the end of the post",
        "An explicit invitation sets the tone for replies",
    ),
];

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Removal,
    PhraseModification,
    WordReplacement,
    ToneAdjustment,
    Addition,
}

impl RecommendationKind {
    /// Tie-break rank; lower sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Removal => 0,
            Self::PhraseModification => 1,
            Self::WordReplacement => 2,
            Self::ToneAdjustment => 3,
            Self::Addition => 4,
        }
    }

    /// Expected fractional reduction of the targeted severity.
    pub fn effect(&self) -> f64 {
        match self {
            Self::Removal => 0.6,
            Self::PhraseModification => 0.45,
            Self::WordReplacement => 0.3,
            Self::ToneAdjustment => 0.2,
            Self::Addition => 0.15,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Removal => "removal",
            Self::PhraseModification => "phrase_modification",
            Self::WordReplacement => "word_replacement",
            Self::ToneAdjustment => "tone_adjustment",
            Self::Addition => "addition",
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suggested edit and its projected effect on the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    /// Signal the edit addresses; `None` for generic suggestions
    pub target: Option<SignalKind>,
    /// Text to change; empty for whole-post suggestions
    pub original: String,
    pub suggested: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
    pub rationale: String,
    /// Projected score reduction in [0, 100]
    pub estimated_impact: f64,
}

impl Recommendation {
    fn dedup_key(&self) -> (RecommendationKind, String) {
        let text = if self.original.is_empty() {
            &self.suggested
        } else {
            &self.original
        };
        (self.kind, text.to_lowercase())
    }
}

/// Recommendations ordered by estimated impact, highest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationSet(Vec<Recommendation>);

impl RecommendationSet {
    pub fn iter(&self) -> impl Iterator<Item = &Recommendation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Recommendation> {
        self.0.first()
    }

    pub fn as_slice(&self) -> &[Recommendation] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Recommendation> {
        self.0
    }
}

/// Thresholds for candidate generation.
#[derive(Debug, Clone)]
pub struct RecommendationConfig {
    /// Factors at or below this weighted impact produce no targeted edits
    pub min_factor_impact: f64,
    /// Controversy dimensions below this score are ignored
    pub dimension_threshold: f64,
    pub max_recommendations: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self::from(&RecommendationsConfig::default())
    }
}

impl From<&RecommendationsConfig> for RecommendationConfig {
    fn from(config: &RecommendationsConfig) -> Self {
        Self {
            min_factor_impact: config.min_factor_impact,
            dimension_threshold: config.dimension_threshold,
            max_recommendations: config.max_recommendations,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    pub fn generate(
        &self,
        job: &AnalysisJob,
        assessment: &RiskAssessment,
        signals: &SignalSet,
    ) -> RecommendationSet {
        let mut candidates = Vec::new();

        for factor in &assessment.factors {
            if factor.weighted_impact <= self.config.min_factor_impact {
                continue;
            }
            match factor.kind {
                SignalKind::Sentiment => sentiment_candidates(factor, signals, &mut candidates),
                SignalKind::Controversy => {
                    self.controversy_candidates(factor, signals, &mut candidates)
                }
                SignalKind::Audience => audience_candidates(factor, job, signals, &mut candidates),
                SignalKind::Trend => trend_candidates(factor, signals, &mut candidates),
            }
        }

        let mut recommendations = dedup(sorted(candidates));

        let minimum = assessment.risk_category.minimum_recommendations();
        if recommendations.len() < minimum {
            let mut seen: HashSet<_> = recommendations.iter().map(Recommendation::dedup_key).collect();
            for (i, (kind, suggested, rationale)) in GENERIC_SUGGESTIONS.iter().enumerate() {
                if recommendations.len() >= minimum {
                    break;
                }
                let candidate = Recommendation {
                    kind: *kind,
                    target: None,
                    original: String::new(),
                    suggested: (*suggested).to_string(),
                    span: None,
                    rationale: (*rationale).to_string(),
                    estimated_impact: impact(assessment.risk_score * 0.05 * (1.0 - 0.1 * i as f64)),
                };
                if seen.insert(candidate.dedup_key()) {
                    recommendations.push(candidate);
                }
            }
            recommendations = sorted(recommendations);
        }

        recommendations.truncate(self.config.max_recommendations.max(minimum));

        tracing::debug!(
            job_id = %job.id(),
            category = %assessment.risk_category,
            count = recommendations.len(),
            "Recommendations generated"
        );

        RecommendationSet(recommendations)
    }

    fn controversy_candidates(
        &self,
        factor: &ContributingFactor,
        signals: &SignalSet,
        out: &mut Vec<Recommendation>,
    ) {
        let Some(detail) = signals.controversy() else {
            return;
        };

        for (index, dim) in detail.dimensions.iter().enumerate() {
            if dim.score < self.config.dimension_threshold {
                continue;
            }
            let runner_up = detail
                .dimensions
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, d)| clamp_severity(d.score))
                .fold(0.0, f64::max);
            let projected = |fraction: f64| {
                projected_drop(factor.severity, clamp_severity(dim.score), runner_up, fraction)
            };

            let kind = if dim.score >= REMOVAL_THRESHOLD {
                RecommendationKind::Removal
            } else {
                RecommendationKind::PhraseModification
            };

            if dim.triggers.is_empty() {
                out.push(Recommendation {
                    kind: RecommendationKind::PhraseModification,
                    target: Some(SignalKind::Controversy),
                    original: String::new(),
                    suggested: format!(
                        "Reframe the {} angle in neutral, factual terms",
                        dim.dimension
                    ),
                    span: None,
                    rationale: format!(
                        "Content reads as {} controversy (score {:.0})",
                        dim.dimension, dim.score
                    ),
                    estimated_impact: impact(
                        factor.weight * projected(RecommendationKind::PhraseModification.effect()),
                    ),
                });
                continue;
            }

            let share = 1.0 / dim.triggers.len() as f64;
            for trigger in &dim.triggers {
                let suggested = match kind {
                    RecommendationKind::Removal => String::new(),
                    _ => format!(
                        "Reframe \"{}\" neutrally, citing facts rather than positions",
                        trigger.text
                    ),
                };
                out.push(Recommendation {
                    kind,
                    target: Some(SignalKind::Controversy),
                    original: trigger.text.clone(),
                    suggested,
                    span: Some(trigger.clone()),
                    rationale: format!(
                        "\"{}\" triggers {} controversy (score {:.0})",
                        trigger.text, dim.dimension, dim.score
                    ),
                    estimated_impact: impact(factor.weight * projected(kind.effect() * share)),
                });
            }
        }
    }
}

fn sentiment_candidates(
    factor: &ContributingFactor,
    signals: &SignalSet,
    out: &mut Vec<Recommendation>,
) {
    let Some(detail) = signals.sentiment() else {
        return;
    };

    let total_weight: f64 = detail.flagged_terms.iter().map(|t| t.weight).sum();
    let mut replaced = 0;

    if total_weight > 0.0 {
        for term in &detail.flagged_terms {
            let Some(softer) = SOFTER_WORDING.get(term.span.text.to_lowercase().as_str()) else {
                continue;
            };
            let share = term.weight / total_weight;
            out.push(Recommendation {
                kind: RecommendationKind::WordReplacement,
                target: Some(SignalKind::Sentiment),
                original: term.span.text.clone(),
                suggested: match_case(&term.span.text, softer),
                span: Some(term.span.clone()),
                rationale: format!("\"{}\" carries strongly negative sentiment", term.span.text),
                estimated_impact: impact(
                    factor.weighted_impact * RecommendationKind::WordReplacement.effect() * share,
                ),
            });
            replaced += 1;
        }
    }

    if replaced == 0 {
        out.push(Recommendation {
            kind: RecommendationKind::ToneAdjustment,
            target: Some(SignalKind::Sentiment),
            original: String::new(),
            suggested: "Soften the overall tone and drop charged wording".into(),
            span: None,
            rationale: format!(
                "Overall tone is {} (intensity {:.0}%)",
                detail.label.as_str(),
                detail.intensity * 100.0
            ),
            estimated_impact: impact(
                factor.weighted_impact * RecommendationKind::ToneAdjustment.effect(),
            ),
        });
    }
}

fn audience_candidates(
    factor: &ContributingFactor,
    job: &AnalysisJob,
    signals: &SignalSet,
    out: &mut Vec<Recommendation>,
) {
    let Some(detail) = signals.audience() else {
        return;
    };

    let targets = if job.platforms().is_empty() {
        "the target audience".to_string()
    } else {
        job.platforms()
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    out.push(Recommendation {
        kind: RecommendationKind::ToneAdjustment,
        target: Some(SignalKind::Audience),
        original: String::new(),
        suggested: format!("Adjust tone and framing for {targets}"),
        span: None,
        rationale: format!(
            "Predicted negative reaction is {:.0}% for {targets}",
            detail.distribution.negative
        ),
        estimated_impact: impact(
            factor.weighted_impact * RecommendationKind::ToneAdjustment.effect(),
        ),
    });

    if detail.distribution.negative >= CLARIFY_NEGATIVE_PCT {
        out.push(Recommendation {
            kind: RecommendationKind::Addition,
            target: Some(SignalKind::Audience),
            original: String::new(),
            suggested: "Add clarifying context up front so the intent cannot be misread".into(),
            span: None,
            rationale: "Most of the audience is predicted to react negatively".into(),
            estimated_impact: impact(factor.weighted_impact * RecommendationKind::Addition.effect()),
        });
    }
}

fn trend_candidates(
    factor: &ContributingFactor,
    signals: &SignalSet,
    out: &mut Vec<Recommendation>,
) {
    let Some(detail) = signals.trend() else {
        return;
    };

    for m in &detail.matches {
        let kind = if m.sentiment == TrendSentiment::Negative {
            RecommendationKind::Removal
        } else {
            RecommendationKind::PhraseModification
        };
        let suggested = match kind {
            RecommendationKind::Removal => String::new(),
            _ => format!("Mention \"{}\" without leaning on the trend", m.span.text),
        };
        let severity = clamp_severity(m.severity) * sentiment_factor(m.sentiment);

        out.push(Recommendation {
            kind,
            target: Some(SignalKind::Trend),
            original: m.span.text.clone(),
            suggested,
            span: Some(m.span.clone()),
            rationale: format!(
                "\"{}\" matches a {} trending topic ({} mentions)",
                m.phrase,
                m.sentiment.as_str(),
                m.volume
            ),
            estimated_impact: impact(factor.weight * severity * kind.effect()),
        });
    }
}

/// Controversy severity is the strongest dimension, so cutting one dimension
/// only lowers it down to the next strongest.
fn projected_drop(severity: f64, score: f64, runner_up: f64, fraction: f64) -> f64 {
    let edited = score * (1.0 - fraction);
    (severity - edited.max(runner_up)).max(0.0)
}

fn impact(raw: f64) -> f64 {
    round2(clamp_severity(raw))
}

fn match_case(original: &str, replacement: &str) -> String {
    let mut chars = replacement.chars();
    match (original.chars().next(), chars.next()) {
        (Some(o), Some(first)) if o.is_uppercase() => first.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}

/// Highest impact first; ties by kind priority, then original text, then rationale.
fn sorted(mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    recommendations.sort_by(|a, b| {
        b.estimated_impact
            .total_cmp(&a.estimated_impact)
            .then(a.kind.priority().cmp(&b.kind.priority()))
            .then_with(|| a.original.cmp(&b.original))
            .then_with(|| a.rationale.cmp(&b.rationale))
    });
    recommendations
}

/// Keep the first (highest-impact) candidate per key. Input must be sorted.
fn dedup(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    recommendations
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect()
}
