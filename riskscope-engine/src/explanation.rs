//! Explanation builder.
//!
//! Renders an assessment into a summary sentence, a factor-by-factor
//! rationale and the spans of the content that raised concern.

use serde::{Deserialize, Serialize};

use crate::aggregator::RiskAssessment;
use crate::history::Comparison;
use crate::recommendation::{Recommendation, RecommendationSet};
use crate::scoring::{clamp_severity, round2, sentiment_factor};
use crate::types::{SignalKind, SignalSet, TextSpan};

/// A region of the content flagged by one or more signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedIssue {
    pub span: TextSpan,
    pub severity: f64,
    pub reasons: Vec<String>,
    pub kinds: Vec<SignalKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub rationale: String,
    pub highlighted_issues: Vec<HighlightedIssue>,
    pub comparisons: Vec<Comparison>,
}

pub fn explain(
    assessment: &RiskAssessment,
    recommendations: &RecommendationSet,
    signals: &SignalSet,
    comparisons: Vec<Comparison>,
) -> Explanation {
    Explanation {
        summary: summary(assessment),
        rationale: rationale(assessment, recommendations),
        highlighted_issues: merge_overlapping(collect_issues(signals)),
        comparisons,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn summary(assessment: &RiskAssessment) -> String {
    let unavailable = assessment.unavailable_signals.len();
    if unavailable == SignalKind::ALL.len() {
        return "Risk could not be assessed: no analysis signal was available, so the content \
                is treated as low risk with 0% confidence."
            .to_string();
    }

    let category = capitalize(assessment.risk_category.as_str());
    let headline = match assessment.dominant_factor() {
        Some(factor) => format!(
            "{category} risk ({:.2}/100), driven mainly by {} ({:.2} points)",
            assessment.risk_score, factor.kind, factor.weighted_impact
        ),
        None => format!(
            "{category} risk ({:.2}/100) with no risk factors detected",
            assessment.risk_score
        ),
    };

    if assessment.low_confidence {
        format!(
            "{headline}, with low confidence ({:.0}%) as {unavailable} of {} signals were unavailable.",
            assessment.confidence_level,
            SignalKind::ALL.len()
        )
    } else {
        format!("{headline}.")
    }
}

fn describe_recommendation(rec: &Recommendation) -> String {
    if rec.original.is_empty() {
        format!(
            "{} (about {:.2} points lower)",
            rec.suggested, rec.estimated_impact
        )
    } else if rec.suggested.is_empty() {
        format!(
            "remove \"{}\" (about {:.2} points lower)",
            rec.original, rec.estimated_impact
        )
    } else {
        format!(
            "replace \"{}\" with \"{}\" (about {:.2} points lower)",
            rec.original, rec.suggested, rec.estimated_impact
        )
    }
}

fn rationale(assessment: &RiskAssessment, recommendations: &RecommendationSet) -> String {
    let mut sentences = Vec::new();

    if !assessment.factors.is_empty() {
        let clauses: Vec<String> = assessment
            .factors
            .iter()
            .map(|f| {
                format!(
                    "{} severity {:.1} at weight {:.2} adds {:.2} points",
                    f.kind, f.severity, f.weight, f.weighted_impact
                )
            })
            .collect();
        sentences.push(format!("{}.", capitalize(&clauses.join("; "))));
    }

    if assessment.degraded {
        let missing: Vec<&str> = assessment
            .unavailable_signals
            .iter()
            .map(SignalKind::as_str)
            .collect();
        sentences.push(format!(
            "Degraded assessment: {} unavailable, confidence {:.0}%.",
            missing.join(", "),
            assessment.confidence_level
        ));
    }

    if let Some(top) = recommendations.first() {
        sentences.push(format!(
            "Top recommendation: {}.",
            describe_recommendation(top)
        ));
    }

    if sentences.is_empty() {
        "No signal raised a concern.".to_string()
    } else {
        sentences.join(" ")
    }
}

fn issue(span: &TextSpan, severity: f64, reason: String, kind: SignalKind) -> HighlightedIssue {
    HighlightedIssue {
        span: span.clone(),
        severity: round2(clamp_severity(severity)),
        reasons: vec![reason],
        kinds: vec![kind],
    }
}

fn collect_issues(signals: &SignalSet) -> Vec<HighlightedIssue> {
    let mut issues = Vec::new();

    if let (Some(detail), Some(result)) = (signals.sentiment(), signals.get(SignalKind::Sentiment)) {
        for term in &detail.flagged_terms {
            issues.push(issue(
                &term.span,
                result.severity * term.weight,
                format!("negative sentiment: \"{}\"", term.span.text),
                SignalKind::Sentiment,
            ));
        }
    }

    if let Some(detail) = signals.controversy() {
        for dim in &detail.dimensions {
            for trigger in &dim.triggers {
                issues.push(issue(
                    trigger,
                    dim.score,
                    format!("{} controversy trigger", dim.dimension),
                    SignalKind::Controversy,
                ));
            }
        }
    }

    if let Some(detail) = signals.trend() {
        for m in &detail.matches {
            issues.push(issue(
                &m.span,
                clamp_severity(m.severity) * sentiment_factor(m.sentiment),
                format!(
                    "{} trending phrase \"{}\" ({} mentions)",
                    m.sentiment.as_str(),
                    m.phrase,
                    m.volume
                ),
                SignalKind::Trend,
            ));
        }
    }

    issues
}

/// Merge overlapping issues into one per union span, keeping the maximum
/// severity and every distinct reason and kind. Output is in text order.
fn merge_overlapping(mut issues: Vec<HighlightedIssue>) -> Vec<HighlightedIssue> {
    issues.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.span.end.cmp(&a.span.end))
    });

    let mut merged: Vec<HighlightedIssue> = Vec::with_capacity(issues.len());
    for next in issues {
        match merged.last_mut() {
            Some(current) if current.span.overlaps(&next.span) => {
                current.span = current.span.merge(&next.span);
                current.severity = current.severity.max(next.severity);
                for reason in next.reasons {
                    if !current.reasons.contains(&reason) {
                        current.reasons.push(reason);
                    }
                }
                for kind in next.kinds {
                    if !current.kinds.contains(&kind) {
                        current.kinds.push(kind);
                    }
                }
                current.kinds.sort();
            }
            _ => merged.push(next),
        }
    }
    merged
}
