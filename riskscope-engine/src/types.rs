//! Core data model: analysis jobs, signal results and signal sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::RiskError;
use crate::scoring;

/// Maximum accepted content length, in characters, across all sections.
pub const MAX_CONTENT_CHARS: usize = 100_000;

/// Separator placed between sections in the analyzed text.
pub const SECTION_SEPARATOR: &str = "\n\n";

// ============================================================================
// Signal Kind / Status
// ============================================================================

/// The four analysis signals.
///
/// Ordering is the canonical order used for breakdown tie-breaks and map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Sentiment,
    Controversy,
    Audience,
    Trend,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Sentiment,
        SignalKind::Controversy,
        SignalKind::Audience,
        SignalKind::Trend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Controversy => "controversy",
            Self::Audience => "audience",
            Self::Trend => "trend",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one analyzer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Ok,
    Failed,
    TimedOut,
}

// ============================================================================
// Job
// ============================================================================

/// Kind of the submitted content. Media kinds carry transcribed/OCR text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Mixed,
}

impl ContentKind {
    /// Media-heavy jobs get the extended audience/trend timeout.
    pub fn is_media_heavy(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl FromStr for ContentKind {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "mixed" => Ok(Self::Mixed),
            other => Err(RiskError::validation(format!("unknown content kind '{other}'"))),
        }
    }
}

/// Target publishing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Instagram,
    Tiktok,
    Facebook,
    Linkedin,
    Youtube,
    Reddit,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Facebook => "facebook",
            Self::Linkedin => "linkedin",
            Self::Youtube => "youtube",
            Self::Reddit => "reddit",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Self::Twitter),
            "instagram" => Ok(Self::Instagram),
            "tiktok" => Ok(Self::Tiktok),
            "facebook" => Ok(Self::Facebook),
            "linkedin" => Ok(Self::Linkedin),
            "youtube" => Ok(Self::Youtube),
            "reddit" => Ok(Self::Reddit),
            other => Err(RiskError::validation(format!("unknown platform '{other}'"))),
        }
    }
}

/// Who the content is aimed at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudienceProfile {
    #[serde(default)]
    pub age_groups: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Topics this audience reacts strongly to (e.g. "political", "religious")
    #[serde(default)]
    pub sensitive_topics: Vec<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
}

/// One labelled section of normalized content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub label: String,
    pub text: String,
}

/// Raw submission as handed over by the ingestion layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    /// Single-body shortcut; mutually exclusive with `sections`
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    #[serde(default)]
    pub content_kind: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub audience: Option<AudienceProfile>,
}

impl JobRequest {
    /// Text-only request with a single body.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// One submission under analysis. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisJob {
    id: Uuid,
    sections: Vec<ContentSection>,
    text: String,
    content_kind: ContentKind,
    platforms: Vec<Platform>,
    audience: Option<AudienceProfile>,
    submitted_at: DateTime<Utc>,
    previous_job_id: Option<Uuid>,
}

impl AnalysisJob {
    /// Validate and normalize a request into a job.
    pub fn from_request(request: JobRequest) -> Result<Self, RiskError> {
        Self::build(request, None)
    }

    /// Build a job that re-analyzes modified content of an earlier submission.
    ///
    /// The previous id is carried for correlation only.
    pub fn revision_of(previous_job_id: Uuid, request: JobRequest) -> Result<Self, RiskError> {
        Self::build(request, Some(previous_job_id))
    }

    fn build(request: JobRequest, previous_job_id: Option<Uuid>) -> Result<Self, RiskError> {
        let JobRequest {
            content,
            sections,
            content_kind,
            platforms,
            audience,
        } = request;

        let raw_sections = match (content, sections.is_empty()) {
            (Some(_), false) => {
                return Err(RiskError::validation(
                    "provide either 'content' or 'sections', not both",
                ))
            }
            (Some(body), true) => vec![ContentSection {
                label: "body".to_string(),
                text: body,
            }],
            (None, false) => sections,
            (None, true) => return Err(RiskError::validation("job has no content")),
        };

        let mut normalized: Vec<ContentSection> = Vec::with_capacity(raw_sections.len());
        for section in raw_sections {
            let label = section.label.trim().to_string();
            let text = normalize_text(&section.text);
            if text.is_empty() {
                return Err(RiskError::validation(format!(
                    "section '{label}' is empty"
                )));
            }
            if normalized.iter().any(|s| s.label == label) {
                return Err(RiskError::validation(format!(
                    "duplicate section label '{label}'"
                )));
            }
            normalized.push(ContentSection { label, text });
        }

        let text = normalized
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);

        if text.chars().count() > MAX_CONTENT_CHARS {
            return Err(RiskError::validation(format!(
                "content exceeds {MAX_CONTENT_CHARS} characters"
            )));
        }

        let content_kind = content_kind
            .as_deref()
            .map(ContentKind::from_str)
            .transpose()?
            .unwrap_or_default();

        let mut parsed_platforms = platforms
            .iter()
            .map(|p| Platform::from_str(p))
            .collect::<Result<Vec<_>, _>>()?;
        parsed_platforms.sort();
        parsed_platforms.dedup();

        Ok(Self {
            id: Uuid::new_v4(),
            sections: normalized,
            text,
            content_kind,
            platforms: parsed_platforms,
            audience,
            submitted_at: Utc::now(),
            previous_job_id,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sections(&self) -> &[ContentSection] {
        &self.sections
    }

    /// Full analyzed text; all spans are byte offsets into this string.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn content_kind(&self) -> ContentKind {
        self.content_kind
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn audience(&self) -> Option<&AudienceProfile> {
        self.audience.as_ref()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn previous_job_id(&self) -> Option<Uuid> {
        self.previous_job_id
    }

    /// Whether the audience analyzer has anything to work with.
    pub fn has_audience_inputs(&self) -> bool {
        self.audience.is_some() || !self.platforms.is_empty()
    }
}

/// Trim, unify line endings and drop trailing whitespace on each line.
fn normalize_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ============================================================================
// Signal Details
// ============================================================================

/// A span of the analyzed text (byte offsets, `start..end`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextSpan {
    /// Slice a span out of `source`; `None` when out of bounds or not on char boundaries.
    pub fn from_source(source: &str, start: usize, end: usize) -> Option<Self> {
        if start >= end {
            return None;
        }
        source.get(start..end).map(|text| Self {
            start,
            end,
            text: text.to_string(),
        })
    }

    pub fn overlaps(&self, other: &TextSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Union of two overlapping spans of the same source text.
    pub fn merge(&self, other: &TextSpan) -> TextSpan {
        let (first, second) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };

        if second.end <= first.end {
            return first.clone();
        }

        let mut text = first.text.clone();
        text.push_str(&second.text[first.end - second.start..]);
        TextSpan {
            start: first.start,
            end: second.end,
            text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::Mixed => "mixed",
        }
    }

    pub fn is_negative_leaning(&self) -> bool {
        matches!(self, Self::Negative | Self::Mixed)
    }
}

/// A term the sentiment analyzer flagged as negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedTerm {
    pub span: TextSpan,
    /// Negative weight of the term in [0, 1]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentDetail {
    pub label: SentimentLabel,
    /// Emotional intensity in [0, 1]
    pub intensity: f64,
    /// Share of the emotional mass that is negative, in [0, 1]
    pub negative_weight: f64,
    pub flagged_terms: Vec<FlaggedTerm>,
}

/// The five controversy dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControversyDimension {
    Political,
    Religious,
    Social,
    Cultural,
    Personal,
}

impl ControversyDimension {
    pub const ALL: [ControversyDimension; 5] = [
        ControversyDimension::Political,
        ControversyDimension::Religious,
        ControversyDimension::Social,
        ControversyDimension::Cultural,
        ControversyDimension::Personal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Political => "political",
            Self::Religious => "religious",
            Self::Social => "social",
            Self::Cultural => "cultural",
            Self::Personal => "personal",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "political" | "politics" => Some(Self::Political),
            "religious" | "religion" => Some(Self::Religious),
            "social" => Some(Self::Social),
            "cultural" | "culture" => Some(Self::Cultural),
            "personal" | "personal_attack" => Some(Self::Personal),
            _ => None,
        }
    }
}

impl fmt::Display for ControversyDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: ControversyDimension,
    /// Score in [0, 100]
    pub score: f64,
    pub triggers: Vec<TextSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControversyDetail {
    /// One entry per dimension, in `ControversyDimension::ALL` order
    pub dimensions: Vec<DimensionScore>,
}

impl ControversyDetail {
    pub fn dimension(&self, dimension: ControversyDimension) -> Option<&DimensionScore> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    /// Highest-scoring dimension (first in canonical order on ties).
    pub fn strongest(&self) -> Option<&DimensionScore> {
        self.dimensions.iter().fold(None, |best, d| match best {
            Some(b) if b.score >= d.score => Some(b),
            _ => Some(d),
        })
    }
}

/// Predicted audience reaction, in percent. Sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionDistribution {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl ReactionDistribution {
    /// Fully neutral distribution.
    pub fn neutral() -> Self {
        Self {
            positive: 0.0,
            negative: 0.0,
            neutral: 100.0,
        }
    }

    /// Normalize arbitrary non-negative weights into percentages summing to 100.
    ///
    /// Each share is rounded to one decimal; the rounding residual goes to the
    /// largest share so the total stays exact.
    pub fn normalized(positive: f64, negative: f64, neutral: f64) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let (p, n, u) = (clean(positive), clean(negative), clean(neutral));
        let total = p + n + u;
        if total <= 0.0 {
            return Self::neutral();
        }

        let round1 = |v: f64| (v * 10.0).round() / 10.0;
        let mut shares = [
            round1(p / total * 100.0),
            round1(n / total * 100.0),
            round1(u / total * 100.0),
        ];
        let residual = 100.0 - shares.iter().sum::<f64>();
        let largest = (0..3)
            .max_by(|&a, &b| shares[a].total_cmp(&shares[b]).then(b.cmp(&a)))
            .unwrap_or(2);
        shares[largest] = round1(shares[largest] + residual);

        Self {
            positive: shares[0],
            negative: shares[1],
            neutral: shares[2],
        }
    }

    pub fn total(&self) -> f64 {
        self.positive + self.negative + self.neutral
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceDetail {
    pub distribution: ReactionDistribution,
    pub platform_notes: Vec<String>,
    /// True when no audience inputs existed and the provider was not called
    pub baseline: bool,
}

/// Sentiment of the conversation around a trending phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSentiment {
    Positive,
    Neutral,
    Negative,
}

impl TrendSentiment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "negative" | "neg" => Self::Negative,
            "positive" | "pos" => Self::Positive,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendMatch {
    pub phrase: String,
    pub span: TextSpan,
    pub volume: u64,
    pub sentiment: TrendSentiment,
    /// Severity of the trend itself in [0, 100], before sentiment weighting
    pub severity: f64,
}

/// Signal-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SignalDetail {
    Sentiment(SentimentDetail),
    Controversy(ControversyDetail),
    Audience(AudienceDetail),
    Trend(TrendDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendDetail {
    pub matches: Vec<TrendMatch>,
}

impl SignalDetail {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Sentiment(_) => SignalKind::Sentiment,
            Self::Controversy(_) => SignalKind::Controversy,
            Self::Audience(_) => SignalKind::Audience,
            Self::Trend(_) => SignalKind::Trend,
        }
    }
}

// ============================================================================
// Signal Result / Set
// ============================================================================

/// One analyzer's normalized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub kind: SignalKind,
    pub status: SignalStatus,
    /// Risk contribution in [0, 100]; always 0 unless status is ok
    pub severity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<SignalDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SignalResult {
    /// Successful result; severity is derived from the detail.
    pub fn ok(detail: SignalDetail, elapsed_ms: u64) -> Self {
        Self {
            kind: detail.kind(),
            status: SignalStatus::Ok,
            severity: scoring::severity(&detail),
            detail: Some(detail),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(kind: SignalKind, reason: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            kind,
            status: SignalStatus::Failed,
            severity: 0.0,
            detail: None,
            error: Some(reason.into()),
            elapsed_ms,
        }
    }

    pub fn timed_out(kind: SignalKind, reason: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            kind,
            status: SignalStatus::TimedOut,
            severity: 0.0,
            detail: None,
            error: Some(reason.into()),
            elapsed_ms,
        }
    }

    /// Neutral audience result used when a job has no audience inputs.
    pub fn audience_baseline() -> Self {
        Self::ok(
            SignalDetail::Audience(AudienceDetail {
                distribution: ReactionDistribution::neutral(),
                platform_notes: Vec::new(),
                baseline: true,
            }),
            0,
        )
    }

    pub fn is_ok(&self) -> bool {
        self.status == SignalStatus::Ok
    }
}

/// At most one result per signal kind for a single job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalSet {
    results: BTreeMap<SignalKind, SignalResult>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, returning the one it replaced for the same kind.
    pub fn insert(&mut self, result: SignalResult) -> Option<SignalResult> {
        self.results.insert(result.kind, result)
    }

    pub fn get(&self, kind: SignalKind) -> Option<&SignalResult> {
        self.results.get(&kind)
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.results.contains_key(&kind)
    }

    /// Results in canonical kind order.
    pub fn iter(&self) -> impl Iterator<Item = &SignalResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Kinds whose result is missing, failed or timed out.
    pub fn unavailable_kinds(&self) -> Vec<SignalKind> {
        SignalKind::ALL
            .into_iter()
            .filter(|kind| !self.get(*kind).is_some_and(SignalResult::is_ok))
            .collect()
    }

    pub fn sentiment(&self) -> Option<&SentimentDetail> {
        match self.ok_detail(SignalKind::Sentiment)? {
            SignalDetail::Sentiment(d) => Some(d),
            _ => None,
        }
    }

    pub fn controversy(&self) -> Option<&ControversyDetail> {
        match self.ok_detail(SignalKind::Controversy)? {
            SignalDetail::Controversy(d) => Some(d),
            _ => None,
        }
    }

    pub fn audience(&self) -> Option<&AudienceDetail> {
        match self.ok_detail(SignalKind::Audience)? {
            SignalDetail::Audience(d) => Some(d),
            _ => None,
        }
    }

    pub fn trend(&self) -> Option<&TrendDetail> {
        match self.ok_detail(SignalKind::Trend)? {
            SignalDetail::Trend(d) => Some(d),
            _ => None,
        }
    }

    fn ok_detail(&self, kind: SignalKind) -> Option<&SignalDetail> {
        self.get(kind)
            .filter(|r| r.is_ok())
            .and_then(|r| r.detail.as_ref())
    }
}

impl FromIterator<SignalResult> for SignalSet {
    fn from_iter<I: IntoIterator<Item = SignalResult>>(iter: I) -> Self {
        let mut set = SignalSet::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_from_single_content() {
        let job = AnalysisJob::from_request(JobRequest {
            content: Some("  Hello world  \r\nsecond line   ".into()),
            platforms: vec!["Twitter".into(), "x".into(), "reddit".into()],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(job.text(), "Hello world\nsecond line");
        assert_eq!(job.sections().len(), 1);
        assert_eq!(job.sections()[0].label, "body");
        assert_eq!(job.platforms(), &[Platform::Twitter, Platform::Reddit]);
        assert_eq!(job.content_kind(), ContentKind::Text);
        assert!(job.has_audience_inputs());
        assert!(job.previous_job_id().is_none());
    }

    #[test]
    fn test_job_sections_are_joined() {
        let job = AnalysisJob::from_request(JobRequest {
            sections: vec![
                ContentSection {
                    label: "title".into(),
                    text: "Big news".into(),
                },
                ContentSection {
                    label: "caption".into(),
                    text: "We did it".into(),
                },
            ],
            content_kind: Some("video".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(job.text(), "Big news\n\nWe did it");
        assert!(job.content_kind().is_media_heavy());
        assert!(!job.has_audience_inputs());
    }

    #[test]
    fn test_job_validation_errors() {
        assert!(AnalysisJob::from_request(JobRequest::default()).is_err());
        assert!(AnalysisJob::from_request(JobRequest::text("   \n  ")).is_err());

        let both = JobRequest {
            content: Some("a".into()),
            sections: vec![ContentSection {
                label: "b".into(),
                text: "b".into(),
            }],
            ..Default::default()
        };
        assert!(AnalysisJob::from_request(both).is_err());

        let duplicate = JobRequest {
            sections: vec![
                ContentSection {
                    label: "x".into(),
                    text: "one".into(),
                },
                ContentSection {
                    label: "x".into(),
                    text: "two".into(),
                },
            ],
            ..Default::default()
        };
        assert!(AnalysisJob::from_request(duplicate).is_err());

        let unknown_platform = JobRequest {
            platforms: vec!["myspace".into()],
            ..JobRequest::text("hello")
        };
        let err = AnalysisJob::from_request(unknown_platform).unwrap_err();
        assert!(err.to_string().contains("myspace"));

        let too_long = JobRequest::text("a".repeat(MAX_CONTENT_CHARS + 1));
        assert!(AnalysisJob::from_request(too_long).is_err());
    }

    #[test]
    fn test_revision_carries_previous_id() {
        let previous = Uuid::new_v4();
        let job = AnalysisJob::revision_of(previous, JobRequest::text("edited")).unwrap();
        assert_eq!(job.previous_job_id(), Some(previous));
        assert_ne!(job.id(), previous);
    }

    #[test]
    fn test_span_from_source_rejects_bad_offsets() {
        let text = "héllo world";
        assert!(TextSpan::from_source(text, 0, 2).is_none()); // inside 'é'
        assert!(TextSpan::from_source(text, 5, 5).is_none());
        assert!(TextSpan::from_source(text, 0, 100).is_none());
        assert_eq!(TextSpan::from_source(text, 7, 12).unwrap().text, "world");
    }

    #[test]
    fn test_span_merge() {
        let text = "the quick brown fox";
        let a = TextSpan::from_source(text, 4, 15).unwrap(); // "quick brown"
        let b = TextSpan::from_source(text, 10, 19).unwrap(); // "brown fox"
        assert!(a.overlaps(&b));

        let merged = a.merge(&b);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 19);
        assert_eq!(merged.text, "quick brown fox");
        assert_eq!(b.merge(&a), merged);

        let inner = TextSpan::from_source(text, 10, 15).unwrap();
        assert_eq!(a.merge(&inner), a);

        let disjoint = TextSpan::from_source(text, 0, 3).unwrap();
        assert!(!disjoint.overlaps(&a));
    }

    #[test]
    fn test_distribution_normalization_sums_to_100() {
        let d = ReactionDistribution::normalized(1.0, 1.0, 1.0);
        assert!((d.total() - 100.0).abs() < 1e-9);

        let d = ReactionDistribution::normalized(0.2, 0.45, 0.35);
        assert!((d.total() - 100.0).abs() < 1e-9);
        assert!((d.negative - 45.0).abs() < 1e-9);

        let d = ReactionDistribution::normalized(0.0, 0.0, 0.0);
        assert_eq!(d, ReactionDistribution::neutral());

        let d = ReactionDistribution::normalized(f64::NAN, 3.0, -1.0);
        assert!((d.negative - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_signal_set_unavailable_kinds() {
        let set: SignalSet = [
            SignalResult::audience_baseline(),
            SignalResult::failed(SignalKind::Sentiment, "boom", 3),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            set.unavailable_kinds(),
            vec![SignalKind::Sentiment, SignalKind::Controversy, SignalKind::Trend]
        );
        assert!(set.audience().is_some_and(|a| a.baseline));
        assert!(set.sentiment().is_none());
    }

    #[test]
    fn test_controversy_strongest_prefers_canonical_order_on_ties() {
        let detail = ControversyDetail {
            dimensions: ControversyDimension::ALL
                .into_iter()
                .map(|dimension| DimensionScore {
                    dimension,
                    score: if dimension == ControversyDimension::Personal {
                        10.0
                    } else {
                        60.0
                    },
                    triggers: Vec::new(),
                })
                .collect(),
        };
        let strongest = detail.strongest().unwrap();
        assert_eq!(strongest.dimension, ControversyDimension::Political);
        assert_eq!(strongest.score, 60.0);
    }
}
