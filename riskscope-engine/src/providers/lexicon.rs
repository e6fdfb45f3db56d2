//! Deterministic local providers.
//!
//! Lexicon scoring keeps the service usable without a model host: the same
//! content always yields the same raw output, which also makes these providers
//! the backbone of the pipeline tests.

use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{
    ProviderContext, ProviderError, ProviderOutput, RawAudience, RawControversy, RawDimension,
    RawSentiment, RawSpan, RawTrend, RawTrendMatch, SignalProvider,
};
use crate::trend_feed::TrendFeed;
use crate::types::{ControversyDimension, Platform, ReactionDistribution, SignalKind};

// ============================================================================
// Lexicons
// ============================================================================

/// Word polarity in [-1, 1].
static POLARITY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        // negative
        ("hate", -1.0),
        ("disgusting", -0.9),
        ("idiot", -0.9),
        ("idiots", -0.9),
        ("liar", -0.9),
        ("liars", -0.9),
        ("evil", -0.9),
        ("kill", -0.9),
        ("stupid", -0.8),
        ("terrible", -0.8),
        ("awful", -0.8),
        ("worst", -0.8),
        ("pathetic", -0.8),
        ("horrible", -0.8),
        ("furious", -0.8),
        ("shameful", -0.8),
        ("corrupt", -0.8),
        ("scam", -0.8),
        ("garbage", -0.7),
        ("trash", -0.7),
        ("useless", -0.7),
        ("disaster", -0.7),
        ("destroy", -0.7),
        ("crap", -0.7),
        ("toxic", -0.7),
        ("dumb", -0.7),
        ("angry", -0.6),
        ("ridiculous", -0.6),
        ("failure", -0.6),
        ("ugly", -0.6),
        ("fake", -0.6),
        ("bad", -0.5),
        ("annoying", -0.5),
        ("insane", -0.5),
        ("lazy", -0.5),
        ("boring", -0.4),
        ("sad", -0.4),
        // positive
        ("love", 0.9),
        ("amazing", 0.8),
        ("excellent", 0.8),
        ("wonderful", 0.8),
        ("awesome", 0.8),
        ("brilliant", 0.8),
        ("fantastic", 0.8),
        ("great", 0.7),
        ("beautiful", 0.7),
        ("inspiring", 0.7),
        ("happy", 0.6),
        ("proud", 0.6),
        ("excited", 0.6),
        ("grateful", 0.6),
        ("best", 0.6),
        ("celebrate", 0.6),
        ("success", 0.6),
        ("good", 0.5),
        ("enjoy", 0.5),
        ("win", 0.5),
        ("kind", 0.5),
        ("thanks", 0.4),
        ("thank", 0.4),
        ("support", 0.4),
    ])
});

static NEGATORS: &[&str] = &[
    "not", "never", "no", "don't", "dont", "isn't", "isnt", "wasn't", "wasnt", "can't", "cannot",
    "hardly",
];

static INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "so",
    "totally",
    "absolutely",
    "utterly",
];

/// Controversy triggers: phrase, dimension, weight in [0, 1].
static CONTROVERSY_TRIGGERS: &[(&str, ControversyDimension, f64)] = &[
    ("abortion", ControversyDimension::Political, 0.7),
    ("gun control", ControversyDimension::Political, 0.6),
    ("immigration", ControversyDimension::Political, 0.55),
    ("democrats", ControversyDimension::Political, 0.5),
    ("republicans", ControversyDimension::Political, 0.5),
    ("left-wing", ControversyDimension::Political, 0.5),
    ("right-wing", ControversyDimension::Political, 0.5),
    ("socialist", ControversyDimension::Political, 0.5),
    ("liberal", ControversyDimension::Political, 0.4),
    ("conservative", ControversyDimension::Political, 0.4),
    ("protest", ControversyDimension::Political, 0.4),
    ("election", ControversyDimension::Political, 0.35),
    ("president", ControversyDimension::Political, 0.3),
    ("government", ControversyDimension::Political, 0.25),
    ("vote", ControversyDimension::Political, 0.25),
    ("blasphemy", ControversyDimension::Religious, 0.8),
    ("islam", ControversyDimension::Religious, 0.55),
    ("muslim", ControversyDimension::Religious, 0.55),
    ("jewish", ControversyDimension::Religious, 0.55),
    ("religion", ControversyDimension::Religious, 0.5),
    ("atheist", ControversyDimension::Religious, 0.5),
    ("quran", ControversyDimension::Religious, 0.5),
    ("christian", ControversyDimension::Religious, 0.45),
    ("bible", ControversyDimension::Religious, 0.4),
    ("church", ControversyDimension::Religious, 0.35),
    ("god", ControversyDimension::Religious, 0.3),
    ("faith", ControversyDimension::Religious, 0.25),
    ("pray", ControversyDimension::Religious, 0.2),
    ("racist", ControversyDimension::Social, 0.8),
    ("racism", ControversyDimension::Social, 0.7),
    ("woke", ControversyDimension::Social, 0.6),
    ("feminism", ControversyDimension::Social, 0.55),
    ("transgender", ControversyDimension::Social, 0.55),
    ("lgbtq", ControversyDimension::Social, 0.5),
    ("gender", ControversyDimension::Social, 0.45),
    ("race", ControversyDimension::Social, 0.45),
    ("privilege", ControversyDimension::Social, 0.45),
    ("inequality", ControversyDimension::Social, 0.45),
    ("vaccine", ControversyDimension::Social, 0.45),
    ("police", ControversyDimension::Social, 0.35),
    ("poverty", ControversyDimension::Social, 0.3),
    ("appropriation", ControversyDimension::Cultural, 0.65),
    ("third world", ControversyDimension::Cultural, 0.6),
    ("stereotype", ControversyDimension::Cultural, 0.55),
    ("foreigners", ControversyDimension::Cultural, 0.55),
    ("immigrants", ControversyDimension::Cultural, 0.5),
    ("ethnic", ControversyDimension::Cultural, 0.45),
    ("accent", ControversyDimension::Cultural, 0.35),
    ("culture", ControversyDimension::Cultural, 0.3),
    ("tradition", ControversyDimension::Cultural, 0.25),
    ("heritage", ControversyDimension::Cultural, 0.25),
    ("moron", ControversyDimension::Personal, 0.8),
    ("liar", ControversyDimension::Personal, 0.75),
    ("idiot", ControversyDimension::Personal, 0.7),
    ("loser", ControversyDimension::Personal, 0.7),
    ("you people", ControversyDimension::Personal, 0.65),
    ("stupid", ControversyDimension::Personal, 0.6),
    ("shut up", ControversyDimension::Personal, 0.6),
    ("disgusting", ControversyDimension::Personal, 0.6),
    ("pathetic", ControversyDimension::Personal, 0.55),
    ("clown", ControversyDimension::Personal, 0.5),
    ("ugly", ControversyDimension::Personal, 0.5),
    ("fat", ControversyDimension::Personal, 0.5),
];

struct PlatformPrior {
    positive: f64,
    negative: f64,
    neutral: f64,
    note: &'static str,
}

fn platform_prior(platform: Platform) -> PlatformPrior {
    let (positive, negative, neutral, note) = match platform {
        Platform::Twitter => (25.0, 40.0, 35.0, "replies and quote-posts amplify negative reactions quickly"),
        Platform::Instagram => (45.0, 20.0, 35.0, "visual-first audience, captions are skimmed"),
        Platform::Tiktok => (40.0, 30.0, 30.0, "duets and stitches can recontextualize the content"),
        Platform::Facebook => (30.0, 35.0, 35.0, "shares into groups travel without the original context"),
        Platform::Linkedin => (45.0, 15.0, 40.0, "professional audience reads divisive topics as off-brand"),
        Platform::Youtube => (35.0, 30.0, 35.0, "comment sections skew toward strong opinions"),
        Platform::Reddit => (20.0, 45.0, 35.0, "communities scrutinize claims and tone closely"),
    };
    PlatformPrior {
        positive,
        negative,
        neutral,
        note,
    }
}

const GENERIC_PRIOR: (f64, f64, f64) = (35.0, 25.0, 40.0);

/// Follower count above which reach is called out.
const LARGE_FOLLOWING: u64 = 100_000;

// ============================================================================
// Matching helpers
// ============================================================================

/// Case-insensitive whole-word phrase matcher.
struct PhraseMatcher {
    automaton: AhoCorasick,
}

impl PhraseMatcher {
    fn new<I, P>(patterns: I) -> Result<Self, ProviderError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(patterns)
            .map_err(|e| ProviderError::Unavailable(format!("phrase matcher: {e}")))?;
        Ok(Self { automaton })
    }

    /// `(pattern index, start, end)` for every match on word boundaries.
    fn find_words(&self, text: &str) -> Vec<(usize, usize, usize)> {
        self.automaton
            .find_iter(text)
            .filter(|m| is_word_boundary(text, m.start(), m.end()))
            .map(|m| (m.pattern().as_usize(), m.start(), m.end()))
            .collect()
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

// ============================================================================
// Sentiment
// ============================================================================

/// Lexicon sentiment scorer with negation and intensifier handling.
pub struct SentimentLexicon {
    word: Regex,
}

impl SentimentLexicon {
    pub fn new() -> Result<Self, ProviderError> {
        let word = Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'’-]*")
            .map_err(|e| ProviderError::Unavailable(format!("tokenizer: {e}")))?;
        Ok(Self { word })
    }

    pub fn score(&self, text: &str) -> RawSentiment {
        let tokens: Vec<(usize, usize, String)> = self
            .word
            .find_iter(text)
            .map(|m| (m.start(), m.end(), m.as_str().to_lowercase().replace('’', "'")))
            .collect();

        let mut positive_mass = 0.0;
        let mut negative_mass = 0.0;
        let mut flagged = Vec::new();

        for (i, (start, end, word)) in tokens.iter().enumerate() {
            let Some(&polarity) = POLARITY.get(word.as_str()) else {
                continue;
            };

            let window = &tokens[i.saturating_sub(2)..i];
            let negator = window
                .iter()
                .find(|(_, _, w)| NEGATORS.contains(&w.as_str()))
                .map(|(s, _, _)| *s);
            let intensified = window
                .last()
                .is_some_and(|(_, _, w)| INTENSIFIERS.contains(&w.as_str()));

            let mut value = polarity;
            if intensified {
                value = (value * 1.5).clamp(-1.0, 1.0);
            }
            if negator.is_some() {
                value = -value * 0.5;
            }

            if value < 0.0 {
                negative_mass += -value;
                flagged.push(RawSpan {
                    start: negator.unwrap_or(*start),
                    end: *end,
                    weight: Some(-value),
                });
            } else {
                positive_mass += value;
            }
        }

        let total = positive_mass + negative_mass;
        if total <= 0.0 {
            return RawSentiment {
                label: "neutral".into(),
                intensity: 0.0,
                negative_weight: 0.0,
                flagged_terms: Vec::new(),
            };
        }

        let exclamations = text.matches('!').count() as f64;
        let intensity =
            (total / (1.0 + 0.15 * tokens.len() as f64) + (0.05 * exclamations).min(0.2)).min(1.0);
        let negative_weight = negative_mass / total;
        let label = if negative_weight >= 0.65 {
            "negative"
        } else if negative_weight <= 0.35 {
            "positive"
        } else {
            "mixed"
        };

        RawSentiment {
            label: label.into(),
            intensity,
            negative_weight,
            flagged_terms: flagged,
        }
    }
}

pub struct LexiconSentimentProvider {
    lexicon: SentimentLexicon,
}

impl LexiconSentimentProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            lexicon: SentimentLexicon::new()?,
        })
    }
}

#[async_trait]
impl SignalProvider for LexiconSentimentProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Sentiment
    }

    fn name(&self) -> &str {
        "lexicon-sentiment"
    }

    async fn analyze(
        &self,
        content: &str,
        _context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::Sentiment(self.lexicon.score(content)))
    }
}

// ============================================================================
// Controversy
// ============================================================================

/// Keyword-dimension controversy scorer.
///
/// Each dimension combines its trigger weights as independent evidence:
/// `1 - Π(1 - w)`.
pub struct ControversyLexicon {
    matcher: PhraseMatcher,
}

impl ControversyLexicon {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            matcher: PhraseMatcher::new(CONTROVERSY_TRIGGERS.iter().map(|(p, _, _)| *p))?,
        })
    }

    pub fn score(&self, text: &str) -> RawControversy {
        let mut dimensions: BTreeMap<ControversyDimension, (f64, Vec<RawSpan>)> =
            ControversyDimension::ALL
                .into_iter()
                .map(|d| (d, (1.0, Vec::new())))
                .collect();

        for (pattern, start, end) in self.matcher.find_words(text) {
            let Some(&(_, dimension, weight)) = CONTROVERSY_TRIGGERS.get(pattern) else {
                continue;
            };
            if let Some((complement, triggers)) = dimensions.get_mut(&dimension) {
                *complement *= 1.0 - weight;
                triggers.push(RawSpan {
                    start,
                    end,
                    weight: Some(weight),
                });
            }
        }

        RawControversy {
            dimensions: dimensions
                .into_iter()
                .map(|(dimension, (complement, triggers))| {
                    (
                        dimension.as_str().to_string(),
                        RawDimension {
                            score: 1.0 - complement,
                            triggers,
                        },
                    )
                })
                .collect(),
        }
    }
}

pub struct LexiconControversyProvider {
    lexicon: ControversyLexicon,
}

impl LexiconControversyProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            lexicon: ControversyLexicon::new()?,
        })
    }
}

#[async_trait]
impl SignalProvider for LexiconControversyProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Controversy
    }

    fn name(&self) -> &str {
        "lexicon-controversy"
    }

    async fn analyze(
        &self,
        content: &str,
        _context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::Controversy(self.lexicon.score(content)))
    }
}

// ============================================================================
// Audience
// ============================================================================

/// Audience reaction model: platform priors shifted by content tone, by
/// controversy the audience is sensitive to, and by interest overlap.
pub struct LexiconAudienceProvider {
    sentiment: SentimentLexicon,
    controversy: ControversyLexicon,
}

impl LexiconAudienceProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            sentiment: SentimentLexicon::new()?,
            controversy: ControversyLexicon::new()?,
        })
    }

    pub fn predict(&self, content: &str, context: &ProviderContext) -> RawAudience {
        let (mut positive, mut negative, mut neutral) = if context.platforms.is_empty() {
            GENERIC_PRIOR
        } else {
            let n = context.platforms.len() as f64;
            context
                .platforms
                .iter()
                .map(|p| platform_prior(*p))
                .fold((0.0, 0.0, 0.0), |(p, ng, nu), prior| {
                    (
                        p + prior.positive / n,
                        ng + prior.negative / n,
                        nu + prior.neutral / n,
                    )
                })
        };

        let tone = self.sentiment.score(content);
        positive += 30.0 * tone.intensity * (1.0 - tone.negative_weight);
        negative += 30.0 * tone.intensity * tone.negative_weight;

        let sensitive: Vec<ControversyDimension> = context
            .audience
            .as_ref()
            .map(|a| {
                a.sensitive_topics
                    .iter()
                    .filter_map(|t| ControversyDimension::parse(t))
                    .collect()
            })
            .unwrap_or_default();

        let mut notes = Vec::new();
        for (name, dimension) in &self.controversy.score(content).dimensions {
            if dimension.score <= 0.0 {
                continue;
            }
            let is_sensitive = ControversyDimension::parse(name)
                .is_some_and(|d| sensitive.contains(&d));
            negative += if is_sensitive { 40.0 } else { 15.0 } * dimension.score;
            if is_sensitive {
                notes.push(format!("audience is sensitive to {name} topics"));
            }
        }

        if let Some(profile) = &context.audience {
            let lowered = content.to_lowercase();
            let overlap = profile
                .interests
                .iter()
                .filter(|i| !i.trim().is_empty() && lowered.contains(&i.trim().to_lowercase()))
                .count();
            positive += 10.0 * overlap as f64;

            if profile.follower_count.is_some_and(|c| c >= LARGE_FOLLOWING) {
                negative += 5.0;
                neutral += 5.0;
                notes.push("large following, reactions spread beyond the core audience".into());
            }
        }

        let predicted = ReactionDistribution::normalized(positive, negative, neutral);
        let mut platform_notes: Vec<String> = context
            .platforms
            .iter()
            .map(|p| {
                format!(
                    "{p}: {}; predicted negative reaction {:.0}%",
                    platform_prior(*p).note,
                    predicted.negative
                )
            })
            .collect();
        platform_notes.extend(notes);

        RawAudience {
            positive,
            negative,
            neutral,
            platform_notes,
        }
    }
}

#[async_trait]
impl SignalProvider for LexiconAudienceProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Audience
    }

    fn name(&self) -> &str {
        "lexicon-audience"
    }

    async fn analyze(
        &self,
        content: &str,
        context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::Audience(self.predict(content, context)))
    }
}

// ============================================================================
// Trend
// ============================================================================

/// Matches content against the current trend snapshot.
pub struct FeedTrendProvider {
    feed: Arc<dyn TrendFeed>,
}

impl FeedTrendProvider {
    pub fn new(feed: Arc<dyn TrendFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl SignalProvider for FeedTrendProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Trend
    }

    fn name(&self) -> &str {
        "feed-trend"
    }

    async fn analyze(
        &self,
        content: &str,
        _context: &ProviderContext,
    ) -> Result<ProviderOutput, ProviderError> {
        let snapshot = self.feed.snapshot();
        if snapshot.is_empty() {
            return Ok(ProviderOutput::Trend(RawTrend::default()));
        }

        let matcher = PhraseMatcher::new(snapshot.iter().map(|p| p.phrase.trim()))?;
        let matches = matcher
            .find_words(content)
            .into_iter()
            .filter_map(|(pattern, start, end)| {
                snapshot.get(pattern).map(|phrase| RawTrendMatch {
                    phrase: phrase.phrase.trim().to_string(),
                    start,
                    end,
                    volume: phrase.volume,
                    sentiment: phrase.sentiment.as_str().to_string(),
                    severity: phrase.severity,
                })
            })
            .collect();

        Ok(ProviderOutput::Trend(RawTrend { matches }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend_feed::{SharedTrendFeed, TrendingPhrase};
    use crate::types::{AudienceProfile, ContentKind, TrendSentiment};
    use uuid::Uuid;

    fn context(platforms: Vec<Platform>, audience: Option<AudienceProfile>) -> ProviderContext {
        ProviderContext {
            job_id: Uuid::new_v4(),
            content_kind: ContentKind::Text,
            platforms,
            audience,
        }
    }

    #[test]
    fn test_sentiment_negative_content() {
        let lexicon = SentimentLexicon::new().unwrap();
        let text = "I hate this stupid update, it is terrible!";
        let raw = lexicon.score(text);

        assert_eq!(raw.label, "negative");
        assert!(raw.intensity > 0.5);
        assert!((raw.negative_weight - 1.0).abs() < 1e-9);
        let flagged: Vec<&str> = raw
            .flagged_terms
            .iter()
            .map(|s| &text[s.start..s.end])
            .collect();
        assert_eq!(flagged, vec!["hate", "stupid", "terrible"]);
    }

    #[test]
    fn test_sentiment_negation_flips_and_flags_phrase() {
        let lexicon = SentimentLexicon::new().unwrap();
        let text = "This is not good";
        let raw = lexicon.score(text);

        assert_eq!(raw.label, "negative");
        assert_eq!(raw.flagged_terms.len(), 1);
        let span = &raw.flagged_terms[0];
        assert_eq!(&text[span.start..span.end], "not good");
    }

    #[test]
    fn test_sentiment_neutral_and_positive() {
        let lexicon = SentimentLexicon::new().unwrap();
        let neutral = lexicon.score("The meeting is at noon.");
        assert_eq!(neutral.label, "neutral");
        assert_eq!(neutral.intensity, 0.0);

        let positive = lexicon.score("We love our amazing community, thank you!");
        assert_eq!(positive.label, "positive");
        assert!(positive.flagged_terms.is_empty());
    }

    #[test]
    fn test_controversy_dimensions_and_boundaries() {
        let lexicon = ControversyLexicon::new().unwrap();
        let text = "Abortion and gun control will decide the election. Godzilla approves.";
        let raw = lexicon.score(text);

        assert_eq!(raw.dimensions.len(), 5);
        let political = &raw.dimensions["political"];
        assert_eq!(political.triggers.len(), 3);
        // 1 - (0.3 * 0.4 * 0.65)
        assert!((political.score - 0.922).abs() < 1e-9);
        assert_eq!(raw.dimensions["religious"].score, 0.0);
    }

    #[test]
    fn test_audience_sensitive_topics_raise_negative_share() {
        let provider = LexiconAudienceProvider::new().unwrap();
        let text = "Our take on the election and immigration.";

        let relaxed = provider.predict(text, &context(vec![Platform::Linkedin], None));
        let sensitive = provider.predict(
            text,
            &context(
                vec![Platform::Linkedin],
                Some(AudienceProfile {
                    sensitive_topics: vec!["politics".into()],
                    ..Default::default()
                }),
            ),
        );

        let share = |raw: &RawAudience| {
            ReactionDistribution::normalized(raw.positive, raw.negative, raw.neutral).negative
        };
        assert!(share(&sensitive) > share(&relaxed));
        assert!(sensitive
            .platform_notes
            .iter()
            .any(|n| n.contains("sensitive to political")));
        assert!(relaxed.platform_notes[0].starts_with("linkedin:"));
    }

    #[tokio::test]
    async fn test_trend_provider_matches_snapshot() {
        let feed = Arc::new(SharedTrendFeed::new(vec![
            TrendingPhrase {
                phrase: "Boycott Brand".into(),
                volume: 12_000,
                sentiment: TrendSentiment::Negative,
                severity: None,
            },
            TrendingPhrase {
                phrase: "summer vibes".into(),
                volume: 800,
                sentiment: TrendSentiment::Positive,
                severity: Some(20.0),
            },
        ]));
        let provider = FeedTrendProvider::new(feed);

        let text = "Time to boycott brand? Nah, summer vibes only. summer vibesss";
        let output = provider.analyze(text, &context(vec![], None)).await.unwrap();
        let ProviderOutput::Trend(raw) = output else {
            panic!("expected trend output");
        };

        assert_eq!(raw.matches.len(), 2);
        assert_eq!(raw.matches[0].phrase, "Boycott Brand");
        assert_eq!(&text[raw.matches[0].start..raw.matches[0].end], "boycott brand");
        assert_eq!(raw.matches[1].severity, Some(20.0));
    }

    #[tokio::test]
    async fn test_trend_provider_empty_snapshot() {
        let provider = FeedTrendProvider::new(Arc::new(SharedTrendFeed::default()));
        let output = provider.analyze("anything", &context(vec![], None)).await.unwrap();
        assert_eq!(output, ProviderOutput::Trend(RawTrend::default()));
    }
}
