//! Read-only access to the current trending-phrase snapshot.
//!
//! Collection from external feeds happens elsewhere; a refresher pushes new
//! snapshots through [`SharedTrendFeed::replace`] (the service exposes this as
//! `PUT /api/v1/trends`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::types::TrendSentiment;

/// One phrase currently trending on social platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPhrase {
    pub phrase: String,
    /// Recent mention volume
    pub volume: u64,
    pub sentiment: TrendSentiment,
    /// Feed-assessed severity in [0, 100]; derived from volume when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<f64>,
}

/// Accessor for the latest trend snapshot.
pub trait TrendFeed: Send + Sync {
    fn snapshot(&self) -> Vec<TrendingPhrase>;
}

#[derive(Debug, Default)]
struct FeedState {
    phrases: Arc<Vec<TrendingPhrase>>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// In-process trend feed, replaced wholesale on every refresh.
#[derive(Debug, Default)]
pub struct SharedTrendFeed {
    state: RwLock<FeedState>,
}

impl SharedTrendFeed {
    pub fn new(phrases: Vec<TrendingPhrase>) -> Self {
        let feed = Self::default();
        feed.replace(phrases);
        feed
    }

    /// Swap in a new snapshot. Blank phrases are dropped.
    pub fn replace(&self, phrases: Vec<TrendingPhrase>) -> usize {
        let phrases: Vec<TrendingPhrase> = phrases
            .into_iter()
            .filter(|p| !p.phrase.trim().is_empty())
            .collect();
        let count = phrases.len();

        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.phrases = Arc::new(phrases);
        state.refreshed_at = Some(Utc::now());

        tracing::info!(phrases = count, "Trend snapshot replaced");
        count
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        match self.state.read() {
            Ok(guard) => guard.refreshed_at,
            Err(poisoned) => poisoned.into_inner().refreshed_at,
        }
    }
}

impl TrendFeed for SharedTrendFeed {
    fn snapshot(&self) -> Vec<TrendingPhrase> {
        let phrases = match self.state.read() {
            Ok(guard) => Arc::clone(&guard.phrases),
            Err(poisoned) => Arc::clone(&poisoned.into_inner().phrases),
        };
        phrases.as_ref().clone()
    }
}
