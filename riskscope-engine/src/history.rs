//! Historical incident lookup.
//!
//! The incident archive lives outside the engine; the explanation builder only
//! asks it for comparable past incidents.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::RwLock;

use crate::providers::ProviderError;

/// Number of comparisons returned by the built-in store.
pub const MAX_COMPARISONS: usize = 3;

/// Minimum token overlap for an incident to count as similar.
const MIN_SIMILARITY: f64 = 0.2;

/// A past content incident and how it played out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalIncident {
    pub id: String,
    pub summary: String,
    pub content: String,
    pub outcome: String,
    pub occurred_at: DateTime<Utc>,
}

/// An incident judged similar to the analyzed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub incident_id: String,
    pub summary: String,
    pub outcome: String,
    /// Similarity in [0, 1]
    pub similarity: f64,
    pub occurred_at: DateTime<Utc>,
}

#[async_trait]
pub trait HistoricalIncidentLookup: Send + Sync {
    async fn find_similar(&self, content: &str) -> Result<Vec<Comparison>, ProviderError>;
}

/// Lookup for deployments without an incident archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

#[async_trait]
impl HistoricalIncidentLookup for NoHistory {
    async fn find_similar(&self, _content: &str) -> Result<Vec<Comparison>, ProviderError> {
        Ok(Vec::new())
    }
}

/// In-memory incident store ranked by token Jaccard similarity.
#[derive(Debug, Default)]
pub struct InMemoryIncidentStore {
    incidents: RwLock<Vec<HistoricalIncident>>,
}

impl InMemoryIncidentStore {
    pub fn new(incidents: Vec<HistoricalIncident>) -> Self {
        Self {
            incidents: RwLock::new(incidents),
        }
    }

    pub fn record(&self, incident: HistoricalIncident) {
        match self.incidents.write() {
            Ok(mut guard) => guard.push(incident),
            Err(poisoned) => poisoned.into_inner().push(incident),
        }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[async_trait]
impl HistoricalIncidentLookup for InMemoryIncidentStore {
    async fn find_similar(&self, content: &str) -> Result<Vec<Comparison>, ProviderError> {
        let query = tokens(content);
        let incidents = match self.incidents.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        let mut scored: Vec<Comparison> = incidents
            .into_iter()
            .filter_map(|incident| {
                let similarity = jaccard(&query, &tokens(&incident.content));
                (similarity >= MIN_SIMILARITY).then(|| Comparison {
                    incident_id: incident.id,
                    summary: incident.summary,
                    outcome: incident.outcome,
                    similarity: (similarity * 100.0).round() / 100.0,
                    occurred_at: incident.occurred_at,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.incident_id.cmp(&b.incident_id))
        });
        scored.truncate(MAX_COMPARISONS);
        Ok(scored)
    }
}
