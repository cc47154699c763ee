//! Endpoint hit counters for the admin surface
//!
//! Counted before authentication, so rejected calls are included.

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct EndpointHits {
    hits: DashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHit {
    pub name: String,
    pub hits: u64,
}

impl EndpointHits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, endpoint: &str) {
        *self.hits.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, endpoint: &str) -> u64 {
        self.hits.get(endpoint).map(|count| *count).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.hits.iter().map(|entry| *entry.value()).sum()
    }

    /// Most-hit first; equal counts by name
    pub fn snapshot(&self) -> Vec<EndpointHit> {
        let mut all: Vec<EndpointHit> = self
            .hits
            .iter()
            .map(|entry| EndpointHit {
                name: entry.key().clone(),
                hits: *entry.value(),
            })
            .collect();
        all.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.name.cmp(&b.name)));
        all
    }
}
