//! Per-topic latest-payload map.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use plantmon_core::MetricMap;
use serde::Serialize;

/// Latest decoded payload for one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveEntry {
    pub values: MetricMap,
    pub received_at: DateTime<Utc>,
    /// Arrival order across all topics.
    pub sequence: u64,
}

/// topic → latest payload. Last write wins; no history.
#[derive(Debug, Default)]
pub struct TopicPayloadMap {
    entries: HashMap<String, LiveEntry>,
    next_sequence: u64,
}

impl TopicPayloadMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `topic`. Returns the assigned sequence number.
    pub fn apply(&mut self, topic: &str, values: MetricMap) -> u64 {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.entries.insert(
            topic.to_string(),
            LiveEntry {
                values,
                received_at: Utc::now(),
                sequence,
            },
        );
        sequence
    }

    /// Drop the entry for `topic`; absent topics are a no-op.
    pub fn remove(&mut self, topic: &str) -> Option<LiveEntry> {
        self.entries.remove(topic)
    }

    pub fn get(&self, topic: &str) -> Option<&LiveEntry> {
        self.entries.get(topic)
    }

    pub fn values(&self, topic: &str) -> Option<&MetricMap> {
        self.entries.get(topic).map(|e| &e.values)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.entries.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Topics ordered by most recent arrival first.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<(&String, u64)> =
            self.entries.iter().map(|(t, e)| (t, e.sequence)).collect();
        topics.sort_by(|a, b| b.1.cmp(&a.1));
        topics.into_iter().map(|(t, _)| t.clone()).collect()
    }

    /// Copy of every entry, keyed by topic.
    pub fn snapshot(&self) -> BTreeMap<String, LiveEntry> {
        self.entries
            .iter()
            .map(|(t, e)| (t.clone(), e.clone()))
            .collect()
    }
}
