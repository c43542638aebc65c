//! Core data types shared across the crawl pipeline.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One scored entry from a user's completed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub media_id: i64,
    pub title: String,
    /// Score on the 0-100 scale. Zero means watched but never rated.
    pub score: u8,
}

/// Media a user intends to watch, keyed by media id. No scores.
pub type PlanningMap = BTreeMap<i64, String>;

/// Unique user ids discovered while crawling completers.
pub type UserSet = BTreeSet<i64>;

/// Accumulated user-by-item score matrix.
///
/// Keyed the way the result file is laid out: media id (as a string) to the
/// sequence of `{user_id: score}` observations for it. Append-only during a
/// crawl; keys are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingsTable(BTreeMap<String, Vec<BTreeMap<String, u8>>>);

impl RatingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one (user, score) observation for a media id.
    pub fn record(&mut self, media_id: i64, user_id: i64, score: u8) {
        self.0
            .entry(media_id.to_string())
            .or_default()
            .push(BTreeMap::from([(user_id.to_string(), score)]));
    }

    /// Number of distinct media ids seen so far.
    pub fn media_count(&self) -> usize {
        self.0.len()
    }

    /// Total number of recorded observations.
    pub fn rating_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Snapshot of an interrupted ratings crawl.
///
/// `remaining_users` excludes every user already folded into `ratings`, so
/// resuming from a checkpoint is equivalent to an uninterrupted run over the
/// same input, modulo upstream data drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub ratings: RatingsTable,
    pub remaining_users: Vec<i64>,
    pub last_batch: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ratings_table_records_in_arrival_order() {
        let mut table = RatingsTable::new();
        table.record(12, 7, 80);
        table.record(12, 9, 55);
        table.record(3, 7, 100);

        assert_eq!(table.media_count(), 2);
        assert_eq!(table.rating_count(), 3);

        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(
            value,
            json!({
                "3": [{"7": 100}],
                "12": [{"7": 80}, {"9": 55}],
            })
        );
    }

    #[test]
    fn checkpoint_uses_the_on_disk_field_names() {
        let mut ratings = RatingsTable::new();
        ratings.record(1, 42, 90);
        let state = CheckpointState {
            ratings,
            remaining_users: vec![43, 44],
            last_batch: 19,
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({
                "ratings": {"1": [{"42": 90}]},
                "remaining_users": [43, 44],
                "last_batch": 19,
            })
        );

        let back: CheckpointState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
