use crate::{Roster, RosterEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Past draws, most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn record(&mut self, id: impl Into<String>, timestamp: i64) {
        self.entries.insert(
            0,
            HistoryEntry {
                id: id.into(),
                timestamp,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops entries whose id is not in the roster, returning the dropped ids.
    pub fn retain_known(&mut self, roster: &Roster) -> Vec<String> {
        let mut dropped = Vec::new();
        self.entries.retain(|entry| {
            let known = roster.contains(&entry.id);
            if !known {
                dropped.push(entry.id.clone());
            }
            known
        });
        dropped
    }
}

/// Roster entries not yet drawn, in roster order.
pub fn available_pool<'a>(roster: &'a Roster, history: &History) -> Vec<&'a RosterEntry> {
    let drawn = history.ids();
    roster
        .entries()
        .iter()
        .filter(|entry| !drawn.contains(entry.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_prepends_and_pool_excludes_drawn() {
        let roster = Roster::from_names(["A", "B", "C"]).expect("roster");
        let mut history = History::default();
        history.record("B", 10);
        history.record("A", 20);
        assert_eq!(history.latest().map(|entry| entry.id.as_str()), Some("A"));
        let pool: Vec<_> = available_pool(&roster, &history)
            .into_iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(pool, vec!["C"]);
    }

    #[test]
    fn retain_known_drops_foreign_ids() {
        let roster = Roster::from_names(["A", "B"]).expect("roster");
        let mut history: History =
            serde_json::from_str(r#"[{"id":"Z","timestamp":3},{"id":"A","timestamp":1}]"#)
                .expect("parse");
        assert_eq!(history.retain_known(&roster), vec!["Z".to_string()]);
        assert_eq!(history.len(), 1);
        assert!(history.contains("A"));
    }
}
