use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: String,
    #[serde(default, alias = "imageRef", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default, alias = "auxText", skip_serializing_if = "Vec::is_empty")]
    pub aux_text: Vec<String>,
}

impl RosterEntry {
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_ref: None,
            aux_text: Vec::new(),
        }
    }

    pub fn with_image(mut self, uri: impl Into<String>) -> Self {
        self.image_ref = Some(uri.into());
        self
    }

    pub fn with_aux(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.aux_text = lines.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("roster is empty")]
    Empty,
    #[error("roster entry {0} has a blank id")]
    BlankId(usize),
    #[error("duplicate roster id {0}")]
    DuplicateId(String),
}

/// Fixed, ordered catalog of selectable entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Result<Self, RosterError> {
        if entries.is_empty() {
            return Err(RosterError::Empty);
        }
        let mut seen = HashSet::new();
        for (idx, entry) in entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(RosterError::BlankId(idx));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(RosterError::DuplicateId(entry.id.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(RosterEntry::named).collect())
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_and_blank_ids() {
        assert_eq!(
            Roster::from_names(["Ash", "Brin", "Ash"]),
            Err(RosterError::DuplicateId("Ash".to_string()))
        );
        assert_eq!(Roster::from_names(["Ash", " "]), Err(RosterError::BlankId(1)));
        assert_eq!(Roster::new(Vec::new()), Err(RosterError::Empty));
    }

    #[test]
    fn parses_camel_case_aliases() {
        let raw = r#"{"id":"Ash","imageRef":"https://img/ash.png","auxText":["tank","slow"]}"#;
        let entry: RosterEntry = serde_json::from_str(raw).expect("parse");
        assert_eq!(entry.image_ref.as_deref(), Some("https://img/ash.png"));
        assert_eq!(entry.aux_text, vec!["tank", "slow"]);
    }
}
