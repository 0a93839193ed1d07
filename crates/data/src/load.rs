use anyhow::Context;
use rosterspin_core::{RevealConfig, Roster, RosterEntry};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ROSTER_FILE: &str = "roster.json";
pub const REVEAL_FILE: &str = "reveal.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RosterPayload {
    Entries(Vec<RosterEntry>),
    Names(Vec<String>),
    Wrapped { roster: Vec<RosterEntry> },
}

pub fn default_assets_dir() -> PathBuf {
    std::env::var_os("ROSTERSPIN_ASSETS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"))
}

pub fn parse_roster(raw: &str) -> anyhow::Result<Roster> {
    let payload: RosterPayload = serde_json::from_str(raw).context("parse roster")?;
    let entries = match payload {
        RosterPayload::Entries(entries) | RosterPayload::Wrapped { roster: entries } => entries,
        RosterPayload::Names(names) => names.into_iter().map(RosterEntry::named).collect(),
    };
    Ok(Roster::new(entries)?)
}

pub fn load_roster(dir: &Path) -> anyhow::Result<Roster> {
    let path = dir.join(ROSTER_FILE);
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let roster = parse_roster(&raw).with_context(|| format!("load {}", path.display()))?;
    tracing::info!(entries = roster.len(), path = %path.display(), "roster loaded");
    Ok(roster)
}

/// Reveal tuning; a missing file means defaults.
pub fn load_reveal_config(dir: &Path) -> anyhow::Result<RevealConfig> {
    let path = dir.join(REVEAL_FILE);
    if !path.exists() {
        return Ok(RevealConfig::default());
    }
    load_json(path)
}

fn load_json<T: DeserializeOwned>(path: PathBuf) -> anyhow::Result<T> {
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn roster_accepts_entries_names_and_wrapped_forms() {
        let entries =
            parse_roster(r#"[{"id":"Ash","image_ref":"https://img/a.png"},{"id":"Brin"}]"#)
                .expect("entries");
        assert_eq!(entries.len(), 2);
        assert!(entries.get("Ash").and_then(|entry| entry.image_ref.as_ref()).is_some());

        let names = parse_roster(r#"["Ash","Brin","Cole"]"#).expect("names");
        assert_eq!(names.entries()[2].id, "Cole");

        let wrapped = parse_roster(r#"{"roster":[{"id":"Ash","aux_text":["fast"]}]}"#)
            .expect("wrapped");
        assert_eq!(wrapped.entries()[0].aux_text, vec!["fast"]);
    }

    #[test]
    fn roster_validation_errors_surface() {
        let err = parse_roster(r#"["Ash","Ash"]"#).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate roster id Ash"));
        assert!(parse_roster("[]").is_err());
    }

    #[test]
    fn reveal_config_defaults_when_missing() {
        let dir = unique_temp_dir();
        fs::create_dir_all(&dir).expect("mkdir");
        assert_eq!(load_reveal_config(&dir).expect("load"), RevealConfig::default());
        fs::write(dir.join(REVEAL_FILE), r#"{"spin_ms":900,"window":5}"#).expect("write");
        let config = load_reveal_config(&dir).expect("load");
        assert_eq!(config.spin_ms, 900);
        assert_eq!(config.center_slot(), 2);
        let _ = fs::remove_dir_all(dir);
    }

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rosterspin_data_load_test_{}_{}",
            std::process::id(),
            nanos
        ))
    }
}
