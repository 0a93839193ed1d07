use serde::{Deserialize, Serialize};

pub const HISTORY_KEY: &str = "rosterspin.history";
pub const CUSTOM_ICONS_KEY: &str = "rosterspin.custom_icons";

/// Tuning for the reveal animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RevealConfig {
    /// Dwell in the preview phase before spinning starts.
    pub preview_ms: u64,
    pub spin_ms: u64,
    /// Below this many available entries the reel is built from the full roster.
    pub min_pool: usize,
    pub reel_copies: usize,
    /// Number of adjacent entries visible at once; the centre slot is the pick.
    pub window: usize,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            preview_ms: 400,
            spin_ms: 3_000,
            min_pool: 3,
            reel_copies: 5,
            window: 3,
        }
    }
}

impl RevealConfig {
    pub fn window(&self) -> usize {
        self.window.max(1)
    }

    pub fn center_slot(&self) -> usize {
        self.window() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: RevealConfig = serde_json::from_str(r#"{"spin_ms":1200}"#).expect("parse");
        assert_eq!(config.spin_ms, 1_200);
        assert_eq!(config.preview_ms, 400);
        assert_eq!(config.center_slot(), 1);
    }
}
