use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CaptureError, CaptureResult};

/// Lower bound on recognizer restart spacing.
pub const MIN_RECOGNIZER_RETRY_DELAY_MS: u64 = 50;

/// Which phrase matching mechanism the interpreter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    /// Substring match on the normalized transcript.
    Contains,
    /// Word-window Levenshtein match, tolerates unlisted misspellings.
    EditDistance,
}

impl Default for MatcherKind {
    fn default() -> Self {
        Self::Contains
    }
}

/// Session configuration. Read once at session start, never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_segment_duration_secs")]
    pub segment_duration_secs: u64,
    #[serde(default = "default_wake_phrase_variants")]
    pub wake_phrase_variants: Vec<String>,
    #[serde(default = "default_save_keyword")]
    pub save_keyword: String,
    #[serde(default = "default_cancel_synonyms")]
    pub cancel_synonyms: Vec<String>,
    /// Minimum number of completed segments kept available for saving.
    #[serde(default = "default_retention_count")]
    pub retention_count: usize,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_destination_collection")]
    pub destination_collection: String,
    #[serde(default = "default_recognizer_retry_delay_ms")]
    pub recognizer_retry_delay_ms: u64,
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    #[serde(default)]
    pub matcher: MatcherKind,
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: usize,
}

fn default_segment_duration_secs() -> u64 {
    60
}

fn default_wake_phrase_variants() -> Vec<String> {
    [
        "ok garmin",
        "ok garin",
        "ok garmen",
        "ok garmine",
        "ok garman",
        "ok karmin",
        "ok carmen",
        "ok karmen",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_save_keyword() -> String {
    "video".into()
}

fn default_cancel_synonyms() -> Vec<String> {
    vec!["nevermind".into(), "cancel".into(), "disregard".into()]
}

fn default_retention_count() -> usize {
    2
}

fn default_locale() -> String {
    "en-US".into()
}

fn default_destination_collection() -> String {
    "Garmin".into()
}

fn default_recognizer_retry_delay_ms() -> u64 {
    1000
}

fn default_event_queue_capacity() -> usize {
    64
}

fn default_max_edit_distance() -> usize {
    1
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            segment_duration_secs: default_segment_duration_secs(),
            wake_phrase_variants: default_wake_phrase_variants(),
            save_keyword: default_save_keyword(),
            cancel_synonyms: default_cancel_synonyms(),
            retention_count: default_retention_count(),
            locale: default_locale(),
            destination_collection: default_destination_collection(),
            recognizer_retry_delay_ms: default_recognizer_retry_delay_ms(),
            event_queue_capacity: default_event_queue_capacity(),
            matcher: MatcherKind::default(),
            max_edit_distance: default_max_edit_distance(),
        }
    }
}

impl CaptureConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> CaptureResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CaptureResult<()> {
        if self.segment_duration_secs == 0 {
            return Err(CaptureError::Config("segment_duration_secs must be > 0".into()));
        }
        if self.retention_count == 0 {
            return Err(CaptureError::Config("retention_count must be >= 1".into()));
        }
        if self.recognizer_retry_delay_ms < MIN_RECOGNIZER_RETRY_DELAY_MS {
            return Err(CaptureError::Config(format!(
                "recognizer_retry_delay_ms must be >= {}",
                MIN_RECOGNIZER_RETRY_DELAY_MS
            )));
        }
        if self.event_queue_capacity == 0 {
            return Err(CaptureError::Config("event_queue_capacity must be > 0".into()));
        }
        if self.wake_phrase_variants.iter().all(|p| p.trim().is_empty()) {
            return Err(CaptureError::Config("at least one wake phrase is required".into()));
        }
        if self.save_keyword.trim().is_empty() {
            return Err(CaptureError::Config("save_keyword must not be empty".into()));
        }
        Ok(())
    }

    pub fn segment_duration(&self) -> Duration {
        Duration::from_secs(self.segment_duration_secs)
    }

    pub fn recognizer_retry_delay(&self) -> Duration {
        Duration::from_millis(self.recognizer_retry_delay_ms)
    }
}
