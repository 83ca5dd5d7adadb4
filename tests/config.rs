use std::io::Write;

use dashvox::config::{MatcherKind, MIN_RECOGNIZER_RETRY_DELAY_MS};
use dashvox::{CaptureConfig, CaptureError};

#[test]
fn test_partial_json_keeps_defaults() {
    let config: CaptureConfig =
        serde_json::from_str(r#"{ "segment_duration_secs": 30, "matcher": "edit_distance" }"#).unwrap();
    assert_eq!(config.segment_duration_secs, 30);
    assert_eq!(config.matcher, MatcherKind::EditDistance);
    assert_eq!(config.retention_count, 2);
    assert_eq!(config.save_keyword, "video");
    assert_eq!(config.wake_phrase_variants.len(), 8);
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_retention_is_rejected() {
    let config = CaptureConfig { retention_count: 0, ..CaptureConfig::default() };
    assert!(matches!(config.validate(), Err(CaptureError::Config(_))));
}

#[test]
fn test_retry_delay_has_a_floor() {
    let config = CaptureConfig { recognizer_retry_delay_ms: 0, ..CaptureConfig::default() };
    assert!(matches!(config.validate(), Err(CaptureError::Config(_))));

    let config = CaptureConfig {
        recognizer_retry_delay_ms: MIN_RECOGNIZER_RETRY_DELAY_MS,
        ..CaptureConfig::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_rejects_invalid_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "recognizer_retry_delay_ms": 0 }}"#).unwrap();
    assert!(matches!(CaptureConfig::load(file.path()), Err(CaptureError::Config(_))));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "destination_collection": "Trips" }}"#).unwrap();
    let config = CaptureConfig::load(file.path()).unwrap();
    assert_eq!(config.destination_collection, "Trips");
}
