use dashvox::kernel::event::TranscriptEvent;
use dashvox::kernel::intent::interpreter::normalize;
use dashvox::kernel::intent::{CommandInterpreter, CommandVocabulary, EditDistanceMatcher, IntentKind, ListeningMode};
use dashvox::kernel::router::SpeechEventRouter;
use dashvox::CaptureConfig;

#[test]
fn test_normalize_strips_and_collapses() {
    assert_eq!(normalize("  OK,   Garmin!  "), "ok garmin");
    assert_eq!(normalize("What's the weather?"), "whats the weather");
    assert_eq!(normalize("never-mind"), "nevermind");
    assert_eq!(normalize(""), "");
}

#[test]
fn test_normalize_drops_non_ascii_punctuation() {
    assert_eq!(normalize("ok… garmin"), "ok garmin");
    assert_eq!(normalize("¿never—mind?"), "nevermind");
    assert_eq!(normalize("«video»"), "video");
    assert_eq!(normalize("Ça va"), "ça va");

    let interp = CommandInterpreter::default();
    assert_eq!(interp.classify("Ok… Garmin", ListeningMode::WakeWait).kind, IntentKind::Wake);
    assert_eq!(interp.classify("never—mind", ListeningMode::CommandWait).kind, IntentKind::Cancel);
}

#[test]
fn test_wake_only_checked_in_wake_wait() {
    let interp = CommandInterpreter::default();
    assert_eq!(interp.classify("ok carmen", ListeningMode::WakeWait).kind, IntentKind::Wake);
    assert_eq!(interp.classify("ok carmen", ListeningMode::CommandWait).kind, IntentKind::Unrecognized);
    assert_eq!(interp.classify("save the video", ListeningMode::WakeWait).kind, IntentKind::Unrecognized);
}

#[test]
fn test_save_beats_cancel() {
    let interp = CommandInterpreter::default();
    let intent = interp.classify("cancel that video, no save it", ListeningMode::CommandWait);
    assert_eq!(intent.kind, IntentKind::Save);
}

#[test]
fn test_vocabulary_is_configuration() {
    let config = CaptureConfig {
        wake_phrase_variants: vec!["hey dash".into()],
        save_keyword: "keep".into(),
        cancel_synonyms: vec!["forget it".into()],
        ..CaptureConfig::default()
    };
    let interp = CommandInterpreter::from_config(&config);
    assert_eq!(interp.classify("Hey, Dash!", ListeningMode::WakeWait).kind, IntentKind::Wake);
    assert_eq!(interp.classify("ok garmin", ListeningMode::WakeWait).kind, IntentKind::Unrecognized);
    assert_eq!(interp.classify("keep that", ListeningMode::CommandWait).kind, IntentKind::Save);
    assert_eq!(interp.classify("forget it", ListeningMode::CommandWait).kind, IntentKind::Cancel);
}

#[test]
fn test_edit_distance_catches_unlisted_spelling() {
    let contains = CommandInterpreter::default();
    assert_eq!(contains.classify("ok garmun", ListeningMode::WakeWait).kind, IntentKind::Unrecognized);

    let fuzzy = CommandInterpreter::new(
        CommandVocabulary::default(),
        Box::new(EditDistanceMatcher { max_distance: 1 }),
    );
    assert_eq!(fuzzy.classify("uh ok garmun start", ListeningMode::WakeWait).kind, IntentKind::Wake);
    assert_eq!(fuzzy.classify("hello there", ListeningMode::WakeWait).kind, IntentKind::Unrecognized);
}

#[test]
fn test_same_event_routes_by_mode() {
    let router = SpeechEventRouter::default();
    let event = TranscriptEvent::new(vec!["uh".into(), "nevermind".into(), "actually".into()]);
    assert_eq!(router.route(&event, ListeningMode::WakeWait).kind, IntentKind::Unrecognized);
    assert_eq!(router.route(&event, ListeningMode::CommandWait).kind, IntentKind::Cancel);
}

#[test]
fn test_empty_words_are_unrecognized() {
    let router = SpeechEventRouter::default();
    let intent = router.route(&TranscriptEvent::new(vec![]), ListeningMode::CommandWait);
    assert_eq!(intent.kind, IntentKind::Unrecognized);
    assert!(intent.transcript.is_empty());
}
