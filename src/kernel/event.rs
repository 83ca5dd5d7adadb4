use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segment::SegmentHandle;

/// Collaborators whose readiness gates the start of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Camera,
    Recognizer,
}

/// One recognizer result. Ephemeral: dropped once classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub words: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEvent {
    pub fn new(words: Vec<String>) -> Self {
        Self { words, timestamp: Utc::now() }
    }

    /// Splits a recognized line on whitespace.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.split_whitespace().map(str::to_string).collect())
    }

    pub fn joined(&self) -> String {
        self.words.join(" ")
    }
}

/// Everything the controller reacts to. Delivered one at a time.
#[derive(Debug, Clone)]
pub enum Event {
    Ready(Device),
    Transcript(TranscriptEvent),
    /// Rotation timer for the given segment elapsed.
    RotationDue(SegmentHandle),
    SegmentFinished { handle: SegmentHandle, path: String },
    SegmentFailed { handle: SegmentHandle, reason: String },
    RecognizerReady,
    RecognizerFailed(String),
    PersistenceFinished { request: u64, result: Result<String, String> },
    Shutdown,
}

impl Event {
    pub fn transcript(text: &str) -> Self {
        Event::Transcript(TranscriptEvent::from_text(text))
    }
}
