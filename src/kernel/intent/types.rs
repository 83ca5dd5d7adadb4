use serde::{Deserialize, Serialize};

/// Which kind of utterance the recognizer output is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListeningMode {
    /// Only the wake phrase is meaningful.
    WakeWait,
    /// A wake phrase was accepted; the next utterance is the command.
    CommandWait,
}

impl Default for ListeningMode {
    fn default() -> Self {
        Self::WakeWait
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    Wake,
    Save,
    Cancel,
    /// No phrase matched. A normal outcome, not an error.
    Unrecognized,
}

/// Classified meaning of one utterance in a given mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    /// Normalized transcript, kept for logging only.
    pub transcript: String,
}

impl Intent {
    pub fn new(kind: IntentKind, transcript: impl Into<String>) -> Self {
        Self { kind, transcript: transcript.into() }
    }
}
