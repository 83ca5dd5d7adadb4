use super::event::TranscriptEvent;
use super::intent::{CommandInterpreter, Intent, ListeningMode};

/// Classifies transcript events against the current mode.
/// Holds no mode of its own; the controller passes it in.
pub struct SpeechEventRouter {
    interpreter: CommandInterpreter,
}

impl SpeechEventRouter {
    pub fn new(interpreter: CommandInterpreter) -> Self {
        Self { interpreter }
    }

    pub fn route(&self, event: &TranscriptEvent, mode: ListeningMode) -> Intent {
        self.interpreter.classify(&event.joined(), mode)
    }
}

impl Default for SpeechEventRouter {
    fn default() -> Self {
        Self::new(CommandInterpreter::default())
    }
}
