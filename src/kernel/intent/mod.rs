pub mod interpreter;
pub mod types;

pub use interpreter::{CommandInterpreter, CommandVocabulary, ContainsMatcher, EditDistanceMatcher, PhraseMatcher};
pub use types::{Intent, IntentKind, ListeningMode};
