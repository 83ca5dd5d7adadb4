//! Maps normalized recognizer text to an [`Intent`].
//!
//! Recognizer output is noisy and often partial, so every phrase check is a
//! "does the transcript contain this" check, never equality. The phrase sets
//! live in [`CommandVocabulary`] and the comparison itself is a
//! [`PhraseMatcher`], so confusable spellings can be added as configuration
//! and the matching strategy swapped without touching the classifier.

use crate::config::{CaptureConfig, MatcherKind};

use super::types::{Intent, IntentKind, ListeningMode};

/// Decides whether a phrase occurs in a normalized transcript.
pub trait PhraseMatcher: Send + Sync {
    fn matches(&self, transcript: &str, phrase: &str) -> bool;
}

/// Plain substring semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsMatcher;

impl PhraseMatcher for ContainsMatcher {
    fn matches(&self, transcript: &str, phrase: &str) -> bool {
        !phrase.is_empty() && transcript.contains(phrase)
    }
}

/// Substring match first, then any window of as many words as the phrase
/// within `max_distance` character edits of it.
#[derive(Debug, Clone, Copy)]
pub struct EditDistanceMatcher {
    pub max_distance: usize,
}

impl PhraseMatcher for EditDistanceMatcher {
    fn matches(&self, transcript: &str, phrase: &str) -> bool {
        if phrase.is_empty() {
            return false;
        }
        if transcript.contains(phrase) {
            return true;
        }
        let words: Vec<&str> = transcript.split(' ').filter(|w| !w.is_empty()).collect();
        let width = phrase.split(' ').count();
        if words.len() < width {
            return false;
        }
        words
            .windows(width)
            .any(|window| levenshtein(&window.join(" "), phrase) <= self.max_distance)
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Lowercase, drop punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Phrase sets, stored normalized.
#[derive(Debug, Clone)]
pub struct CommandVocabulary {
    pub wake_phrases: Vec<String>,
    pub save_keyword: String,
    pub cancel_synonyms: Vec<String>,
}

impl CommandVocabulary {
    pub fn from_config(config: &CaptureConfig) -> Self {
        let norm_all = |items: &[String]| -> Vec<String> {
            items.iter().map(|p| normalize(p)).filter(|p| !p.is_empty()).collect()
        };
        Self {
            wake_phrases: norm_all(&config.wake_phrase_variants),
            save_keyword: normalize(&config.save_keyword),
            cancel_synonyms: norm_all(&config.cancel_synonyms),
        }
    }
}

impl Default for CommandVocabulary {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

pub struct CommandInterpreter {
    vocabulary: CommandVocabulary,
    matcher: Box<dyn PhraseMatcher>,
}

impl CommandInterpreter {
    pub fn new(vocabulary: CommandVocabulary, matcher: Box<dyn PhraseMatcher>) -> Self {
        Self { vocabulary, matcher }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        let matcher: Box<dyn PhraseMatcher> = match config.matcher {
            MatcherKind::Contains => Box::new(ContainsMatcher),
            MatcherKind::EditDistance => Box::new(EditDistanceMatcher {
                max_distance: config.max_edit_distance,
            }),
        };
        Self::new(CommandVocabulary::from_config(config), matcher)
    }

    /// Wake phrases are only checked in `WakeWait`; the save keyword and
    /// then the cancel set only in `CommandWait`.
    pub fn classify(&self, transcript: &str, mode: ListeningMode) -> Intent {
        let text = normalize(transcript);
        let kind = match mode {
            ListeningMode::WakeWait => {
                if self.any_match(&text, &self.vocabulary.wake_phrases) {
                    IntentKind::Wake
                } else {
                    IntentKind::Unrecognized
                }
            }
            ListeningMode::CommandWait => {
                if self.matcher.matches(&text, &self.vocabulary.save_keyword) {
                    IntentKind::Save
                } else if self.any_match(&text, &self.vocabulary.cancel_synonyms) {
                    IntentKind::Cancel
                } else {
                    IntentKind::Unrecognized
                }
            }
        };
        Intent::new(kind, text)
    }

    fn any_match(&self, text: &str, phrases: &[String]) -> bool {
        phrases.iter().any(|p| self.matcher.matches(text, p))
    }
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(CommandVocabulary::default(), Box::new(ContainsMatcher))
    }
}
