use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::intent::{Intent, IntentKind, ListeningMode};
use super::segment::{Segment, SegmentHandle};
use super::state::{ControllerPhase, StateDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueId {
    /// Wake phrase accepted.
    Acknowledge,
    /// Save dispatched.
    Confirm,
    /// Command cancelled.
    Dismiss,
    SaveFailed,
}

/// Published to UI-level subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    PhaseChanged(ControllerPhase),
    SegmentCompleted { sequence: u64, path: String },
    SegmentFailed { sequence: u64, reason: String },
    SaveStarted { sequence: u64 },
    Saved { sequence: u64, location: String },
    SaveFailed { sequence: u64, reason: String },
    NothingToSave,
    Stopped,
}

/// Work the controller asks the reactor to perform. Executing these is the
/// only place backends are touched.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    BeginSegment(SegmentHandle),
    EndSegment(SegmentHandle),
    /// Stop without completing; used at teardown.
    AbandonSegment(SegmentHandle),
    DiscardMedia { sequence: u64, path: String },
    ScheduleRotation { handle: SegmentHandle, after: Duration },
    CancelRotation,
    ArmRecognizer { after: Option<Duration> },
    StopRecognizer,
    /// `request` is unique per save so repeated saves of one segment are
    /// tracked separately.
    Persist { request: u64, sequence: u64, path: String, collection: String },
    PlayCue(CueId),
    Notify(Notice),
}

/// Pure projection of a classified intent onto deltas and effects.
pub struct Scheduler {
    collection: String,
    next_request: u64,
}

impl Scheduler {
    pub fn new(collection: impl Into<String>) -> Self {
        Self { collection: collection.into(), next_request: 1 }
    }

    /// `last_completed` is only consulted for `Save`.
    pub fn schedule(
        &mut self,
        intent: &Intent,
        mode: ListeningMode,
        last_completed: Option<&Segment>,
    ) -> (Option<StateDelta>, Vec<SideEffect>) {
        let back_to_wake = StateDelta::PhaseChanged(ControllerPhase::ActiveWakeWait);

        match (mode, intent.kind) {
            (ListeningMode::WakeWait, IntentKind::Wake) => (
                Some(StateDelta::PhaseChanged(ControllerPhase::ActiveCommandWait)),
                vec![SideEffect::PlayCue(CueId::Acknowledge)],
            ),
            (ListeningMode::WakeWait, _) => (None, Vec::new()),

            (ListeningMode::CommandWait, IntentKind::Save) => {
                let effects = match last_completed.and_then(|s| s.path.clone().map(|p| (s.sequence, p))) {
                    Some((sequence, path)) => vec![
                        SideEffect::Persist {
                            request: self.allocate_request(),
                            sequence,
                            path,
                            collection: self.collection.clone(),
                        },
                        SideEffect::PlayCue(CueId::Confirm),
                        SideEffect::Notify(Notice::SaveStarted { sequence }),
                    ],
                    None => vec![SideEffect::Notify(Notice::NothingToSave)],
                };
                (Some(back_to_wake), effects)
            }
            (ListeningMode::CommandWait, IntentKind::Cancel) => {
                (Some(back_to_wake), vec![SideEffect::PlayCue(CueId::Dismiss)])
            }
            // Silent fallback so stray speech never strands the exchange.
            (ListeningMode::CommandWait, IntentKind::Unrecognized) => (Some(back_to_wake), Vec::new()),
            (ListeningMode::CommandWait, IntentKind::Wake) => (Some(back_to_wake), Vec::new()),
        }
    }

    fn allocate_request(&mut self) -> u64 {
        let request = self.next_request;
        self.next_request += 1;
        request
    }
}
