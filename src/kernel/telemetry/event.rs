use serde::{Deserialize, Serialize};

use crate::kernel::intent::IntentKind;
use crate::kernel::segment::SegmentStatus;
use crate::kernel::state::ControllerPhase;
use crate::kernel::time::Tick;

// Allowed: sequences, ticks, counts, enums
// Forbidden: transcript text, paths, error strings

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEvent {
    PhaseTransition {
        from: ControllerPhase,
        to: ControllerPhase,
        tick: Tick,
    },

    SegmentLifecycle {
        sequence: u64,
        status: SegmentStatus,
        tick: Tick,
    },

    SegmentsEvicted {
        count: usize,
    },

    RotationSkipped {
        reason: SkipReason,
    },

    IntentClassified {
        kind: IntentKind,
    },

    Save {
        outcome: SaveOutcome,
        /// Ticks between the save request and its outcome, when known.
        latency_ticks: u64,
    },

    Recognizer(RecognizerEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    StopPending,
    StaleHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOutcome {
    Requested,
    NothingToSave,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognizerEvent {
    ArmRequested,
    Listening,
    StartFailed,
}
