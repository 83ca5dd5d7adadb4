use super::event::{RecognizerEvent, SaveOutcome, TelemetryEvent};
use crate::kernel::intent::IntentKind;
use crate::kernel::segment::SegmentStatus;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub segment_stats: SegmentStats,
    pub command_stats: CommandStats,
    pub save_stats: SaveStats,
    pub recognizer_stats: RecognizerStats,
    pub phase_transitions: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentStats {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub evicted: u64,
    pub rotations_skipped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CommandStats {
    pub wakes: u64,
    pub saves: u64,
    pub cancels: u64,
    pub unrecognized: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SaveStats {
    pub requested: u64,
    pub nothing_to_save: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub total_latency_ticks: u64,
}

impl SaveStats {
    /// Mean ticks from request to outcome over finished saves.
    pub fn avg_latency_ticks(&self) -> f64 {
        let finished = self.succeeded + self.failed;
        if finished == 0 {
            return 0.0;
        }
        self.total_latency_ticks as f64 / finished as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecognizerStats {
    pub arm_requests: u64,
    pub listening: u64,
    pub start_failures: u64,
}

impl TelemetrySnapshot {
    /// Folds one event into the running totals.
    pub fn apply(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::PhaseTransition { .. } => self.phase_transitions += 1,
            TelemetryEvent::SegmentLifecycle { status, .. } => match status {
                SegmentStatus::Recording => self.segment_stats.started += 1,
                SegmentStatus::Complete => self.segment_stats.completed += 1,
                SegmentStatus::Failed => self.segment_stats.failed += 1,
            },
            TelemetryEvent::SegmentsEvicted { count } => self.segment_stats.evicted += *count as u64,
            TelemetryEvent::RotationSkipped { .. } => self.segment_stats.rotations_skipped += 1,
            TelemetryEvent::IntentClassified { kind } => match kind {
                IntentKind::Wake => self.command_stats.wakes += 1,
                IntentKind::Save => self.command_stats.saves += 1,
                IntentKind::Cancel => self.command_stats.cancels += 1,
                IntentKind::Unrecognized => self.command_stats.unrecognized += 1,
            },
            TelemetryEvent::Save { outcome, latency_ticks } => match outcome {
                SaveOutcome::Requested => self.save_stats.requested += 1,
                SaveOutcome::NothingToSave => self.save_stats.nothing_to_save += 1,
                SaveOutcome::Succeeded => {
                    self.save_stats.succeeded += 1;
                    self.save_stats.total_latency_ticks += latency_ticks;
                }
                SaveOutcome::Failed => {
                    self.save_stats.failed += 1;
                    self.save_stats.total_latency_ticks += latency_ticks;
                }
            },
            TelemetryEvent::Recognizer(kind) => match kind {
                RecognizerEvent::ArmRequested => self.recognizer_stats.arm_requests += 1,
                RecognizerEvent::Listening => self.recognizer_stats.listening += 1,
                RecognizerEvent::StartFailed => self.recognizer_stats.start_failures += 1,
            },
        }
    }
}
