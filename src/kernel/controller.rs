use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::error::CaptureError;

use super::event::{Device, Event, TranscriptEvent};
use super::intent::{CommandInterpreter, IntentKind, ListeningMode};
use super::router::SpeechEventRouter;
use super::scheduler::{CueId, Notice, Scheduler, SideEffect};
use super::segment::{SegmentBuffer, SegmentHandle, SegmentStatus};
use super::state::{CaptureState, ControllerPhase, StateDelta};
use super::telemetry::event::{RecognizerEvent, SaveOutcome, SkipReason, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::Tick;

/// Decision core of a capture session.
///
/// `step` consumes one event and returns the side effects to execute. It
/// never awaits and never touches a backend, so every transition can be
/// driven deterministically from tests. The reactor guarantees one event is
/// fully handled before the next is delivered.
pub struct CaptureController {
    state: CaptureState,
    router: SpeechEventRouter,
    scheduler: Scheduler,
    pub telemetry: TelemetryRecorder,
    segment_duration: Duration,
    retry_delay: Duration,
    /// Save requests in flight, keyed by request id.
    saves_in_flight: HashMap<u64, PendingSave>,
}

#[derive(Debug, Clone, Copy)]
struct PendingSave {
    sequence: u64,
    requested_at: Tick,
}

impl CaptureController {
    pub fn new(config: &CaptureConfig) -> Self {
        Self::with_session(config, Uuid::new_v4())
    }

    pub fn with_session(config: &CaptureConfig, session: Uuid) -> Self {
        Self {
            state: CaptureState::new(session, config.retention_count),
            router: SpeechEventRouter::new(CommandInterpreter::from_config(config)),
            scheduler: Scheduler::new(config.destination_collection.clone()),
            telemetry: TelemetryRecorder::new(),
            segment_duration: config.segment_duration(),
            retry_delay: config.recognizer_retry_delay(),
            saves_in_flight: HashMap::new(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn phase(&self) -> ControllerPhase {
        self.state.phase
    }

    pub fn mode(&self) -> ListeningMode {
        self.state.mode()
    }

    pub fn buffer(&self) -> &SegmentBuffer {
        &self.state.buffer
    }

    pub fn session(&self) -> Uuid {
        self.state.buffer.session()
    }

    pub fn step(&mut self, event: Event) -> Vec<SideEffect> {
        if self.state.phase == ControllerPhase::Stopped {
            debug!(?event, "session stopped, event dropped");
            return Vec::new();
        }
        let tick = self.state.last_tick.next();
        self.state.reduce(StateDelta::Tick(tick));

        let mut effects = Vec::new();
        match event {
            Event::Ready(device) => self.on_ready(device, &mut effects),
            Event::Transcript(transcript) => self.on_transcript(transcript, &mut effects),
            Event::RotationDue(handle) => self.on_rotation_due(handle, &mut effects),
            Event::SegmentFinished { handle, path } => self.on_segment_finished(handle, path, &mut effects),
            Event::SegmentFailed { handle, reason } => self.on_segment_failed(handle, reason, &mut effects),
            Event::RecognizerReady => {
                self.state.reduce(StateDelta::RecognizerListening(true));
                self.telemetry.record(TelemetryEvent::Recognizer(RecognizerEvent::Listening));
            }
            Event::RecognizerFailed(reason) => self.on_recognizer_failed(reason, &mut effects),
            Event::PersistenceFinished { request, result } => {
                self.on_persistence_finished(request, result, &mut effects)
            }
            Event::Shutdown => effects.extend(self.teardown()),
        }
        effects
    }

    /// Stops the recognizer, abandons the in-flight segment and cancels the
    /// rotation timer. All three are always emitted; the reactor executes
    /// them independently.
    pub fn teardown(&mut self) -> Vec<SideEffect> {
        if self.state.phase == ControllerPhase::Stopped {
            return Vec::new();
        }
        info!(session = %self.session(), "tearing down capture session");

        let mut effects = vec![SideEffect::StopRecognizer];
        if let Some(handle) = self.state.buffer.in_flight() {
            effects.push(SideEffect::AbandonSegment(handle));
            if self.state.buffer.fail_segment(handle, "abandoned at shutdown") {
                self.record_segment(handle.sequence, SegmentStatus::Failed);
            }
        }
        effects.push(SideEffect::CancelRotation);
        self.state.reduce(StateDelta::RotationCleared);
        self.state.reduce(StateDelta::RecognizerListening(false));

        self.transition(ControllerPhase::Stopped, &mut effects);
        effects.push(SideEffect::Notify(Notice::Stopped));
        effects
    }

    fn on_ready(&mut self, device: Device, effects: &mut Vec<SideEffect>) {
        self.state.reduce(StateDelta::DeviceReady(device));
        debug!(?device, "device ready");

        if self.state.phase != ControllerPhase::Idle || !self.state.devices_ready() {
            return;
        }
        self.transition(ControllerPhase::ActiveWakeWait, effects);
        self.start_recording(effects);
        self.arm_recognizer(None, effects);
    }

    fn on_transcript(&mut self, transcript: TranscriptEvent, effects: &mut Vec<SideEffect>) {
        if !self.state.phase.is_active() {
            debug!(phase = ?self.state.phase, "transcript before activation dropped");
            return;
        }
        // An empty result is not an utterance; only the recognizer needs re-arming.
        if transcript.words.iter().all(|w| w.trim().is_empty()) {
            self.arm_recognizer(None, effects);
            return;
        }

        let mode = self.state.mode();
        let intent = self.router.route(&transcript, mode);
        info!(?mode, kind = ?intent.kind, transcript = %intent.transcript, "utterance classified");
        self.telemetry.record(TelemetryEvent::IntentClassified { kind: intent.kind });

        let (delta, intent_effects) =
            self.scheduler.schedule(&intent, mode, self.state.buffer.last_completed());

        match delta {
            Some(StateDelta::PhaseChanged(to)) => self.transition(to, effects),
            Some(other) => self.state.reduce(other),
            None => {}
        }

        for effect in intent_effects {
            match &effect {
                SideEffect::Persist { request, sequence, .. } => {
                    info!(request, sequence, "saving last completed segment");
                    self.state.buffer.pin(*sequence);
                    self.saves_in_flight.insert(
                        *request,
                        PendingSave { sequence: *sequence, requested_at: self.state.last_tick },
                    );
                    self.telemetry.record(TelemetryEvent::Save {
                        outcome: SaveOutcome::Requested,
                        latency_ticks: 0,
                    });
                }
                SideEffect::Notify(Notice::NothingToSave) => {
                    info!("save requested but no completed segment yet, nothing to do");
                    self.telemetry.record(TelemetryEvent::Save {
                        outcome: SaveOutcome::NothingToSave,
                        latency_ticks: 0,
                    });
                }
                _ => {}
            }
            effects.push(effect);
        }

        if intent.kind == IntentKind::Unrecognized && mode == ListeningMode::CommandWait {
            debug!("unrecognized command, back to wake wait");
        }
        self.arm_recognizer(None, effects);
    }

    fn on_rotation_due(&mut self, handle: SegmentHandle, effects: &mut Vec<SideEffect>) {
        if self.state.rotation_pending != Some(handle) {
            debug!(%handle, "stale rotation timer ignored");
            self.telemetry.record(TelemetryEvent::RotationSkipped { reason: SkipReason::StaleHandle });
            return;
        }
        self.state.reduce(StateDelta::RotationCleared);

        match self.state.buffer.in_flight() {
            Some(current) if current == handle => {
                if self.state.stop_requested == Some(current) {
                    warn!(%handle, error = %CaptureError::AlreadyRecording, "previous stop still pending, rotation skipped");
                    self.telemetry.record(TelemetryEvent::RotationSkipped { reason: SkipReason::StopPending });
                } else {
                    debug!(%handle, "rotating segment");
                    self.state.reduce(StateDelta::StopRequested(current));
                    effects.push(SideEffect::EndSegment(current));
                }
                // Keep the timer running until the backend reports the stop.
                self.schedule_rotation(current, effects);
            }
            // The segment failed mid-recording; its timer still marks the boundary.
            None => self.start_recording(effects),
            Some(other) => {
                warn!(%handle, in_flight = %other, "rotation for a segment that is not in flight");
                self.telemetry.record(TelemetryEvent::RotationSkipped { reason: SkipReason::StaleHandle });
            }
        }
    }

    fn on_segment_finished(&mut self, handle: SegmentHandle, path: String, effects: &mut Vec<SideEffect>) {
        if let Err(e) = self.state.buffer.complete_segment(handle, path.clone()) {
            warn!(error = %e, "completion callback ignored");
            return;
        }
        info!(sequence = handle.sequence, %path, "segment complete");
        if self.state.stop_requested == Some(handle) {
            self.state.reduce(StateDelta::StopCleared);
        }
        self.record_segment(handle.sequence, SegmentStatus::Complete);
        effects.push(SideEffect::Notify(Notice::SegmentCompleted { sequence: handle.sequence, path }));

        // Backend may end a unit on its own; its timer is then obsolete.
        if self.state.rotation_pending == Some(handle) {
            self.state.reduce(StateDelta::RotationCleared);
            effects.push(SideEffect::CancelRotation);
        }
        self.evict(effects);
        self.start_recording(effects);
    }

    fn on_segment_failed(&mut self, handle: SegmentHandle, reason: String, effects: &mut Vec<SideEffect>) {
        if !self.state.buffer.fail_segment(handle, &reason) {
            return;
        }
        warn!(sequence = handle.sequence, %reason, "segment failed, recording continues");
        self.record_segment(handle.sequence, SegmentStatus::Failed);
        effects.push(SideEffect::Notify(Notice::SegmentFailed { sequence: handle.sequence, reason }));

        // Failed at a rotation boundary: open the next unit now. Otherwise the
        // pending rotation timer starts it.
        if self.state.stop_requested == Some(handle) {
            self.state.reduce(StateDelta::StopCleared);
            self.start_recording(effects);
        } else if self.state.rotation_pending != Some(handle) {
            self.start_recording(effects);
        }
    }

    fn on_recognizer_failed(&mut self, reason: String, effects: &mut Vec<SideEffect>) {
        if !self.state.phase.is_active() {
            return;
        }
        let err = CaptureError::RecognizerRestartFailure(reason);
        warn!(error = %err, retry_in_ms = self.retry_delay.as_millis() as u64, "recognizer did not start");
        self.telemetry.record(TelemetryEvent::Recognizer(RecognizerEvent::StartFailed));
        self.arm_recognizer(Some(self.retry_delay), effects);
    }

    fn on_persistence_finished(
        &mut self,
        request: u64,
        result: Result<String, String>,
        effects: &mut Vec<SideEffect>,
    ) {
        let Some(save) = self.saves_in_flight.remove(&request) else {
            warn!(request, "outcome for unknown save request ignored");
            return;
        };
        let sequence = save.sequence;
        self.state.buffer.unpin(sequence);
        let latency_ticks = self.state.last_tick.since(save.requested_at);

        match result {
            Ok(location) => {
                info!(sequence, %location, "segment saved");
                self.telemetry.record(TelemetryEvent::Save { outcome: SaveOutcome::Succeeded, latency_ticks });
                effects.push(SideEffect::Notify(Notice::Saved { sequence, location }));
            }
            Err(reason) => {
                let err = CaptureError::PersistenceFailure(reason.clone());
                warn!(sequence, error = %err, "save failed");
                self.telemetry.record(TelemetryEvent::Save { outcome: SaveOutcome::Failed, latency_ticks });
                effects.push(SideEffect::PlayCue(CueId::SaveFailed));
                effects.push(SideEffect::Notify(Notice::SaveFailed { sequence, reason }));
            }
        }
        self.evict(effects);
    }

    fn start_recording(&mut self, effects: &mut Vec<SideEffect>) {
        if !self.state.phase.is_active() {
            return;
        }
        match self.state.buffer.start_new_segment() {
            Ok(handle) => {
                self.record_segment(handle.sequence, SegmentStatus::Recording);
                effects.push(SideEffect::BeginSegment(handle));
                self.schedule_rotation(handle, effects);
            }
            Err(e) => {
                warn!(error = %e, "segment start skipped");
                self.telemetry.record(TelemetryEvent::RotationSkipped { reason: SkipReason::StopPending });
            }
        }
    }

    fn schedule_rotation(&mut self, handle: SegmentHandle, effects: &mut Vec<SideEffect>) {
        self.state.reduce(StateDelta::RotationScheduled(handle));
        effects.push(SideEffect::ScheduleRotation { handle, after: self.segment_duration });
    }

    fn arm_recognizer(&mut self, after: Option<Duration>, effects: &mut Vec<SideEffect>) {
        self.state.reduce(StateDelta::RecognizerListening(false));
        self.telemetry.record(TelemetryEvent::Recognizer(RecognizerEvent::ArmRequested));
        effects.push(SideEffect::ArmRecognizer { after });
    }

    fn evict(&mut self, effects: &mut Vec<SideEffect>) {
        let evicted = self.state.buffer.enforce_retention();
        if evicted.is_empty() {
            return;
        }
        debug!(count = evicted.len(), "segments evicted by retention");
        self.telemetry.record(TelemetryEvent::SegmentsEvicted { count: evicted.len() });
        for segment in evicted {
            if let Some(path) = segment.path {
                effects.push(SideEffect::DiscardMedia { sequence: segment.sequence, path });
            }
        }
    }

    fn transition(&mut self, to: ControllerPhase, effects: &mut Vec<SideEffect>) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.reduce(StateDelta::PhaseChanged(to));
        info!(?from, ?to, "phase transition");
        self.telemetry.record(TelemetryEvent::PhaseTransition { from, to, tick: self.state.last_tick });
        effects.push(SideEffect::Notify(Notice::PhaseChanged(to)));
    }

    fn record_segment(&mut self, sequence: u64, status: SegmentStatus) {
        self.telemetry.record(TelemetryEvent::SegmentLifecycle {
            sequence,
            status,
            tick: self.state.last_tick,
        });
    }
}
