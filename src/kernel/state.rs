use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Device;
use super::intent::ListeningMode;
use super::segment::{SegmentBuffer, SegmentHandle};
use super::time::Tick;

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerPhase {
    /// Waiting for camera and recognizer.
    Idle,
    ActiveWakeWait,
    ActiveCommandWait,
    /// Torn down. Nothing is processed after this.
    Stopped,
}

impl Default for ControllerPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl ControllerPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ActiveWakeWait | Self::ActiveCommandWait)
    }
}

/// Scalar state changes. Segment bookkeeping goes through `SegmentBuffer`.
#[derive(Debug, Clone)]
pub enum StateDelta {
    DeviceReady(Device),
    PhaseChanged(ControllerPhase),
    /// Recognizer re-arm requested (false) or acknowledged (true).
    RecognizerListening(bool),
    StopRequested(SegmentHandle),
    StopCleared,
    RotationScheduled(SegmentHandle),
    RotationCleared,
    Tick(Tick),
}

#[derive(Debug)]
pub struct CaptureState {
    pub phase: ControllerPhase,
    pub buffer: SegmentBuffer,
    pub camera_ready: bool,
    pub recognizer_ready: bool,
    pub recognizer_listening: bool,
    /// In-flight segment whose end was requested but not yet reported.
    pub stop_requested: Option<SegmentHandle>,
    /// Segment the pending rotation timer belongs to.
    pub rotation_pending: Option<SegmentHandle>,
    pub last_tick: Tick,
}

impl CaptureState {
    pub fn new(session: Uuid, retention_count: usize) -> Self {
        Self {
            phase: ControllerPhase::Idle,
            buffer: SegmentBuffer::new(session, retention_count),
            camera_ready: false,
            recognizer_ready: false,
            recognizer_listening: false,
            stop_requested: None,
            rotation_pending: None,
            last_tick: Tick::new(),
        }
    }

    /// `CommandWait` iff a wake phrase was accepted and not yet resolved.
    pub fn mode(&self) -> ListeningMode {
        match self.phase {
            ControllerPhase::ActiveCommandWait => ListeningMode::CommandWait,
            _ => ListeningMode::WakeWait,
        }
    }

    pub fn devices_ready(&self) -> bool {
        self.camera_ready && self.recognizer_ready
    }

    pub fn reduce(&mut self, delta: StateDelta) {
        match delta {
            StateDelta::DeviceReady(Device::Camera) => self.camera_ready = true,
            StateDelta::DeviceReady(Device::Recognizer) => self.recognizer_ready = true,
            StateDelta::PhaseChanged(phase) => self.phase = phase,
            StateDelta::RecognizerListening(listening) => self.recognizer_listening = listening,
            StateDelta::StopRequested(handle) => self.stop_requested = Some(handle),
            StateDelta::StopCleared => self.stop_requested = None,
            StateDelta::RotationScheduled(handle) => self.rotation_pending = Some(handle),
            StateDelta::RotationCleared => self.rotation_pending = None,
            StateDelta::Tick(t) => self.last_tick = t,
        }
    }
}
