use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::services::{CueBackend, EventSink, PersistenceBackend, RecognitionBackend, RecordingBackend};

use super::controller::CaptureController;
use super::event::{Device, Event};
use super::scheduler::{Notice, SideEffect};
use super::state::ControllerPhase;
use super::telemetry::metrics::TelemetrySnapshot;

const NOTICE_CAPACITY: usize = 64;

/// The collaborators a session drives.
#[derive(Clone)]
pub struct Backends {
    pub recorder: Arc<dyn RecordingBackend>,
    pub recognizer: Arc<dyn RecognitionBackend>,
    pub persistence: Arc<dyn PersistenceBackend>,
    pub cues: Arc<dyn CueBackend>,
}

/// Bounded event queue feeding a reactor. Backends get clones of the sender.
pub fn event_channel(config: &CaptureConfig) -> (EventSink, mpsc::Receiver<Event>) {
    mpsc::channel(config.event_queue_capacity)
}

/// Cloneable entry point for UI-level hooks.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: EventSink,
    notices: broadcast::Sender<Notice>,
}

impl CaptureHandle {
    pub async fn submit(&self, event: Event) -> CaptureResult<()> {
        self.tx.send(event).await.map_err(|_| CaptureError::SessionClosed)
    }

    pub async fn shutdown(&self) -> CaptureResult<()> {
        self.submit(Event::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}

/// Single owner of a capture session.
///
/// Pulls one event at a time, lets the controller decide, then executes the
/// resulting side effects. Backend outcomes that are known immediately are
/// fed back to the controller before the next queued event is taken, so no
/// two events ever interleave.
pub struct Reactor {
    receiver: mpsc::Receiver<Event>,
    tx: EventSink,
    pub controller: CaptureController,
    backends: Backends,
    notices: broadcast::Sender<Notice>,
    locale: String,
    /// Parent of every timer this session spawns.
    lifetime: CancellationToken,
    rotation: Option<CancellationToken>,
}

impl Reactor {
    pub fn new(
        receiver: mpsc::Receiver<Event>,
        tx: EventSink,
        config: &CaptureConfig,
        backends: Backends,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            receiver,
            tx,
            controller: CaptureController::new(config),
            backends,
            notices,
            locale: config.locale.clone(),
            lifetime: CancellationToken::new(),
            rotation: None,
        }
    }

    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            tx: self.tx.clone(),
            notices: self.notices.clone(),
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.controller.phase()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.controller.telemetry.snapshot()
    }

    /// Checks both devices and activates the session. `DeviceUnavailable` is
    /// the one failure surfaced to the caller; the session stays idle.
    pub async fn start(&mut self) -> CaptureResult<()> {
        self.backends.recorder.prepare().await.map_err(as_unavailable)?;
        self.dispatch(Event::Ready(Device::Camera)).await;

        self.backends.recognizer.prepare().await.map_err(as_unavailable)?;
        self.dispatch(Event::Ready(Device::Recognizer)).await;

        info!(session = %self.controller.session(), "capture session active");
        Ok(())
    }

    /// Runs until the session is torn down.
    pub async fn run(&mut self) {
        info!(session = %self.controller.session(), "capture loop started");

        while self.controller.phase() != ControllerPhase::Stopped {
            match self.receiver.recv().await {
                Some(event) => self.dispatch(event).await,
                None => break,
            }
        }
        if self.controller.phase() != ControllerPhase::Stopped {
            self.dispatch(Event::Shutdown).await;
        }
        self.lifetime.cancel();
        info!("capture loop finished");
    }

    /// Handles one event and every synchronous follow-up it causes.
    pub async fn dispatch(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let effects = self.controller.step(event);
            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, effect: SideEffect) -> Option<Event> {
        match effect {
            SideEffect::BeginSegment(handle) => {
                if let Err(e) = self.backends.recorder.begin_segment(handle).await {
                    warn!(%handle, error = %e, "segment did not start");
                    return Some(Event::SegmentFailed { handle, reason: e.to_string() });
                }
            }
            SideEffect::EndSegment(handle) => {
                if let Err(e) = self.backends.recorder.end_segment(handle).await {
                    warn!(%handle, error = %e, "segment did not stop cleanly");
                    return Some(Event::SegmentFailed { handle, reason: e.to_string() });
                }
            }
            SideEffect::AbandonSegment(handle) => {
                if let Err(e) = self.backends.recorder.abandon_segment(handle).await {
                    warn!(%handle, error = %e, "abandon failed");
                }
            }
            SideEffect::DiscardMedia { sequence, path } => {
                if let Err(e) = self.backends.recorder.discard(&path).await {
                    warn!(sequence, error = %e, "evicted segment not discarded");
                }
            }
            SideEffect::ScheduleRotation { handle, after } => {
                self.cancel_rotation();
                let token = self.lifetime.child_token();
                self.rotation = Some(token.clone());
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(after) => {
                            let _ = tx.send(Event::RotationDue(handle)).await;
                        }
                    }
                });
            }
            SideEffect::CancelRotation => self.cancel_rotation(),
            SideEffect::ArmRecognizer { after } => {
                let recognizer = Arc::clone(&self.backends.recognizer);
                let locale = self.locale.clone();
                let token = self.lifetime.child_token();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Some(delay) = after {
                        tokio::select! {
                            _ = token.cancelled() => return,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    let outcome = match recognizer.start(&locale).await {
                        Ok(()) => Event::RecognizerReady,
                        Err(e) => Event::RecognizerFailed(e.to_string()),
                    };
                    if !token.is_cancelled() {
                        let _ = tx.send(outcome).await;
                    }
                });
            }
            SideEffect::StopRecognizer => {
                if let Err(e) = self.backends.recognizer.stop().await {
                    warn!(error = %e, "recognizer did not stop");
                }
            }
            SideEffect::Persist { request, sequence, path, collection } => {
                let persistence = Arc::clone(&self.backends.persistence);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = persistence
                        .save(&path, &collection)
                        .await
                        .map_err(|e| e.to_string());
                    if tx.send(Event::PersistenceFinished { request, result }).await.is_err() {
                        debug!(sequence, "save finished after session end");
                    }
                });
            }
            SideEffect::PlayCue(cue) => {
                let cues = Arc::clone(&self.backends.cues);
                tokio::spawn(async move {
                    if let Err(e) = cues.play(cue).await {
                        debug!(?cue, error = %e, "cue not played");
                    }
                });
            }
            SideEffect::Notify(notice) => {
                // No subscribers is fine.
                let _ = self.notices.send(notice);
            }
        }
        None
    }

    fn cancel_rotation(&mut self) {
        if let Some(token) = self.rotation.take() {
            token.cancel();
        }
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

fn as_unavailable(err: CaptureError) -> CaptureError {
    match err {
        CaptureError::DeviceUnavailable(_) => err,
        other => {
            error!(error = %other, "device check failed");
            CaptureError::DeviceUnavailable(other.to_string())
        }
    }
}
