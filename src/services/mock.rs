//! In-memory backends that record every call. Used by the test suite and
//! handy for driving a session without devices.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{CaptureError, CaptureResult};
use crate::kernel::event::Event;
use crate::kernel::scheduler::CueId;
use crate::kernel::segment::SegmentHandle;

use super::{CueBackend, EventSink, PersistenceBackend, RecognitionBackend, RecordingBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderCall {
    Begin(SegmentHandle),
    End(SegmentHandle),
    Abandon(SegmentHandle),
    Discard(String),
}

/// Completes every ended segment as `mock://segment/<seq>` when built with a sink.
#[derive(Default)]
pub struct MockRecorder {
    sink: Option<EventSink>,
    pub unavailable: AtomicBool,
    pub fail_begin: AtomicBool,
    pub fail_abandon: AtomicBool,
    calls: Mutex<Vec<RecorderCall>>,
}

impl MockRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_complete(sink: EventSink) -> Self {
        Self { sink: Some(sink), ..Self::default() }
    }

    pub fn calls(&self) -> Vec<RecorderCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn log(&self, call: RecorderCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl RecordingBackend for MockRecorder {
    async fn prepare(&self) -> CaptureResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable("mock camera offline".into()));
        }
        Ok(())
    }

    async fn begin_segment(&self, handle: SegmentHandle) -> CaptureResult<()> {
        self.log(RecorderCall::Begin(handle));
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(CaptureError::Recording("mock begin failure".into()));
        }
        Ok(())
    }

    async fn end_segment(&self, handle: SegmentHandle) -> CaptureResult<()> {
        self.log(RecorderCall::End(handle));
        if let Some(sink) = self.sink.clone() {
            tokio::spawn(async move {
                let path = format!("mock://segment/{}", handle.sequence);
                let _ = sink.send(Event::SegmentFinished { handle, path }).await;
            });
        }
        Ok(())
    }

    async fn abandon_segment(&self, handle: SegmentHandle) -> CaptureResult<()> {
        self.log(RecorderCall::Abandon(handle));
        if self.fail_abandon.load(Ordering::SeqCst) {
            return Err(CaptureError::Recording("mock encoder wedged".into()));
        }
        Ok(())
    }

    async fn discard(&self, path: &str) -> CaptureResult<()> {
        self.log(RecorderCall::Discard(path.to_string()));
        Ok(())
    }
}

/// Fails the first `fail_starts` calls to `start`, then succeeds.
#[derive(Default)]
pub struct MockRecognizer {
    pub unavailable: AtomicBool,
    pub fail_starts: AtomicUsize,
    pub fail_stop: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: usize) -> Self {
        let mock = Self::default();
        mock.fail_starts.store(times, Ordering::SeqCst);
        mock
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionBackend for MockRecognizer {
    async fn prepare(&self) -> CaptureResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable("mock microphone offline".into()));
        }
        Ok(())
    }

    async fn start(&self, _locale: &str) -> CaptureResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_starts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_starts.store(remaining - 1, Ordering::SeqCst);
            return Err(CaptureError::RecognizerRestartFailure("mock recognizer busy".into()));
        }
        Ok(())
    }

    async fn stop(&self) -> CaptureResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(CaptureError::Recording("mock recognizer did not release".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPersistence {
    pub fail: AtomicBool,
    saves: Mutex<Vec<(String, String)>>,
}

impl MockPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: AtomicBool::new(true), ..Self::default() }
    }

    /// `(path, collection)` pairs in call order.
    pub fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PersistenceBackend for MockPersistence {
    async fn save(&self, path: &str, collection: &str) -> CaptureResult<String> {
        if let Ok(mut saves) = self.saves.lock() {
            saves.push((path.to_string(), collection.to_string()));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CaptureError::PersistenceFailure("mock library full".into()));
        }
        Ok(format!("library://{}/{}", collection, path))
    }
}

#[derive(Default)]
pub struct MockCues {
    pub fail: AtomicBool,
    played: Mutex<Vec<CueId>>,
}

impl MockCues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<CueId> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CueBackend for MockCues {
    async fn play(&self, cue: CueId) -> CaptureResult<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(cue);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CaptureError::Io(std::io::Error::new(std::io::ErrorKind::Other, "no speaker")));
        }
        Ok(())
    }
}
