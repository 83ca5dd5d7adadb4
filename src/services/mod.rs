//! Collaborator interfaces the capture core consumes, plus the backends
//! shipped with the crate.
//!
//! Backends report asynchronous outcomes (segment completion, transcripts)
//! as [`Event`]s through the [`EventSink`] they were built with. Trait
//! methods are awaited by the reactor between events, so an implementation
//! must never wait on the sink from inside a trait method; spawn instead.

pub mod cue;
pub mod line;
pub mod mock;
pub mod persist;
pub mod spool;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CaptureResult;
use crate::kernel::event::Event;
use crate::kernel::scheduler::CueId;
use crate::kernel::segment::SegmentHandle;

pub type EventSink = mpsc::Sender<Event>;

/// Camera side: records one segment at a time.
#[async_trait]
pub trait RecordingBackend: Send + Sync {
    /// Device check. Failure keeps the session idle.
    async fn prepare(&self) -> CaptureResult<()>;

    async fn begin_segment(&self, handle: SegmentHandle) -> CaptureResult<()>;

    /// Request a stop. Completion or failure arrives later as an event.
    async fn end_segment(&self, handle: SegmentHandle) -> CaptureResult<()>;

    /// Stop without reporting completion.
    async fn abandon_segment(&self, handle: SegmentHandle) -> CaptureResult<()>;

    /// Release media for a segment evicted by retention.
    async fn discard(&self, path: &str) -> CaptureResult<()>;
}

/// Speech side: delivers `Event::Transcript` until stopped.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn prepare(&self) -> CaptureResult<()>;

    /// Arm (or re-arm) listening. Must be safe to call while already listening.
    async fn start(&self, locale: &str) -> CaptureResult<()>;

    /// Stop listening and release event handlers.
    async fn stop(&self) -> CaptureResult<()>;
}

#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Store the media at `path` in `collection`. Returns the stored location.
    async fn save(&self, path: &str, collection: &str) -> CaptureResult<String>;
}

#[async_trait]
pub trait CueBackend: Send + Sync {
    /// Errors are logged and dropped by the caller.
    async fn play(&self, cue: CueId) -> CaptureResult<()>;
}
