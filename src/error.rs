use thiserror::Error;

use crate::kernel::segment::SegmentHandle;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Camera or microphone not ready. The only failure surfaced to the UI layer.
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("A segment is already recording")]
    AlreadyRecording,

    #[error("Unknown segment handle: {0}")]
    UnknownHandle(SegmentHandle),

    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("Recognizer restart failed: {0}")]
    RecognizerRestartFailure(String),

    #[error("Recording backend error: {0}")]
    Recording(String),

    #[error("Capture session closed")]
    SessionClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
