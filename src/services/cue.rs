use async_trait::async_trait;
use tracing::info;

use crate::error::CaptureResult;
use crate::kernel::scheduler::CueId;

use super::CueBackend;

/// Reports cues in the log instead of playing a tone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCue;

#[async_trait]
impl CueBackend for LogCue {
    async fn play(&self, cue: CueId) -> CaptureResult<()> {
        let tone = match cue {
            CueId::Acknowledge => "listening",
            CueId::Confirm => "saved",
            CueId::Dismiss => "dismissed",
            CueId::SaveFailed => "save failed",
        };
        info!(?cue, "cue: {}", tone);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoCue;

#[async_trait]
impl CueBackend for NoCue {
    async fn play(&self, _cue: CueId) -> CaptureResult<()> {
        Ok(())
    }
}
