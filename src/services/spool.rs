use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::kernel::event::Event;
use crate::kernel::segment::SegmentHandle;

use super::{EventSink, RecordingBackend};

/// Writes every segment as a file under a spool directory.
///
/// Stands in for a camera: the file holds a small placeholder header rather
/// than encoded video, but paths, completion callbacks and discards behave
/// like the real thing.
pub struct SpoolRecorder {
    dir: PathBuf,
    sink: EventSink,
    // Held only for map edits, never across an await.
    active: Mutex<HashMap<SegmentHandle, PathBuf>>,
}

impl SpoolRecorder {
    pub fn new(dir: impl Into<PathBuf>, sink: EventSink) -> Self {
        Self {
            dir: dir.into(),
            sink,
            active: Mutex::new(HashMap::new()),
        }
    }

    fn segment_path(&self, handle: SegmentHandle) -> PathBuf {
        self.dir.join(format!("segment-{}-{:06}.mp4", handle.session.simple(), handle.sequence))
    }

    fn take_active(&self, handle: SegmentHandle) -> Option<PathBuf> {
        self.active.lock().ok().and_then(|mut active| active.remove(&handle))
    }
}

#[async_trait]
impl RecordingBackend for SpoolRecorder {
    async fn prepare(&self) -> CaptureResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {}", self.dir.display(), e)))?;
        info!(dir = %self.dir.display(), "spool recorder ready");
        Ok(())
    }

    async fn begin_segment(&self, handle: SegmentHandle) -> CaptureResult<()> {
        let path = self.segment_path(handle);
        let mut file = tokio::fs::File::create(&path).await?;
        let header = format!("dashvox segment {} started {}\n", handle.sequence, chrono::Utc::now().to_rfc3339());
        file.write_all(header.as_bytes()).await?;

        let mut active = self
            .active
            .lock()
            .map_err(|_| CaptureError::Recording("spool index poisoned".into()))?;
        active.insert(handle, path);
        debug!(%handle, "spool segment opened");
        Ok(())
    }

    async fn end_segment(&self, handle: SegmentHandle) -> CaptureResult<()> {
        let path = self
            .take_active(handle)
            .ok_or_else(|| CaptureError::Recording(format!("segment {} is not recording", handle)))?;

        let sink = self.sink.clone();
        tokio::spawn(async move {
            let event = match finalize(&path, handle).await {
                Ok(()) => Event::SegmentFinished { handle, path: path.display().to_string() },
                Err(e) => Event::SegmentFailed { handle, reason: e.to_string() },
            };
            if sink.send(event).await.is_err() {
                debug!(%handle, "session gone before segment completion was delivered");
            }
        });
        Ok(())
    }

    async fn abandon_segment(&self, handle: SegmentHandle) -> CaptureResult<()> {
        if let Some(path) = self.take_active(handle) {
            debug!(%handle, path = %path.display(), "spool segment abandoned");
        }
        Ok(())
    }

    async fn discard(&self, path: &str) -> CaptureResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path, "discarded segment already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

async fn finalize(path: &Path, handle: SegmentHandle) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new().append(true).open(path).await?;
    let trailer = format!("segment {} finished {}\n", handle.sequence, chrono::Utc::now().to_rfc3339());
    file.write_all(trailer.as_bytes()).await?;
    file.flush().await
}
