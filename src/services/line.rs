use async_trait::async_trait;
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::kernel::event::{Event, TranscriptEvent};

use super::{EventSink, RecognitionBackend};

/// Treats each line of a text stream as one recognizer result.
///
/// The reader task is spawned on the first `start` and survives re-arms;
/// `stop` cancels it. End of input ends the session. Readiness is reported
/// by the caller from the result of `start`.
pub struct LineRecognizer<R> {
    sink: EventSink,
    reader: Mutex<Option<R>>,
    running: Mutex<Option<CancellationToken>>,
}

impl<R> LineRecognizer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, sink: EventSink) -> Self {
        Self {
            sink,
            reader: Mutex::new(Some(reader)),
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<R> RecognitionBackend for LineRecognizer<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn prepare(&self) -> CaptureResult<()> {
        let has_reader = self.reader.lock().map(|r| r.is_some()).unwrap_or(false);
        if has_reader {
            Ok(())
        } else {
            Err(CaptureError::DeviceUnavailable("transcript stream already consumed".into()))
        }
    }

    async fn start(&self, locale: &str) -> CaptureResult<()> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| CaptureError::RecognizerRestartFailure("state poisoned".into()))?;
        if running.as_ref().is_some_and(|token| !token.is_cancelled()) {
            debug!("line recognizer re-armed");
            return Ok(());
        }

        let reader = self
            .reader
            .lock()
            .ok()
            .and_then(|mut r| r.take())
            .ok_or_else(|| CaptureError::RecognizerRestartFailure("transcript stream closed".into()))?;

        let token = CancellationToken::new();
        *running = Some(token.clone());
        info!(locale, "line recognizer listening");

        let sink = self.sink.clone();
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("line recognizer stopped");
                        break;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(text)) => {
                            if sink.send(Event::Transcript(TranscriptEvent::from_text(&text))).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            info!("transcript stream ended");
                            token.cancel();
                            let _ = sink.send(Event::Shutdown).await;
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "transcript stream error");
                            token.cancel();
                            let _ = sink.send(Event::RecognizerFailed(e.to_string())).await;
                            break;
                        }
                    }
                }
            }
            // Later re-arms must see the stream as gone.
            token.cancel();
        });
        Ok(())
    }

    async fn stop(&self) -> CaptureResult<()> {
        if let Ok(mut running) = self.running.lock() {
            if let Some(token) = running.take() {
                token.cancel();
            }
        }
        Ok(())
    }
}
