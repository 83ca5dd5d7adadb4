use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::TelemetrySnapshot;

/// Most recent events kept for inspection. Totals are unaffected by this cap.
const RECENT_EVENTS: usize = 1_024;

/// Session-long counters plus a short window of the latest raw events.
#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    totals: TelemetrySnapshot,
    recent: VecDeque<TelemetryEvent>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        self.totals.apply(&event);
        if self.recent.len() == RECENT_EVENTS {
            self.recent.pop_front();
        }
        self.recent.push_back(event);
    }

    /// Oldest first, at most `RECENT_EVENTS` of them.
    pub fn recent(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.recent.iter()
    }

    /// Totals since the session started.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.totals.clone()
    }
}
