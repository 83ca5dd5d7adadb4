use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CaptureError, CaptureResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentStatus {
    Recording,
    Complete,
    Failed,
}

/// Identifies one in-flight segment. The session id keeps handles from a
/// previous session (late timer or completion callbacks) from matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentHandle {
    pub session: Uuid,
    pub sequence: u64,
}

impl fmt::Display for SegmentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.session, self.sequence)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub sequence: u64,
    /// Storage locator, assigned by the recording backend on completion.
    pub path: Option<String>,
    pub status: SegmentStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
}

impl Segment {
    fn new(sequence: u64) -> Self {
        Self {
            sequence,
            path: None,
            status: SegmentStatus::Recording,
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
        }
    }
}

/// Bookkeeping for rolling segments: one in-flight unit at most, plus a
/// bounded history of finished ones.
#[derive(Debug)]
pub struct SegmentBuffer {
    session: Uuid,
    segments: Vec<Segment>,
    next_sequence: u64,
    in_flight: Option<SegmentHandle>,
    /// Highest completed sequence, for O(1) `last_completed`.
    last_completed: Option<u64>,
    retention_count: usize,
    /// Outstanding saves per sequence. A pinned segment is never evicted.
    pinned: HashMap<u64, usize>,
}

impl SegmentBuffer {
    pub fn new(session: Uuid, retention_count: usize) -> Self {
        Self {
            session,
            segments: Vec::new(),
            next_sequence: 1,
            in_flight: None,
            last_completed: None,
            retention_count: retention_count.max(1),
            pinned: HashMap::new(),
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn start_new_segment(&mut self) -> CaptureResult<SegmentHandle> {
        if self.in_flight.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        let handle = SegmentHandle { session: self.session, sequence: self.next_sequence };
        self.next_sequence += 1;
        self.segments.push(Segment::new(handle.sequence));
        self.in_flight = Some(handle);
        debug!(sequence = handle.sequence, "segment started");
        Ok(handle)
    }

    /// Completes the in-flight segment. Any other handle is stale.
    pub fn complete_segment(&mut self, handle: SegmentHandle, path: String) -> CaptureResult<()> {
        if self.in_flight != Some(handle) {
            return Err(CaptureError::UnknownHandle(handle));
        }
        let segment = self
            .find_mut(handle.sequence)
            .ok_or(CaptureError::UnknownHandle(handle))?;
        segment.status = SegmentStatus::Complete;
        segment.path = Some(path);
        segment.finished_at = Some(Utc::now());
        self.in_flight = None;

        if self.last_completed.map_or(true, |seq| handle.sequence > seq) {
            self.last_completed = Some(handle.sequence);
        }
        Ok(())
    }

    /// Records a failure. Never raises; returns whether a transition happened.
    pub fn fail_segment(&mut self, handle: SegmentHandle, reason: &str) -> bool {
        if handle.session != self.session {
            warn!(%handle, "fail for foreign session ignored");
            return false;
        }
        let Some(segment) = self.find_mut(handle.sequence) else {
            warn!(%handle, "fail for unknown segment ignored");
            return false;
        };
        if segment.status != SegmentStatus::Recording {
            debug!(%handle, status = ?segment.status, "segment already terminal");
            return false;
        }
        segment.status = SegmentStatus::Failed;
        segment.failure = Some(reason.to_string());
        segment.finished_at = Some(Utc::now());
        if self.in_flight == Some(handle) {
            self.in_flight = None;
        }
        true
    }

    pub fn last_completed(&self) -> Option<&Segment> {
        let seq = self.last_completed?;
        self.find(seq)
    }

    pub fn in_flight(&self) -> Option<SegmentHandle> {
        self.in_flight
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, sequence: u64) -> Option<&Segment> {
        self.find(sequence)
    }

    pub fn recording_count(&self) -> usize {
        self.segments.iter().filter(|s| s.status == SegmentStatus::Recording).count()
    }

    pub fn completed_count(&self) -> usize {
        self.segments.iter().filter(|s| s.status == SegmentStatus::Complete).count()
    }

    /// Each `pin` needs a matching `unpin` before the segment can be evicted.
    pub fn pin(&mut self, sequence: u64) {
        *self.pinned.entry(sequence).or_insert(0) += 1;
    }

    pub fn unpin(&mut self, sequence: u64) {
        if let Some(count) = self.pinned.get_mut(&sequence) {
            *count -= 1;
            if *count == 0 {
                self.pinned.remove(&sequence);
            }
        }
    }

    pub fn is_pinned(&self, sequence: u64) -> bool {
        self.pinned.contains_key(&sequence)
    }

    /// Drops history beyond the retention window. Keeps the newest
    /// `retention_count` completed segments, anything recording and anything
    /// pinned. Returns evicted segments so their media can be discarded.
    pub fn enforce_retention(&mut self) -> Vec<Segment> {
        let mut keep_completed: HashSet<u64> = HashSet::new();
        for segment in self.segments.iter().rev() {
            if keep_completed.len() >= self.retention_count {
                break;
            }
            if segment.status == SegmentStatus::Complete {
                keep_completed.insert(segment.sequence);
            }
        }
        let oldest_kept = keep_completed.iter().min().copied();
        let window_start = self.next_sequence.saturating_sub(self.retention_count as u64);

        let mut evicted = Vec::new();
        let mut kept = Vec::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            let retain = match segment.status {
                SegmentStatus::Recording => true,
                SegmentStatus::Complete => keep_completed.contains(&segment.sequence),
                // Failed units carry no media; keep them only while newer than the window.
                SegmentStatus::Failed => match oldest_kept {
                    Some(oldest) => segment.sequence > oldest,
                    None => segment.sequence >= window_start,
                },
            };
            if retain || self.pinned.contains_key(&segment.sequence) {
                kept.push(segment);
            } else {
                evicted.push(segment);
            }
        }
        self.segments = kept;
        evicted
    }

    fn find(&self, sequence: u64) -> Option<&Segment> {
        // Segments are appended in sequence order.
        self.segments
            .binary_search_by_key(&sequence, |s| s.sequence)
            .ok()
            .map(|idx| &self.segments[idx])
    }

    fn find_mut(&mut self, sequence: u64) -> Option<&mut Segment> {
        self.segments
            .binary_search_by_key(&sequence, |s| s.sequence)
            .ok()
            .map(move |idx| &mut self.segments[idx])
    }
}
