//! Session telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a write-only side channel. The controller must never read it
//! back to make a decision.
//!
//! # PRIVACY INVARIANT
//! Events carry sequences, ticks and enum kinds only. Transcript text and
//! storage paths never enter the recorder.

pub mod event;
pub mod metrics;
pub mod recorder;
