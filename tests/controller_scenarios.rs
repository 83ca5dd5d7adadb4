use std::time::Duration;

use dashvox::kernel::event::{Device, Event};
use dashvox::kernel::intent::ListeningMode;
use dashvox::kernel::scheduler::{CueId, Notice, SideEffect};
use dashvox::kernel::segment::{SegmentHandle, SegmentStatus};
use dashvox::kernel::state::ControllerPhase;
use dashvox::{CaptureConfig, CaptureController};

fn active_controller(config: &CaptureConfig) -> CaptureController {
    let mut controller = CaptureController::new(config);
    controller.step(Event::Ready(Device::Camera));
    controller.step(Event::Ready(Device::Recognizer));
    controller
}

fn in_flight(controller: &CaptureController) -> SegmentHandle {
    controller.buffer().in_flight().expect("a segment should be recording")
}

/// Rotates the in-flight segment and reports it complete.
fn rotate(controller: &mut CaptureController) -> (SegmentHandle, Vec<SideEffect>) {
    let handle = in_flight(controller);
    let effects = controller.step(Event::RotationDue(handle));
    assert_eq!(
        effects,
        vec![
            SideEffect::EndSegment(handle),
            SideEffect::ScheduleRotation { handle, after: Duration::from_secs(60) },
        ]
    );
    let effects = controller.step(Event::SegmentFinished {
        handle,
        path: format!("seg-{}.mp4", handle.sequence),
    });
    (handle, effects)
}

/// Request id of the single save in `effects`.
fn save_request(effects: &[SideEffect]) -> u64 {
    let requests: Vec<u64> = effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Persist { request, .. } => Some(*request),
            _ => None,
        })
        .collect();
    assert_eq!(requests.len(), 1, "expected exactly one save in {:?}", effects);
    requests[0]
}

fn has_cue(effects: &[SideEffect], cue: CueId) -> bool {
    effects.contains(&SideEffect::PlayCue(cue))
}

fn persists(effects: &[SideEffect]) -> Vec<(u64, String)> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Persist { sequence, path, .. } => Some((*sequence, path.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_activation_waits_for_both_devices() {
    let config = CaptureConfig::default();
    let mut controller = CaptureController::new(&config);

    // Transcripts before activation are dropped
    assert!(controller.step(Event::transcript("ok garmin")).is_empty());

    assert!(controller.step(Event::Ready(Device::Camera)).is_empty());
    assert_eq!(controller.phase(), ControllerPhase::Idle);

    let effects = controller.step(Event::Ready(Device::Recognizer));
    assert_eq!(controller.phase(), ControllerPhase::ActiveWakeWait);

    let first = in_flight(&controller);
    assert_eq!(first.sequence, 1);
    assert_eq!(
        effects,
        vec![
            SideEffect::Notify(Notice::PhaseChanged(ControllerPhase::ActiveWakeWait)),
            SideEffect::BeginSegment(first),
            SideEffect::ScheduleRotation { handle: first, after: Duration::from_secs(60) },
            SideEffect::ArmRecognizer { after: None },
        ]
    );

    // A repeated readiness signal does not restart anything
    assert!(controller.step(Event::Ready(Device::Camera)).is_empty());
}

#[test]
fn test_scenario_a_wake_enters_command_wait() {
    let mut controller = active_controller(&CaptureConfig::default());

    let effects = controller.step(Event::transcript("ok garmen please record"));

    assert_eq!(controller.mode(), ListeningMode::CommandWait);
    assert_eq!(controller.phase(), ControllerPhase::ActiveCommandWait);
    assert!(has_cue(&effects, CueId::Acknowledge));
    assert!(effects.contains(&SideEffect::ArmRecognizer { after: None }), "re-arm after every utterance");
}

#[test]
fn test_scenario_b_save_persists_last_completed() {
    let mut controller = active_controller(&CaptureConfig::default());
    for _ in 0..3 {
        rotate(&mut controller);
    }
    // Keep only the third completed: sequence 3 with 4 now recording
    assert_eq!(controller.buffer().last_completed().unwrap().sequence, 3);
    assert_eq!(in_flight(&controller).sequence, 4);

    controller.step(Event::transcript("ok garmin"));
    let effects = controller.step(Event::transcript("save that video"));

    assert_eq!(persists(&effects), vec![(3, "seg-3.mp4".to_string())]);
    assert!(effects.iter().any(|e| matches!(
        e,
        SideEffect::Persist { collection, .. } if collection == "Garmin"
    )));
    assert!(has_cue(&effects, CueId::Confirm));
    assert_eq!(controller.mode(), ListeningMode::WakeWait);
    assert!(controller.buffer().is_pinned(3));
}

#[test]
fn test_scenario_c_cancel_dismisses_without_saving() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);

    controller.step(Event::transcript("ok carmen"));
    let effects = controller.step(Event::transcript("uh nevermind actually"));

    assert!(persists(&effects).is_empty());
    assert!(has_cue(&effects, CueId::Dismiss));
    assert_eq!(controller.mode(), ListeningMode::WakeWait);
}

#[test]
fn test_scenario_d_unrecognized_falls_back_silently() {
    let mut controller = active_controller(&CaptureConfig::default());

    controller.step(Event::transcript("ok garmin"));
    let effects = controller.step(Event::transcript("what's the weather"));

    assert_eq!(controller.mode(), ListeningMode::WakeWait);
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::PlayCue(_))), "no cue on fallback");
    assert!(persists(&effects).is_empty());

    // Unrecognized speech while waiting for wake changes nothing
    let effects = controller.step(Event::transcript("what's the weather"));
    assert_eq!(effects, vec![SideEffect::ArmRecognizer { after: None }]);
}

#[test]
fn test_scenario_e_rotation_increments_sequence_by_one() {
    let mut controller = active_controller(&CaptureConfig::default());
    let (finished, effects) = rotate(&mut controller);

    let next = in_flight(&controller);
    assert_eq!(next.sequence, finished.sequence + 1);
    assert!(effects.contains(&SideEffect::BeginSegment(next)));
    assert!(effects.contains(&SideEffect::ScheduleRotation { handle: next, after: Duration::from_secs(60) }));
    assert!(effects.contains(&SideEffect::Notify(Notice::SegmentCompleted {
        sequence: finished.sequence,
        path: "seg-1.mp4".into(),
    })));
}

#[test]
fn test_rotation_does_not_touch_command_exchange() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);

    controller.step(Event::transcript("ok garmin"));
    // Segment rotation completes mid-exchange
    rotate(&mut controller);
    assert_eq!(controller.mode(), ListeningMode::CommandWait);

    let effects = controller.step(Event::transcript("keep that video"));
    assert_eq!(persists(&effects), vec![(2, "seg-2.mp4".to_string())]);
}

#[test]
fn test_save_reads_completed_never_in_flight() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);
    let current = in_flight(&controller);

    // Stop requested but completion not yet delivered
    controller.step(Event::RotationDue(current));
    controller.step(Event::transcript("ok garmin"));
    let effects = controller.step(Event::transcript("save video"));

    assert_eq!(persists(&effects), vec![(1, "seg-1.mp4".to_string())]);
    assert_eq!(controller.buffer().get(current.sequence).unwrap().status, SegmentStatus::Recording);
}

#[test]
fn test_p1_at_most_one_recording() {
    let mut controller = active_controller(&CaptureConfig { retention_count: 3, ..CaptureConfig::default() });
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut stale: Vec<SegmentHandle> = Vec::new();

    for step in 0..500 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;

        let current = controller.buffer().in_flight();
        let event = match (seed % 6, current) {
            (0, Some(h)) => Event::RotationDue(h),
            (1, Some(h)) => Event::SegmentFinished { handle: h, path: format!("p1-{}.mp4", step) },
            (2, Some(h)) => Event::SegmentFailed { handle: h, reason: "encoder".into() },
            (3, _) if !stale.is_empty() => {
                let h = stale[(seed as usize / 7) % stale.len()];
                Event::SegmentFinished { handle: h, path: "stale.mp4".into() }
            }
            (4, _) if !stale.is_empty() => Event::RotationDue(stale[0]),
            (_, Some(h)) => Event::RotationDue(h),
            // Failed mid-recording: only its rotation timer restarts capture
            (_, None) => match controller.state().rotation_pending {
                Some(h) => Event::RotationDue(h),
                None => Event::transcript("noise"),
            },
        };
        if let Some(h) = current {
            stale.push(h);
        }
        controller.step(event);

        assert!(
            controller.buffer().recording_count() <= 1,
            "more than one segment recording at step {}",
            step
        );
    }
}

#[test]
fn test_p3_fail_twice_is_idempotent() {
    let mut controller = active_controller(&CaptureConfig::default());
    let handle = in_flight(&controller);

    let first = controller.step(Event::SegmentFailed { handle, reason: "disk".into() });
    assert!(first.iter().any(|e| matches!(e, SideEffect::Notify(Notice::SegmentFailed { .. }))));

    let second = controller.step(Event::SegmentFailed { handle, reason: "disk".into() });
    assert!(second.is_empty(), "second failure must not re-transition");
    assert_eq!(controller.buffer().get(handle.sequence).unwrap().status, SegmentStatus::Failed);
}

#[test]
fn test_mid_recording_failure_waits_for_rotation_timer() {
    let mut controller = active_controller(&CaptureConfig::default());
    let handle = in_flight(&controller);

    let effects = controller.step(Event::SegmentFailed { handle, reason: "encoder crashed".into() });
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::BeginSegment(_))));
    assert!(controller.buffer().in_flight().is_none());

    let effects = controller.step(Event::RotationDue(handle));
    let next = in_flight(&controller);
    assert_eq!(next.sequence, 2);
    assert!(effects.contains(&SideEffect::BeginSegment(next)));
}

#[test]
fn test_failure_at_rotation_boundary_starts_next_immediately() {
    let mut controller = active_controller(&CaptureConfig::default());
    let handle = in_flight(&controller);
    controller.step(Event::RotationDue(handle));

    let effects = controller.step(Event::SegmentFailed { handle, reason: "flush failed".into() });
    let next = in_flight(&controller);
    assert_eq!(next.sequence, 2);
    assert!(effects.contains(&SideEffect::BeginSegment(next)));
}

#[test]
fn test_p4_stale_completion_cannot_regress_last_completed() {
    let mut controller = active_controller(&CaptureConfig::default());
    let (first, _) = rotate(&mut controller);
    rotate(&mut controller);

    let effects = controller.step(Event::SegmentFinished { handle: first, path: "late.mp4".into() });
    assert!(effects.is_empty());
    let last = controller.buffer().last_completed().unwrap();
    assert_eq!(last.sequence, 2);
    assert_eq!(last.path.as_deref(), Some("seg-2.mp4"));
}

#[test]
fn test_stale_rotation_timer_is_ignored() {
    let mut controller = active_controller(&CaptureConfig::default());
    let (first, _) = rotate(&mut controller);

    assert!(controller.step(Event::RotationDue(first)).is_empty());
    assert_eq!(controller.telemetry.snapshot().segment_stats.rotations_skipped, 1);
}

#[test]
fn test_p5_save_with_nothing_recorded_is_noop() {
    let mut controller = active_controller(&CaptureConfig::default());

    controller.step(Event::transcript("ok garmin"));
    let effects = controller.step(Event::transcript("save that video"));

    assert!(persists(&effects).is_empty());
    assert!(effects.contains(&SideEffect::Notify(Notice::NothingToSave)));
    assert_eq!(controller.mode(), ListeningMode::WakeWait);
    assert_eq!(controller.telemetry.snapshot().save_stats.nothing_to_save, 1);
}

#[test]
fn test_p2_mode_tracks_last_intent() {
    let mut controller = active_controller(&CaptureConfig::default());
    let script = [
        ("ok garmin", ListeningMode::CommandWait),
        ("ok garmin", ListeningMode::WakeWait),
        ("ok karmen", ListeningMode::CommandWait),
        ("cancel", ListeningMode::WakeWait),
        ("hello", ListeningMode::WakeWait),
        ("ok garman", ListeningMode::CommandWait),
        ("video", ListeningMode::WakeWait),
    ];
    for (text, expected) in script {
        controller.step(Event::transcript(text));
        assert_eq!(controller.mode(), expected, "after {:?}", text);
    }
}

#[test]
fn test_empty_result_keeps_command_wait() {
    let mut controller = active_controller(&CaptureConfig::default());
    controller.step(Event::transcript("ok garmin"));

    let effects = controller.step(Event::transcript("   "));
    assert_eq!(effects, vec![SideEffect::ArmRecognizer { after: None }]);
    assert_eq!(controller.mode(), ListeningMode::CommandWait);
}

#[test]
fn test_recognizer_failure_rearms_after_delay() {
    let config = CaptureConfig { recognizer_retry_delay_ms: 250, ..CaptureConfig::default() };
    let mut controller = active_controller(&config);

    let effects = controller.step(Event::RecognizerFailed("busy".into()));
    assert_eq!(effects, vec![SideEffect::ArmRecognizer { after: Some(Duration::from_millis(250)) }]);
    assert!(!controller.state().recognizer_listening);

    controller.step(Event::RecognizerReady);
    assert!(controller.state().recognizer_listening);
    assert_eq!(controller.mode(), ListeningMode::WakeWait);
}

#[test]
fn test_persistence_failure_keeps_mode() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);
    controller.step(Event::transcript("ok garmin"));
    let request = save_request(&controller.step(Event::transcript("save video")));
    controller.step(Event::transcript("ok garmin"));
    assert_eq!(controller.mode(), ListeningMode::CommandWait);

    let effects = controller.step(Event::PersistenceFinished { request, result: Err("library full".into()) });

    assert!(has_cue(&effects, CueId::SaveFailed));
    assert!(effects.contains(&SideEffect::Notify(Notice::SaveFailed { sequence: 1, reason: "library full".into() })));
    assert_eq!(controller.mode(), ListeningMode::CommandWait, "save outcome never moves the mode");
    assert!(!controller.buffer().is_pinned(1));
}

#[test]
fn test_retention_discards_oldest_but_not_while_saving() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);
    controller.step(Event::transcript("ok garmin"));
    let request = save_request(&controller.step(Event::transcript("save video")));

    rotate(&mut controller);
    let (_, effects) = rotate(&mut controller);
    assert!(
        !effects.iter().any(|e| matches!(e, SideEffect::DiscardMedia { .. })),
        "segment 1 is pinned by the save"
    );

    let effects = controller.step(Event::PersistenceFinished { request, result: Ok("lib/seg-1.mp4".into()) });
    assert!(effects.contains(&SideEffect::Notify(Notice::Saved { sequence: 1, location: "lib/seg-1.mp4".into() })));
    assert!(effects.contains(&SideEffect::DiscardMedia { sequence: 1, path: "seg-1.mp4".into() }));
    assert!(controller.buffer().get(1).is_none());
    assert_eq!(controller.buffer().completed_count(), 2);

    let (_, effects) = rotate(&mut controller);
    assert!(effects.contains(&SideEffect::DiscardMedia { sequence: 2, path: "seg-2.mp4".into() }));
}

#[test]
fn test_teardown_cleans_up_everything() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);
    let current = in_flight(&controller);

    let effects = controller.step(Event::Shutdown);

    assert!(effects.contains(&SideEffect::StopRecognizer));
    assert!(effects.contains(&SideEffect::AbandonSegment(current)));
    assert!(effects.contains(&SideEffect::CancelRotation));
    assert!(effects.contains(&SideEffect::Notify(Notice::Stopped)));
    assert_eq!(controller.phase(), ControllerPhase::Stopped);
    assert_eq!(controller.buffer().recording_count(), 0);

    // No trailing rotation after shutdown
    assert!(controller.step(Event::SegmentFinished { handle: current, path: "late.mp4".into() }).is_empty());
    assert!(controller.step(Event::transcript("ok garmin")).is_empty());
    assert!(controller.teardown().is_empty());
}

#[test]
fn test_telemetry_counts_commands_without_content() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);
    controller.step(Event::transcript("ok garmin"));
    controller.step(Event::transcript("save video"));
    controller.step(Event::transcript("ok garmin"));
    controller.step(Event::transcript("disregard"));

    let snap = controller.telemetry.snapshot();
    assert_eq!(snap.command_stats.wakes, 2);
    assert_eq!(snap.command_stats.saves, 1);
    assert_eq!(snap.command_stats.cancels, 1);
    assert_eq!(snap.save_stats.requested, 1);
    assert_eq!(snap.segment_stats.completed, 1);
    assert_eq!(snap.segment_stats.started, 2);
}

#[test]
fn test_pending_stop_skips_rotation_but_keeps_timer() {
    let mut controller = active_controller(&CaptureConfig::default());
    let handle = in_flight(&controller);
    let timer = SideEffect::ScheduleRotation { handle, after: Duration::from_secs(60) };

    let effects = controller.step(Event::RotationDue(handle));
    assert_eq!(effects, vec![SideEffect::EndSegment(handle), timer.clone()]);
    assert_eq!(controller.state().rotation_pending, Some(handle));

    // Backend never reported the stop; the next cycle is skipped, not lost
    let effects = controller.step(Event::RotationDue(handle));
    assert_eq!(effects, vec![timer]);
    assert_eq!(controller.state().stop_requested, Some(handle));
    assert_eq!(controller.state().rotation_pending, Some(handle));
    assert_eq!(controller.telemetry.snapshot().segment_stats.rotations_skipped, 1);
    assert_eq!(controller.buffer().recording_count(), 1);

    let effects = controller.step(Event::SegmentFinished { handle, path: "late.mp4".into() });
    let next = in_flight(&controller);
    assert_eq!(next.sequence, 2);
    assert!(effects.contains(&SideEffect::CancelRotation));
    assert!(effects.contains(&SideEffect::ScheduleRotation { handle: next, after: Duration::from_secs(60) }));
    assert_eq!(controller.state().stop_requested, None);
}

#[test]
fn test_repeated_save_keeps_segment_until_both_finish() {
    let mut controller = active_controller(&CaptureConfig::default());
    rotate(&mut controller);

    controller.step(Event::transcript("ok garmin"));
    let first = save_request(&controller.step(Event::transcript("save video")));
    controller.step(Event::transcript("ok garmin"));
    let second = save_request(&controller.step(Event::transcript("save video")));
    assert_ne!(first, second);

    let effects = controller.step(Event::PersistenceFinished { request: first, result: Ok("lib/a.mp4".into()) });
    assert!(effects.contains(&SideEffect::Notify(Notice::Saved { sequence: 1, location: "lib/a.mp4".into() })));
    assert!(controller.buffer().is_pinned(1), "second save still reads segment 1");

    rotate(&mut controller);
    let (_, effects) = rotate(&mut controller);
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::DiscardMedia { sequence: 1, .. })));

    let effects = controller.step(Event::PersistenceFinished { request: second, result: Ok("lib/b.mp4".into()) });
    assert!(effects.contains(&SideEffect::DiscardMedia { sequence: 1, path: "seg-1.mp4".into() }));
    assert_eq!(controller.telemetry.snapshot().save_stats.succeeded, 2);

    // A repeated outcome for a finished request changes nothing
    let effects = controller.step(Event::PersistenceFinished { request: second, result: Ok("lib/b.mp4".into()) });
    assert!(effects.is_empty());
    assert_eq!(controller.telemetry.snapshot().save_stats.succeeded, 2);
}

#[test]
fn test_telemetry_totals_cover_whole_session() {
    let mut controller = active_controller(&CaptureConfig::default());
    for _ in 0..6000 {
        controller.step(Event::transcript("hello"));
    }

    let snap = controller.telemetry.snapshot();
    assert_eq!(snap.segment_stats.started, 1);
    assert_eq!(snap.phase_transitions, 1);
    assert_eq!(snap.command_stats.unrecognized, 6000);
    assert!(controller.telemetry.recent().count() < 12_000, "raw event window stays bounded");
}
