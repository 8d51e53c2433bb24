use std::time::{Duration, Instant};

use focus_sentinel::{
    AlertKind, AlertPresenter, CameraSettings, FaceScene, FocusSession, FrameLoop, FrameOutcome,
    MemorySpeech, NullDisplay, Script, ScriptedDetector, SessionState, SyntheticCamera,
    Thresholds,
};

const FRAME: Duration = Duration::from_millis(33);

fn camera(uri: &str) -> SyntheticCamera {
    SyntheticCamera::new(CameraSettings {
        uri: uri.to_string(),
        target_fps: 30,
        width: 16,
        height: 12,
    })
}

fn session_with(uri: &str, script: Script, speech: &MemorySpeech) -> FocusSession {
    let presenter = AlertPresenter::new(Box::new(speech.clone()), Box::new(NullDisplay));
    FocusSession::new(
        Box::new(camera(uri)),
        Box::new(ScriptedDetector::new(script)),
        presenter,
        Thresholds::default(),
    )
}

/// Tick `frames` times on a 33 ms clock and collect `(frame index, kind)` for every fired alert.
fn run_frames(session: &mut FocusSession, frames: u32) -> Vec<(u32, AlertKind)> {
    let t0 = Instant::now();
    let mut fired = Vec::new();
    for i in 0..frames {
        let outcome = session.tick(t0 + FRAME * i);
        fired.extend(outcome.fired.into_iter().map(|kind| (i, kind)));
    }
    fired
}

#[test]
fn closed_eyes_fire_drowsy_once_at_frame_48() {
    let speech = MemorySpeech::new();
    let closed = FaceScene::attentive().with_ear(0.10);
    let mut session = session_with("stub://desk", Script::new().face(closed, 50), &speech);
    session.start().expect("start");

    let fired = run_frames(&mut session, 50);

    assert_eq!(fired, vec![(47, AlertKind::Drowsy)]);
    assert_eq!(session.tracker().counters().drowsy, 50);
    let spoken = speech.spoken();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "졸음이 감지되었습니다.");
    assert_eq!(spoken[0].rate, 1.2);
}

#[test]
fn drowsy_refires_after_its_window_closes() {
    let speech = MemorySpeech::new();
    let closed = FaceScene::attentive().with_ear(0.10);
    let mut session = session_with("stub://desk", Script::new().face(closed, 120), &speech);
    session.start().expect("start");

    // Fired at 47 * 33 ms; the window closes 2000 ms later, first seen on frame 108.
    let fired = run_frames(&mut session, 120);

    assert_eq!(fired, vec![(47, AlertKind::Drowsy), (108, AlertKind::Drowsy)]);
    assert_eq!(session.stats().alerts_fired, 2);
}

#[test]
fn absence_fires_at_frame_90_and_face_resets_counter() {
    let speech = MemorySpeech::new();
    let script = Script::new().no_face(95).face(FaceScene::attentive(), 1);
    let mut session = session_with("stub://desk", script, &speech);
    session.start().expect("start");

    let fired = run_frames(&mut session, 96);

    assert_eq!(fired, vec![(89, AlertKind::Absence)]);
    assert_eq!(session.tracker().counters().absence, 0);
    assert_eq!(session.stats().frames_without_face, 95);
    assert_eq!(speech.spoken()[0].text, "자리를 비우셨나요?");
}

#[test]
fn looking_away_fires_attention_after_60_frames() {
    let speech = MemorySpeech::new();
    let away = FaceScene::attentive().with_pose(30.0, 0.0);
    let mut session = session_with("stub://desk", Script::new().face(away, 70), &speech);
    session.start().expect("start");

    let fired = run_frames(&mut session, 70);

    assert_eq!(fired, vec![(60, AlertKind::Attention)]);
    assert_eq!(session.tracker().counters().drowsy, 0);
}

#[test]
fn nodding_counts_toward_drowsy() {
    let speech = MemorySpeech::new();
    let nodding = FaceScene::attentive().with_pose(0.0, 25.0);
    let mut session = session_with("stub://desk", Script::new().face(nodding, 48), &speech);
    session.start().expect("start");

    let fired = run_frames(&mut session, 48);

    assert_eq!(fired, vec![(47, AlertKind::Drowsy)]);
    assert_eq!(session.tracker().counters().head_nod, 48);
}

#[test]
fn attentive_user_keeps_counters_at_zero() {
    let speech = MemorySpeech::new();
    let mut session = session_with(
        "stub://desk",
        Script::new().face(FaceScene::attentive(), 200),
        &speech,
    );
    session.start().expect("start");

    assert!(run_frames(&mut session, 200).is_empty());
    let counters = session.tracker().counters();
    assert_eq!(counters.drowsy, 0);
    assert_eq!(counters.head_nod, 0);
    assert_eq!(counters.attention_lapse, 0);
    assert_eq!(counters.absence, 0);
    assert!(speech.spoken().is_empty());
}

#[test]
fn missing_pose_leaves_pose_counters_untouched() {
    let speech = MemorySpeech::new();
    let away = FaceScene::attentive().with_pose(30.0, 0.0);
    let script = Script::new().face(away, 10).face(away.without_pose(), 5);
    let mut session = session_with("stub://desk", script, &speech);
    session.start().expect("start");

    run_frames(&mut session, 15);

    assert_eq!(session.tracker().counters().attention_lapse, 10);
}

#[test]
fn stop_releases_camera_and_disarms_alerts() {
    let speech = MemorySpeech::new();
    let closed = FaceScene::attentive().with_ear(0.10);
    let mut session = session_with("stub://desk", Script::new().face(closed, 50), &speech);
    session.start().expect("start");
    assert_eq!(session.camera().active_tracks(), 1);

    run_frames(&mut session, 50);
    assert_eq!(session.presenter().pending_timers(), 1);

    session.stop();

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.camera().active_tracks(), 0);
    assert_eq!(session.presenter().pending_timers(), 0);
    assert_eq!(speech.cancel_count(), 1);
    assert_eq!(session.tick(Instant::now()).frame, FrameOutcome::Inactive);

    session.stop();
    assert_eq!(speech.cancel_count(), 1);
}

#[test]
fn denied_camera_fails_start_and_never_ticks() {
    let speech = MemorySpeech::new();
    let mut session = session_with(
        focus_sentinel::ingest::synthetic::DENIED_URI,
        Script::new().face(FaceScene::attentive(), 5),
        &speech,
    );

    let err = session.start().unwrap_err();
    assert!(format!("{:#}", err).contains("camera unavailable"));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.camera().active_tracks(), 0);

    let mut ticks = 0;
    let result = FrameLoop::new(240).run(&mut session, |_| ticks += 1);
    assert!(result.is_err());
    assert_eq!(ticks, 0);
}

#[test]
fn frame_loop_runs_until_tick_budget_and_stops_session() {
    let speech = MemorySpeech::new();
    let mut session = session_with(
        "stub://desk",
        Script::new().face(FaceScene::attentive(), 10),
        &speech,
    );

    let mut faces = 0;
    let summary = FrameLoop::new(240)
        .with_max_ticks(5)
        .run(&mut session, |outcome| {
            if outcome.frame == FrameOutcome::Face {
                faces += 1;
            }
        })
        .expect("run");

    assert_eq!(summary.ticks, 5);
    assert_eq!(faces, 5);
    assert_eq!(summary.stats.frames_processed, 5);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.camera().active_tracks(), 0);
}

#[test]
fn stop_handle_ends_loop_from_callback() {
    let speech = MemorySpeech::new();
    let mut session = session_with(
        "stub://desk",
        Script::new().no_face(100),
        &speech,
    );
    let frame_loop = FrameLoop::new(240);
    let stop = frame_loop.stop_handle();

    let mut seen = 0;
    let summary = frame_loop
        .run(&mut session, |_| {
            seen += 1;
            if seen == 3 {
                stop.stop();
            }
        })
        .expect("run");

    assert_eq!(summary.ticks, 3);
    assert_eq!(session.state(), SessionState::Stopped);
}
