//! focus_replay - run a recorded detector trace through the alert pipeline
//!
//! Frames are replayed on a simulated 30 fps clock, so a trace always produces the
//! same alerts. Each fired alert is printed to stdout as one JSON object.

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use focus_sentinel::{
    AlertKind, AlertPresenter, CameraSettings, FocusSession, MemorySpeech, NullDisplay,
    ReplayDetector, RetriggerPolicy, SyntheticCamera, Thresholds,
};

const REPLAY_FPS: u32 = 30;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines detector trace (one result or `null` per frame).
    trace: PathBuf,
    /// Eye-aspect-ratio threshold (0.15..=0.35).
    #[arg(long, default_value_t = focus_sentinel::tracker::DEFAULT_EAR_THRESHOLD)]
    ear_threshold: f64,
    /// Retrigger policy while an alert is active (ignore, extend).
    #[arg(long, default_value = "ignore")]
    retrigger: RetriggerPolicy,
}

#[derive(Serialize)]
struct FiredAlert {
    frame: u64,
    at_ms: u64,
    kind: AlertKind,
    message: &'static str,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let (lo, hi) = focus_sentinel::tracker::EAR_THRESHOLD_RANGE;
    if !(lo..=hi).contains(&args.ear_threshold) {
        return Err(anyhow!("ear threshold must be within {}..={}", lo, hi));
    }

    let detector = ReplayDetector::open(&args.trace)?;
    let frames = detector.len() as u64;
    let camera = SyntheticCamera::new(CameraSettings {
        uri: "stub://replay".to_string(),
        target_fps: REPLAY_FPS,
        width: 4,
        height: 4,
    });
    let speech = MemorySpeech::new();
    let presenter = AlertPresenter::new(Box::new(speech.clone()), Box::new(NullDisplay))
        .with_policy(args.retrigger);
    let thresholds = Thresholds {
        ear: args.ear_threshold,
        ..Thresholds::default()
    };
    let mut session = FocusSession::new(
        Box::new(camera),
        Box::new(detector),
        presenter,
        thresholds,
    );
    session.start()?;

    let frame_interval = Duration::from_secs(1) / REPLAY_FPS;
    let t0 = Instant::now();
    for frame in 0..frames {
        let offset = frame_interval * frame as u32;
        let outcome = session.tick(t0 + offset);
        for kind in outcome.fired {
            let record = FiredAlert {
                frame,
                at_ms: offset.as_millis() as u64,
                kind,
                message: kind.message(),
            };
            println!("{}", serde_json::to_string(&record)?);
        }
    }
    session.stop();

    let stats = session.stats();
    log::info!(
        "replayed {} frames: processed={} skipped={} alerts={} spoken={}",
        frames,
        stats.frames_processed,
        stats.frames_skipped,
        stats.alerts_fired,
        speech.spoken().len()
    );
    Ok(())
}
