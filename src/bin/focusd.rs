//! focusd - webcam focus monitor
//!
//! This daemon:
//! 1. Loads configuration (FOCUS_CONFIG file, FOCUS_* env, then CLI flags)
//! 2. Opens the camera and landmark detector
//! 3. Tracks drowsiness, attention lapses and absence frame by frame
//! 4. Speaks and displays alerts, clearing each after its window
//! 5. Releases the camera and cancels speech on Ctrl-C

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use focus_sentinel::ui::Ui;
use focus_sentinel::{FocusConfig, FocusSession, FrameLoop, FrameOutcome, RetriggerPolicy};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera URI (`stub://<name>` or a device path such as /dev/video0).
    #[arg(long)]
    camera: Option<String>,
    /// Detector backend (scripted, replay, tract).
    #[arg(long)]
    detector: Option<String>,
    /// JSON-lines trace for the replay backend.
    #[arg(long)]
    trace: Option<PathBuf>,
    /// ONNX landmark model for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Eye-aspect-ratio threshold (0.15..=0.35).
    #[arg(long)]
    ear_threshold: Option<f64>,
    /// Target frames per second.
    #[arg(long)]
    fps: Option<u32>,
    /// Retrigger policy while an alert is active (ignore, extend).
    #[arg(long)]
    retrigger: Option<RetriggerPolicy>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// Output mode: auto, plain, pretty.
    #[arg(long, default_value = "auto")]
    ui: String,
}

impl Args {
    fn apply(&self, cfg: &mut FocusConfig) -> Result<()> {
        if let Some(camera) = &self.camera {
            cfg.camera.uri = camera.clone();
        }
        if let Some(detector) = &self.detector {
            cfg.detector.backend = detector.clone();
        }
        if let Some(trace) = &self.trace {
            cfg.detector.trace_path = Some(trace.clone());
        }
        if let Some(model) = &self.model {
            cfg.detector.model_path = Some(model.clone());
        }
        if let Some(ear) = self.ear_threshold {
            cfg.thresholds.ear = ear;
        }
        if let Some(fps) = self.fps {
            cfg.camera.target_fps = fps;
        }
        if let Some(policy) = self.retrigger {
            cfg.retrigger = policy;
        }
        cfg.validate()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = FocusConfig::load()?;
        args.apply(&mut cfg)?;
        cfg
    };

    let mut session = {
        let _stage = ui.stage("Open camera and detector");
        FocusSession::from_config(&cfg, Box::new(ui.alert_display()))?
    };

    let mut frame_loop = FrameLoop::new(cfg.camera.target_fps);
    if let Some(max_frames) = args.max_frames {
        frame_loop = frame_loop.with_max_ticks(max_frames);
    }
    let stop = frame_loop.stop_handle();
    ctrlc::set_handler(move || stop.stop())
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "focusd running: camera={} detector={} ear_threshold={:.2} retrigger={:?}",
        cfg.camera.uri,
        session.detector_name(),
        cfg.thresholds.ear,
        cfg.retrigger
    );

    let summary = frame_loop.run(&mut session, |outcome| {
        if outcome.frame == FrameOutcome::Face {
            if let Some(signals) = outcome.signals {
                log::trace!(
                    "ear={:.3} pose={:?}",
                    signals.avg_ear,
                    signals.pose
                );
            }
        }
    })?;

    log::info!(
        "focusd stopped after {} ticks: processed={} skipped={} no_face={} alerts={}",
        summary.ticks,
        summary.stats.frames_processed,
        summary.stats.frames_skipped,
        summary.stats.frames_without_face,
        summary.stats.alerts_fired
    );
    Ok(())
}
