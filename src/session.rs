//! Focus session: one camera, one detector, one tracker, one presenter.
//!
//! A session owns every piece of mutable monitoring state, so nothing leaks from
//! one session to the next. `tick` processes at most one frame and never fails:
//! camera, detector and extraction errors only skip the frame.
//!
//! Lifecycle: `Idle -> Running <-> Paused -> Stopped`. `stop` (also run on drop)
//! releases the camera, cancels speech and disarms every alert deadline.

use anyhow::{anyhow, Context, Result};
use std::time::Instant;

use crate::alert::{AlertDisplay, AlertKind, AlertPresenter, Raise};
use crate::config::FocusConfig;
use crate::detect::{self, LandmarkDetector};
use crate::ingest::{self, CameraSource};
use crate::signal::{self, Signals};
use crate::speech::{CommandSpeech, LogSpeech, SpeechSink};
use crate::tracker::{StateTracker, Thresholds};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// How the tick's frame was handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Session not running.
    #[default]
    Inactive,
    /// No new frame from the camera.
    NoFrame,
    /// Frame dropped (repeated sequence, camera/detector error, malformed output).
    Skipped,
    Face,
    NoFace,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutcome {
    pub frame: FrameOutcome,
    pub signals: Option<Signals>,
    /// Alerts that became active this tick.
    pub fired: Vec<AlertKind>,
    /// Alerts whose window closed this tick.
    pub cleared: Vec<AlertKind>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_without_face: u64,
    pub detector_errors: u64,
    pub alerts_fired: u64,
}

pub struct FocusSession {
    camera: Box<dyn CameraSource>,
    detector: Box<dyn LandmarkDetector>,
    tracker: StateTracker,
    presenter: AlertPresenter,
    state: SessionState,
    last_sequence: Option<u64>,
    stats: SessionStats,
}

impl FocusSession {
    pub fn new(
        camera: Box<dyn CameraSource>,
        detector: Box<dyn LandmarkDetector>,
        presenter: AlertPresenter,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            camera,
            detector,
            tracker: StateTracker::new(thresholds),
            presenter,
            state: SessionState::Idle,
            last_sequence: None,
            stats: SessionStats::default(),
        }
    }

    /// Build camera, detector, speech and presenter from configuration.
    pub fn from_config(cfg: &FocusConfig, display: Box<dyn AlertDisplay>) -> Result<Self> {
        let camera = ingest::open_camera(&cfg.camera)?;
        let detector = detect::open_backend(&cfg.detector)?;
        let speech: Box<dyn SpeechSink> = match &cfg.speech_command {
            Some(program) => Box::new(CommandSpeech::new(program)),
            None => Box::new(LogSpeech),
        };
        let presenter = AlertPresenter::new(speech, display)
            .with_policy(cfg.retrigger)
            .with_visible_for(cfg.alert_visible_for);
        Ok(Self::new(camera, detector, presenter, cfg.thresholds))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn presenter(&self) -> &AlertPresenter {
        &self.presenter
    }

    pub fn camera(&self) -> &dyn CameraSource {
        self.camera.as_ref()
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Adjust drowsiness sensitivity while running. Returns the clamped value.
    pub fn set_ear_threshold(&mut self, ear: f64) -> f64 {
        let applied = self.tracker.set_ear_threshold(ear);
        log::info!("ear threshold set to {:.2}", applied);
        applied
    }

    /// Acquire the camera and warm up the detector.
    ///
    /// On failure the camera is left released and the session stays `Idle`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(anyhow!("session cannot start from {:?}", self.state));
        }
        if let Err(e) = self.camera.open() {
            self.camera.release();
            log::error!("camera unavailable: {:#}", e);
            return Err(e.context("camera unavailable"));
        }
        if let Err(e) = self.detector.warm_up() {
            self.camera.release();
            let name = self.detector.name();
            log::error!("detector {} failed to warm up: {:#}", name, e);
            return Err(e).with_context(|| format!("detector {} failed to warm up", name));
        }
        self.state = SessionState::Running;
        log::info!(
            "focus session started (camera={}, detector={})",
            self.camera.stats().uri,
            self.detector.name()
        );
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == SessionState::Running {
            self.state = SessionState::Paused;
            log::info!("focus session paused");
        }
    }

    pub fn resume(&mut self) {
        if self.state == SessionState::Paused {
            self.state = SessionState::Running;
            log::info!("focus session resumed");
        }
    }

    /// Process at most one frame at time `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.state != SessionState::Running {
            return outcome;
        }

        outcome.cleared = self.presenter.expire(now);
        let frame = self.process_frame(now, &mut outcome);
        outcome.frame = frame;
        outcome
    }

    fn process_frame(&mut self, now: Instant, outcome: &mut TickOutcome) -> FrameOutcome {
        let frame = match self.camera.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return FrameOutcome::NoFrame,
            Err(e) => {
                log::warn!("camera read failed: {:#}", e);
                self.stats.frames_skipped += 1;
                return FrameOutcome::Skipped;
            }
        };
        if self.last_sequence.is_some_and(|last| frame.sequence <= last) {
            return FrameOutcome::NoFrame;
        }
        self.last_sequence = Some(frame.sequence);

        let detection = frame.view().run_detector(self.detector.as_mut());
        drop(frame);

        let triggers = match detection {
            Err(e) => {
                log::warn!("detector {} failed: {:#}", self.detector.name(), e);
                self.stats.detector_errors += 1;
                self.stats.frames_skipped += 1;
                return FrameOutcome::Skipped;
            }
            Ok(None) => {
                self.stats.frames_without_face += 1;
                self.tracker.observe_no_face()
            }
            Ok(Some(face)) => match signal::extract(&face) {
                Ok(signals) => {
                    outcome.signals = Some(signals);
                    self.tracker.observe_face(&signals)
                }
                Err(e) => {
                    log::warn!("malformed detector output: {}", e);
                    self.stats.frames_skipped += 1;
                    return FrameOutcome::Skipped;
                }
            },
        };
        self.stats.frames_processed += 1;

        for kind in triggers.kinds() {
            if self.presenter.raise(kind, now) == Raise::Fired {
                self.stats.alerts_fired += 1;
                outcome.fired.push(kind);
            }
        }

        if outcome.signals.is_some() {
            FrameOutcome::Face
        } else {
            FrameOutcome::NoFace
        }
    }

    /// Release the camera, cancel speech and disarm every deadline. Idempotent.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.camera.release();
        self.presenter.teardown();
        self.tracker.reset();
        let was_started = self.state != SessionState::Idle;
        self.state = SessionState::Stopped;
        if was_started {
            log::info!(
                "focus session stopped: frames={} skipped={} alerts={}",
                self.stats.frames_processed,
                self.stats.frames_skipped,
                self.stats.alerts_fired
            );
        }
    }
}

impl Drop for FocusSession {
    fn drop(&mut self) {
        self.stop();
    }
}
