//! Cooperative frame loop.
//!
//! Everything runs on the calling thread: the loop ticks the session at a bounded
//! rate until its `StopHandle` is triggered (from a signal handler, another thread,
//! or the tick callback) or an optional tick budget runs out. The session is
//! always torn down before `run` returns.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::session::{FocusSession, SessionStats, TickOutcome};

const HEALTH_LOG_EVERY: Duration = Duration::from_secs(5);

/// Cancellation token shared between the loop and whoever wants to stop it.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub stats: SessionStats,
}

pub struct FrameLoop {
    interval: Duration,
    max_ticks: Option<u64>,
    stop: StopHandle,
}

impl FrameLoop {
    pub fn new(target_fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / target_fps.max(1),
            max_ticks: None,
            stop: StopHandle::new(),
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Start the session, tick it until stopped, then tear it down.
    ///
    /// Fails only when the session cannot start; per-frame failures never end the loop.
    pub fn run<F>(&self, session: &mut FocusSession, mut on_tick: F) -> Result<LoopSummary>
    where
        F: FnMut(&TickOutcome),
    {
        session.start()?;

        let mut ticks = 0u64;
        let mut last_health_log = Instant::now();
        while !self.stop.is_stopped() && self.max_ticks.map_or(true, |max| ticks < max) {
            let started = Instant::now();
            let outcome = session.tick(started);
            on_tick(&outcome);
            ticks += 1;

            if last_health_log.elapsed() >= HEALTH_LOG_EVERY {
                let camera = session.camera();
                let stats = session.stats();
                log::info!(
                    "camera health={} frames={} processed={} skipped={} alerts={} uri={}",
                    camera.is_healthy(),
                    camera.stats().frames_captured,
                    stats.frames_processed,
                    stats.frames_skipped,
                    stats.alerts_fired,
                    camera.stats().uri
                );
                last_health_log = Instant::now();
            }

            let elapsed = started.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }

        session.stop();
        Ok(LoopSummary {
            ticks,
            stats: session.stats(),
        })
    }
}
