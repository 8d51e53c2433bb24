//! Synthetic camera for tests and demos.
//!
//! Produces a deterministic RGB pattern at the configured size. Timestamps advance
//! by exactly one frame interval per frame, independent of wall time.
//! The URI `stub://denied` simulates a camera the user refused to share.

use anyhow::{anyhow, Result};
use std::time::Duration;

use super::{CameraSource, CameraStats};
use crate::config::CameraSettings;
use crate::frame::Frame;

pub const DENIED_URI: &str = "stub://denied";

pub struct SyntheticCamera {
    config: CameraSettings,
    open: bool,
    frame_count: u64,
    /// Simulated scene state; shifts the pattern every 50 frames.
    scene_state: u8,
}

impl SyntheticCamera {
    pub fn new(config: CameraSettings) -> Self {
        Self {
            config,
            open: false,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.config.target_fps.max(1)
    }

    /// Capture offset of frame `n`; saturates instead of wrapping.
    fn timestamp_for(&self, n: u64) -> Duration {
        let interval_ns = u64::try_from(self.frame_interval().as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(interval_ns.saturating_mul(n))
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize) * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl CameraSource for SyntheticCamera {
    fn open(&mut self) -> Result<()> {
        if self.config.uri == DENIED_URI {
            return Err(anyhow!("camera access denied for {}", self.config.uri));
        }
        self.open = true;
        log::info!(
            "SyntheticCamera: opened {} ({}x{} @ {} fps)",
            self.config.uri,
            self.config.width,
            self.config.height,
            self.config.target_fps
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.open {
            return Err(anyhow!("camera {} is not open", self.config.uri));
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        let timestamp = self.timestamp_for(self.frame_count);
        Ok(Some(Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            timestamp,
            self.frame_count,
        )))
    }

    fn release(&mut self) {
        if self.open {
            log::info!("SyntheticCamera: released {}", self.config.uri);
        }
        self.open = false;
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.open)
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            uri: self.config.uri.clone(),
        }
    }
}
