//! V4L2 webcam source.
//!
//! Opens a local device node (e.g. `/dev/video0`), negotiates RGB24 at the
//! configured size and frame rate, and streams through memory-mapped buffers.
//! Releasing drops the stream and the device handle, which stops capture and
//! turns off the camera indicator.

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::{CameraSource, CameraStats};
use crate::config::CameraSettings;
use crate::frame::Frame;

pub struct V4l2Camera {
    config: CameraSettings,
    state: Option<DeviceState>,
    opened_at: Option<Instant>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub fn new(config: CameraSettings) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            opened_at: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

impl CameraSource for V4l2Camera {
    fn open(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.uri)
            .with_context(|| format!("open camera {}", self.config.uri))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Camera: failed to set format on {}: {}",
                    self.config.uri,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Camera: failed to set fps on {}: {}",
                    self.config.uri,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);
        self.opened_at = Some(Instant::now());

        log::info!(
            "V4l2Camera: opened {} ({}x{})",
            self.config.uri,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera not open")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture v4l2 frame")
            })?;
        let pixels = buf.to_vec();

        self.frame_count += 1;
        let now = Instant::now();
        self.last_frame_at = Some(now);
        let timestamp = self
            .opened_at
            .map(|opened| now.saturating_duration_since(opened))
            .unwrap_or_default();

        Ok(Some(Frame::new(
            pixels,
            self.active_width,
            self.active_height,
            timestamp,
            self.frame_count,
        )))
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!("V4l2Camera: released {}", self.config.uri);
        }
        self.opened_at = None;
    }

    fn active_tracks(&self) -> usize {
        usize::from(self.state.is_some())
    }

    fn is_healthy(&self) -> bool {
        if self.state.is_none() || self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            uri: self.config.uri.clone(),
        }
    }
}
