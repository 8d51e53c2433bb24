//! Camera sources.
//!
//! - Synthetic camera (`stub://` URIs) for tests and demos
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! A session acquires its camera exactly once and must release it on teardown.
//! Sources are responsible for:
//! - Stamping each frame with a monotonic offset and a sequence number
//! - Reporting how many capture tracks are live
//!
//! Sources MUST NOT store frames to disk or keep them after handoff.

pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

pub use synthetic::SyntheticCamera;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Camera;

use crate::config::CameraSettings;
use crate::frame::Frame;

/// Statistics for a camera source.
#[derive(Clone, Debug, Default)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub uri: String,
}

pub trait CameraSource {
    /// Acquire the device and start streaming.
    fn open(&mut self) -> Result<()>;

    /// Next frame, or `None` when no new frame is ready yet.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Stop every track and release the device. Idempotent.
    fn release(&mut self);

    fn active_tracks(&self) -> usize;

    fn is_healthy(&self) -> bool {
        self.active_tracks() > 0
    }

    fn stats(&self) -> CameraStats;
}

/// Construct the camera named by `settings.uri`.
pub fn open_camera(settings: &CameraSettings) -> Result<Box<dyn CameraSource>> {
    if settings.uri.starts_with("stub://") {
        return Ok(Box::new(SyntheticCamera::new(settings.clone())));
    }
    if settings.uri.contains("://") {
        return Err(anyhow!(
            "camera '{}' is not a local device (only stub:// and device paths are supported)",
            settings.uri
        ));
    }
    open_device(settings)
}

#[cfg(feature = "ingest-v4l2")]
fn open_device(settings: &CameraSettings) -> Result<Box<dyn CameraSource>> {
    Ok(Box::new(V4l2Camera::new(settings.clone())))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_device(settings: &CameraSettings) -> Result<Box<dyn CameraSource>> {
    Err(anyhow!(
        "camera device {} requires the ingest-v4l2 feature",
        settings.uri
    ))
}
