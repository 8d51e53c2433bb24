use anyhow::Result;
use std::time::Duration;

use crate::detect::result::FaceLandmarks;

/// Face landmark detector.
///
/// Implementations receive the pixels of one frame and return at most one face.
/// `Ok(None)` means no face was found and is not an error. An `Err` is treated as
/// a frame-local failure by the session: the frame is skipped and the loop continues.
///
/// Implementations MUST NOT keep the pixel slice beyond the `detect` call.
pub trait LandmarkDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// `timestamp` is the frame's monotonic capture offset; video-mode detectors
    /// use it to track the face across frames.
    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        timestamp: Duration,
    ) -> Result<Option<FaceLandmarks>>;

    /// Optional warm-up hook, called once when a session starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
