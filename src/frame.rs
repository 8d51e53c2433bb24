//! Camera frame isolation layer.
//!
//! - `Frame`: Opaque container for one camera sample. Pixel bytes are private.
//! - `FrameView`: Borrowed view handed to the pipeline. It can run a landmark detector
//!   over the pixels but cannot hand the bytes out.
//!
//! Frames are processed once and dropped. Nothing in the pipeline keeps a frame past
//! the tick that produced it, and pixel memory is zeroized on drop.

use anyhow::Result;
use std::time::Duration;
use zeroize::Zeroize;

use crate::detect::{FaceLandmarks, LandmarkDetector};

// ----------------------------------------------------------------------------
// Frame: Opaque camera sample
// ----------------------------------------------------------------------------

/// Opaque camera frame. Bytes are private; there is no `.as_bytes()` and no `Clone`.
pub struct Frame {
    /// Private pixel data (packed RGB24).
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Monotonic capture offset since the camera was opened.
    pub timestamp: Duration,

    /// Per-camera sequence number. Strictly increases while the stream is live.
    pub sequence: u64,
}

impl Frame {
    /// Wrap a captured pixel buffer. Called by camera sources.
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp: Duration, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp,
            sequence,
        }
    }

    /// Restricted view for the detector stage.
    pub fn view(&self) -> FrameView<'_> {
        FrameView { frame: self }
    }

    /// Raw byte length (for stats only).
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

// ----------------------------------------------------------------------------
// FrameView: what the pipeline sees
// ----------------------------------------------------------------------------

/// Borrowed view of a frame.
///
/// `FrameView` provides dimensions, timing and a way to run a detector.
/// It does NOT provide raw byte access, serialization, or cloning.
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn timestamp(&self) -> Duration {
        self.frame.timestamp
    }

    pub fn sequence(&self) -> u64 {
        self.frame.sequence
    }

    /// Run a detector on this frame. Pixels flow in, landmarks flow out.
    pub fn run_detector<D>(&self, detector: &mut D) -> Result<Option<FaceLandmarks>>
    where
        D: LandmarkDetector + ?Sized,
    {
        detector.detect(
            &self.frame.data,
            self.frame.width,
            self.frame.height,
            self.frame.timestamp,
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct LenDetector {
        seen: usize,
    }

    impl LandmarkDetector for LenDetector {
        fn name(&self) -> &'static str {
            "len"
        }

        fn detect(
            &mut self,
            pixels: &[u8],
            _width: u32,
            _height: u32,
            _timestamp: Duration,
        ) -> Result<Option<FaceLandmarks>> {
            self.seen = pixels.len();
            Ok(None)
        }
    }

    #[test]
    fn view_exposes_metadata() {
        let frame = Frame::new(vec![1, 2, 3], 1, 1, Duration::from_millis(33), 7);
        let view = frame.view();

        assert_eq!(view.width(), 1);
        assert_eq!(view.height(), 1);
        assert_eq!(view.timestamp(), Duration::from_millis(33));
        assert_eq!(view.sequence(), 7);
    }

    #[test]
    fn detector_receives_pixels_through_view() {
        let frame = Frame::new(vec![0u8; 12], 2, 2, Duration::ZERO, 1);
        let mut detector = LenDetector { seen: 0 };

        let result = frame.view().run_detector(&mut detector).unwrap();
        assert!(result.is_none());
        assert_eq!(detector.seen, 12);
        assert_eq!(frame.byte_len(), 12);
    }
}
