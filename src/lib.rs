//! Focus Sentinel
//!
//! Webcam attention monitoring for study sessions. Each camera frame goes through
//! a face landmark detector; eye-aspect-ratio and head pose feed consecutive-frame
//! counters that raise three alerts:
//!
//! 1. **Drowsy**: eyes closed or head nodding for ~1.6 s.
//! 2. **Attention lapse**: head turned away for more than ~2 s.
//! 3. **Absence**: no face for ~3 s.
//!
//! Alerts are spoken once, shown as indicators, and clear themselves after 2 s.
//!
//! # Module Structure
//!
//! - `frame`: Opaque camera frames and the detector view
//! - `ingest`: Camera sources (synthetic, V4L2)
//! - `detect`: Landmark detector trait and backends
//! - `signal`: EAR and yaw/pitch extraction
//! - `tracker`: Per-signal consecutive-frame counters
//! - `alert`: Alert state machines, speech and indicators
//! - `speech`: Speech output sinks
//! - `session`: Per-session ownership of all of the above
//! - `scheduler`: Cooperative frame loop with a stop handle
//! - `config`: File + environment configuration
//! - `ui`: Terminal stages and alert indicators

pub mod alert;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod speech;
pub mod tracker;
pub mod ui;

pub use alert::{
    AlertDisplay, AlertKind, AlertPresenter, NullDisplay, Raise, RetriggerPolicy,
    ALERT_VISIBLE_FOR,
};
pub use config::{CameraSettings, DetectorSettings, FocusConfig};
pub use detect::{
    FaceLandmarks, FaceScene, Landmark, LandmarkDetector, PoseMatrix, ReplayDetector, Script,
    ScriptedDetector,
};
pub use frame::{Frame, FrameView};
pub use ingest::{CameraSource, CameraStats, SyntheticCamera};
pub use scheduler::{FrameLoop, LoopSummary, StopHandle};
pub use session::{FocusSession, FrameOutcome, SessionState, SessionStats, TickOutcome};
pub use signal::{HeadPose, SignalError, Signals};
pub use speech::{CommandSpeech, LogSpeech, MemorySpeech, SpeechSink, Utterance};
pub use tracker::{Counters, StateTracker, Thresholds, Triggers};
