//! Consecutive-frame state tracking.
//!
//! One `StateTracker` belongs to one session. Every processed frame updates each
//! counter exactly once: it either increments (condition met) or resets to zero.
//! The tracker only reports which alert conditions hold; whether an alert actually
//! fires is decided by the presenter, which knows if the kind is already active.

use serde::{Deserialize, Serialize};

use crate::alert::AlertKind;
use crate::signal::Signals;

pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;
/// Bounds of the user-adjustable sensitivity.
pub const EAR_THRESHOLD_RANGE: (f64, f64) = (0.15, 0.35);

/// Detection thresholds. Frame counts assume roughly 30 fps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Eyes count as closed below this eye-aspect-ratio.
    pub ear: f64,
    /// Head counts as nodding above this pitch.
    pub pitch_degrees: f64,
    /// Head counts as turned away above this absolute yaw.
    pub yaw_degrees: f64,
    /// Drowsy fires at this many closed-eye or nodding frames (~1.6 s).
    pub drowsy_frames: u32,
    /// Attention lapse fires once the turned-away count exceeds this (~2 s).
    pub attention_lapse_frames: u32,
    /// Absence fires at this many frames without a face (~3 s).
    pub absence_frames: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ear: DEFAULT_EAR_THRESHOLD,
            pitch_degrees: 15.0,
            yaw_degrees: 20.0,
            drowsy_frames: 48,
            attention_lapse_frames: 60,
            absence_frames: 90,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub drowsy: u32,
    pub head_nod: u32,
    pub absence: u32,
    pub attention_lapse: u32,
}

/// Alert conditions that hold on the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Triggers {
    pub drowsy: bool,
    pub attention: bool,
    pub absence: bool,
}

impl Triggers {
    /// Kinds in presentation order: attention, drowsy, absence.
    pub fn kinds(&self) -> Vec<AlertKind> {
        let mut kinds = Vec::new();
        if self.attention {
            kinds.push(AlertKind::Attention);
        }
        if self.drowsy {
            kinds.push(AlertKind::Drowsy);
        }
        if self.absence {
            kinds.push(AlertKind::Absence);
        }
        kinds
    }

    pub fn any(&self) -> bool {
        self.drowsy || self.attention || self.absence
    }
}

#[derive(Clone, Debug, Default)]
pub struct StateTracker {
    thresholds: Thresholds,
    counters: Counters,
}

fn step(counter: &mut u32, condition: bool) {
    if condition {
        *counter = counter.saturating_add(1);
    } else {
        *counter = 0;
    }
}

impl StateTracker {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            counters: Counters::default(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Set the eye-closure threshold, clamped to `EAR_THRESHOLD_RANGE`. Returns the applied value.
    pub fn set_ear_threshold(&mut self, ear: f64) -> f64 {
        let (lo, hi) = EAR_THRESHOLD_RANGE;
        let applied = if ear.is_finite() { ear.clamp(lo, hi) } else { DEFAULT_EAR_THRESHOLD };
        self.thresholds.ear = applied;
        applied
    }

    /// Frame with a detected face.
    ///
    /// Without a pose matrix the yaw/pitch counters are left untouched.
    pub fn observe_face(&mut self, signals: &Signals) -> Triggers {
        let t = self.thresholds;
        self.counters.absence = 0;
        step(&mut self.counters.drowsy, signals.avg_ear < t.ear);

        let mut triggers = Triggers::default();
        if let Some(pose) = signals.pose {
            step(&mut self.counters.attention_lapse, pose.yaw.abs() > t.yaw_degrees);
            step(&mut self.counters.head_nod, pose.pitch > t.pitch_degrees);
            triggers.attention = self.counters.attention_lapse > t.attention_lapse_frames;
        }
        triggers.drowsy = self.counters.drowsy >= t.drowsy_frames
            || self.counters.head_nod >= t.drowsy_frames;
        triggers
    }

    /// Frame without a face: every face counter resets, absence counts up.
    pub fn observe_no_face(&mut self) -> Triggers {
        self.counters.drowsy = 0;
        self.counters.head_nod = 0;
        self.counters.attention_lapse = 0;
        step(&mut self.counters.absence, true);
        Triggers {
            absence: self.counters.absence >= self.thresholds.absence_frames,
            ..Triggers::default()
        }
    }

    pub fn reset(&mut self) {
        self.counters = Counters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::HeadPose;

    fn face(avg_ear: f64, yaw: f64, pitch: f64) -> Signals {
        Signals {
            avg_ear,
            pose: Some(HeadPose { yaw, pitch }),
        }
    }

    #[test]
    fn unmet_conditions_zero_face_counters() {
        let mut tracker = StateTracker::default();
        for _ in 0..10 {
            tracker.observe_face(&face(0.1, 0.0, 30.0));
        }
        assert_eq!(tracker.counters().drowsy, 10);
        assert_eq!(tracker.counters().head_nod, 10);

        tracker.observe_face(&face(0.25, 0.0, 15.0));
        assert_eq!(tracker.counters().drowsy, 0);
        assert_eq!(tracker.counters().head_nod, 0);
    }

    #[test]
    fn drowsy_condition_at_threshold_frame() {
        let mut tracker = StateTracker::default();
        for frame in 1..=50 {
            let triggers = tracker.observe_face(&face(0.10, 0.0, 0.0));
            assert_eq!(triggers.drowsy, frame >= 48, "frame {}", frame);
        }
    }

    #[test]
    fn head_nod_alone_triggers_drowsy() {
        let mut tracker = StateTracker::default();
        let mut first = None;
        for frame in 1..=60 {
            if tracker.observe_face(&face(0.30, 0.0, 20.0)).drowsy && first.is_none() {
                first = Some(frame);
            }
        }
        assert_eq!(first, Some(48));
        assert_eq!(tracker.counters().drowsy, 0);
    }

    #[test]
    fn attention_needs_more_than_sixty_frames() {
        let mut tracker = StateTracker::default();
        for _ in 0..60 {
            assert!(!tracker.observe_face(&face(0.30, -25.0, 0.0)).attention);
        }
        assert!(tracker.observe_face(&face(0.30, -25.0, 0.0)).attention);
    }

    #[test]
    fn missing_pose_keeps_pose_counters() {
        let mut tracker = StateTracker::default();
        for _ in 0..5 {
            tracker.observe_face(&face(0.30, 40.0, 0.0));
        }
        tracker.observe_face(&Signals {
            avg_ear: 0.30,
            pose: None,
        });
        assert_eq!(tracker.counters().attention_lapse, 5);
    }

    #[test]
    fn absence_counts_and_resets() {
        let mut tracker = StateTracker::default();
        for _ in 0..30 {
            tracker.observe_face(&face(0.10, 30.0, 30.0));
        }
        for _ in 0..89 {
            assert!(!tracker.observe_no_face().absence);
        }
        let c = tracker.counters();
        assert_eq!((c.drowsy, c.head_nod, c.attention_lapse), (0, 0, 0));

        tracker.observe_face(&face(0.30, 0.0, 0.0));
        assert_eq!(tracker.counters().absence, 0);

        for frame in 1..=90 {
            assert_eq!(tracker.observe_no_face().absence, frame == 90);
        }
    }

    #[test]
    fn ear_threshold_is_clamped() {
        let mut tracker = StateTracker::default();
        assert_eq!(tracker.set_ear_threshold(0.05), 0.15);
        assert_eq!(tracker.set_ear_threshold(0.5), 0.35);
        assert_eq!(tracker.set_ear_threshold(0.2), 0.2);
        assert_eq!(tracker.thresholds().ear, 0.2);
    }

    #[test]
    fn trigger_order_matches_presentation() {
        let triggers = Triggers {
            drowsy: true,
            attention: true,
            absence: false,
        };
        assert_eq!(triggers.kinds(), vec![AlertKind::Attention, AlertKind::Drowsy]);
        assert!(triggers.any());
    }
}
