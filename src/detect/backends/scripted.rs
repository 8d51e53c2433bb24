use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::detect::backend::LandmarkDetector;
use crate::detect::result::{FaceLandmarks, Landmark, PoseMatrix, FACE_MESH_POINTS};
use crate::signal::{LEFT_EYE, RIGHT_EYE};

const EYE_WIDTH: f64 = 0.06;
const LEFT_EYE_CENTER: (f64, f64) = (0.6, 0.4);
const RIGHT_EYE_CENTER: (f64, f64) = (0.4, 0.4);

/// Synthetic face geometry: the eye-aspect-ratio of both eyes and an optional head pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceScene {
    pub ear: f64,
    /// (yaw, pitch) in degrees. `None` produces output without a pose matrix.
    pub pose: Option<(f64, f64)>,
}

impl FaceScene {
    /// Eyes open, facing the screen.
    pub fn attentive() -> Self {
        Self {
            ear: 0.32,
            pose: Some((0.0, 0.0)),
        }
    }

    pub fn with_ear(mut self, ear: f64) -> Self {
        self.ear = ear;
        self
    }

    pub fn with_pose(mut self, yaw: f64, pitch: f64) -> Self {
        self.pose = Some((yaw, pitch));
        self
    }

    pub fn without_pose(mut self) -> Self {
        self.pose = None;
        self
    }

    /// Build a full face-mesh landmark set with this geometry.
    pub fn landmarks(&self) -> FaceLandmarks {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); FACE_MESH_POINTS];
        place_eye(&mut landmarks, &LEFT_EYE, LEFT_EYE_CENTER, self.ear);
        place_eye(&mut landmarks, &RIGHT_EYE, RIGHT_EYE_CENTER, self.ear);
        FaceLandmarks {
            landmarks,
            pose: self.pose.map(|(yaw, pitch)| pose_matrix(yaw, pitch)),
        }
    }
}

// Corners on the horizontal axis, lids at +-h so that both vertical spans are 2h.
fn place_eye(landmarks: &mut [Landmark], indices: &[usize; 6], center: (f64, f64), ear: f64) {
    let (cx, cy) = center;
    let half_w = EYE_WIDTH / 2.0;
    let h = ear * EYE_WIDTH / 2.0;
    let lid_x = EYE_WIDTH / 6.0;
    let points = [
        (cx - half_w, cy),
        (cx - lid_x, cy - h),
        (cx + lid_x, cy - h),
        (cx + half_w, cy),
        (cx + lid_x, cy + h),
        (cx - lid_x, cy + h),
    ];
    for (&idx, (x, y)) in indices.iter().zip(points) {
        landmarks[idx] = Landmark::new(x, y, 0.0);
    }
}

/// Rotation `Ry(yaw) * Rx(pitch)` with a fixed translation, column-major.
pub fn pose_matrix(yaw_degrees: f64, pitch_degrees: f64) -> PoseMatrix {
    let (sy, cy) = yaw_degrees.to_radians().sin_cos();
    let (sp, cp) = pitch_degrees.to_radians().sin_cos();
    PoseMatrix(vec![
        cy, 0.0, -sy, 0.0, // column 0
        sy * sp, cp, cy * sp, 0.0, // column 1
        sy * cp, -sp, cy * cp, 0.0, // column 2
        0.0, 0.0, -50.0, 1.0, // translation
    ])
}

/// One scripted detector response.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Face(FaceScene),
    NoFace,
    Fail(String),
}

/// Ordered list of detector responses, one per frame.
#[derive(Clone, Debug, Default)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face(self, scene: FaceScene, frames: usize) -> Self {
        self.push(ScriptStep::Face(scene), frames)
    }

    pub fn no_face(self, frames: usize) -> Self {
        self.push(ScriptStep::NoFace, frames)
    }

    pub fn fail(self, message: &str, frames: usize) -> Self {
        self.push(ScriptStep::Fail(message.to_string()), frames)
    }

    fn push(mut self, step: ScriptStep, frames: usize) -> Self {
        self.steps.extend(std::iter::repeat(step).take(frames));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Looping demo: attentive, eyes closing, attentive, looking away, nodding, away from desk.
    pub fn demo() -> Self {
        let attentive = FaceScene::attentive();
        Self::new()
            .face(attentive, 150)
            .face(attentive.with_ear(0.12), 70)
            .face(attentive, 60)
            .face(attentive.with_pose(35.0, 0.0), 80)
            .face(attentive, 60)
            .face(attentive.with_pose(0.0, 25.0), 60)
            .no_face(120)
    }
}

/// Detector that ignores pixels and replays a script.
///
/// A one-shot script returns an error once exhausted; a looping script wraps around.
pub struct ScriptedDetector {
    script: Script,
    cursor: usize,
    looping: bool,
}

impl ScriptedDetector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            cursor: 0,
            looping: false,
        }
    }

    pub fn looping(script: Script) -> Self {
        Self {
            looping: true,
            ..Self::new(script)
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len().saturating_sub(self.cursor)
    }
}

impl LandmarkDetector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
        _timestamp: Duration,
    ) -> Result<Option<FaceLandmarks>> {
        if self.looping && self.cursor >= self.script.len() {
            self.cursor = 0;
        }
        let step = self
            .script
            .steps
            .get(self.cursor)
            .ok_or_else(|| anyhow!("detector script exhausted after {} frames", self.cursor))?;
        self.cursor += 1;

        match step {
            ScriptStep::Face(scene) => Ok(Some(scene.landmarks())),
            ScriptStep::NoFace => Ok(None),
            ScriptStep::Fail(message) => Err(anyhow!("scripted detector failure: {}", message)),
        }
    }
}
