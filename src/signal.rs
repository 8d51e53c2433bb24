//! Signal extraction: eye-aspect-ratio and head pose from detector output.

use std::fmt;

use crate::detect::{FaceLandmarks, Landmark, PoseMatrix};

/// Face mesh indices for the left eye: outer corner, upper lid x2, inner corner, lower lid x2.
pub const LEFT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 398];
/// Face mesh indices for the right eye, same ordering as `LEFT_EYE`.
pub const RIGHT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

const MIN_EYE_WIDTH: f64 = 1e-9;

/// Head rotation in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadPose {
    pub yaw: f64,
    pub pitch: f64,
}

/// Per-frame derived signals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signals {
    pub avg_ear: f64,
    pub pose: Option<HeadPose>,
}

/// Detector output that cannot be turned into signals.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalError {
    MissingLandmark { index: usize, available: usize },
    DegenerateEye,
    NonFinite(&'static str),
    ShortPoseMatrix(usize),
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::MissingLandmark { index, available } => {
                write!(f, "landmark {} missing ({} available)", index, available)
            }
            SignalError::DegenerateEye => write!(f, "eye corners coincide"),
            SignalError::NonFinite(what) => write!(f, "{} is not finite", what),
            SignalError::ShortPoseMatrix(len) => {
                write!(f, "pose matrix has {} values, expected 16", len)
            }
        }
    }
}

impl std::error::Error for SignalError {}

/// EAR = (|p1-p5| + |p2-p4|) / (2 * |p0-p3|), planar distances.
pub fn eye_aspect_ratio(landmarks: &[Landmark], indices: &[usize; 6]) -> Result<f64, SignalError> {
    let mut eye = [Landmark::default(); 6];
    for (slot, &index) in eye.iter_mut().zip(indices) {
        *slot = *landmarks.get(index).ok_or(SignalError::MissingLandmark {
            index,
            available: landmarks.len(),
        })?;
    }

    let vertical = eye[1].distance_2d(&eye[5]) + eye[2].distance_2d(&eye[4]);
    let horizontal = eye[0].distance_2d(&eye[3]);
    if !vertical.is_finite() || !horizontal.is_finite() {
        return Err(SignalError::NonFinite("eye landmark"));
    }
    if horizontal < MIN_EYE_WIDTH {
        return Err(SignalError::DegenerateEye);
    }
    Ok(vertical / (2.0 * horizontal))
}

/// yaw = atan2(m[8], m[10]), pitch = asin(-m[9]), degrees.
pub fn head_pose(matrix: &PoseMatrix) -> Result<HeadPose, SignalError> {
    let m = matrix.data();
    if m.len() < 16 {
        return Err(SignalError::ShortPoseMatrix(m.len()));
    }
    if !(m[8].is_finite() && m[9].is_finite() && m[10].is_finite()) {
        return Err(SignalError::NonFinite("pose matrix"));
    }
    let yaw = m[8].atan2(m[10]).to_degrees();
    let pitch = (-m[9]).clamp(-1.0, 1.0).asin().to_degrees();
    Ok(HeadPose { yaw, pitch })
}

/// Extract EAR (mean of both eyes) and, when a pose matrix is present, yaw/pitch.
pub fn extract(face: &FaceLandmarks) -> Result<Signals, SignalError> {
    let left = eye_aspect_ratio(&face.landmarks, &LEFT_EYE)?;
    let right = eye_aspect_ratio(&face.landmarks, &RIGHT_EYE)?;
    let pose = face.pose.as_ref().map(head_pose).transpose()?;
    Ok(Signals {
        avg_ear: (left + right) / 2.0,
        pose,
    })
}
