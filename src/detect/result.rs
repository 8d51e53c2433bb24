use serde::{Deserialize, Serialize};

/// Number of points in the refined face mesh (468 mesh points + 10 iris points).
pub const FACE_MESH_POINTS: usize = 478;

/// One facial keypoint. Coordinates are normalized to the frame (0..1 for x/y).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar distance; depth is ignored.
    pub fn distance_2d(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Facial transformation matrix, 4x4 flattened column-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseMatrix(pub Vec<f64>);

impl PoseMatrix {
    pub fn data(&self) -> &[f64] {
        &self.0
    }
}

/// Detector output for the single tracked face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub pose: Option<PoseMatrix>,
}
