mod backend;
mod backends;
mod result;

use anyhow::{anyhow, Result};

pub use backend::LandmarkDetector;
pub use backends::{pose_matrix, FaceScene, ReplayDetector, Script, ScriptStep, ScriptedDetector};
pub use result::{FaceLandmarks, Landmark, PoseMatrix, FACE_MESH_POINTS};

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;

use crate::config::DetectorSettings;

/// Names accepted by `open_backend`.
pub const BACKEND_NAMES: &[&str] = &["scripted", "replay", "tract"];

/// Construct the detector backend named in the settings.
pub fn open_backend(settings: &DetectorSettings) -> Result<Box<dyn LandmarkDetector>> {
    match settings.backend.as_str() {
        "scripted" => Ok(Box::new(ScriptedDetector::looping(Script::demo()))),
        "replay" => {
            let path = settings
                .trace_path
                .as_ref()
                .ok_or_else(|| anyhow!("replay backend requires a trace path"))?;
            Ok(Box::new(ReplayDetector::open(path)?))
        }
        "tract" => open_tract(settings),
        other => Err(anyhow!(
            "unknown detector backend '{}' (expected one of {:?})",
            other,
            BACKEND_NAMES
        )),
    }
}

#[cfg(feature = "backend-tract")]
fn open_tract(settings: &DetectorSettings) -> Result<Box<dyn LandmarkDetector>> {
    let path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires a model path"))?;
    Ok(Box::new(TractBackend::new(path)?))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(_settings: &DetectorSettings) -> Result<Box<dyn LandmarkDetector>> {
    Err(anyhow!("tract backend requires the backend-tract feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(backend: &str) -> DetectorSettings {
        DetectorSettings {
            backend: backend.to_string(),
            trace_path: None,
            model_path: None,
        }
    }

    #[test]
    fn opens_scripted_backend() {
        let detector = open_backend(&settings("scripted")).unwrap();
        assert_eq!(detector.name(), "scripted");
    }

    #[test]
    fn rejects_unknown_and_incomplete_backends() {
        assert!(open_backend(&settings("mediapipe")).is_err());
        assert!(open_backend(&settings("replay")).is_err());
        assert!(open_backend(&settings("tract")).is_err());
    }
}
