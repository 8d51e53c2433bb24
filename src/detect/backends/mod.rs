pub mod replay;
pub mod scripted;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use replay::ReplayDetector;
pub use scripted::{pose_matrix, FaceScene, Script, ScriptStep, ScriptedDetector};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
