use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::{RetriggerPolicy, ALERT_VISIBLE_FOR};
use crate::tracker::{Thresholds, EAR_THRESHOLD_RANGE};

const DEFAULT_CAMERA_URI: &str = "stub://webcam";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_DETECTOR: &str = "scripted";
const MAX_CAMERA_FPS: u32 = 240;

#[derive(Debug, Deserialize, Default)]
struct FocusConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    thresholds: Option<Thresholds>,
    speech: Option<SpeechConfigFile>,
    alerts: Option<AlertConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    uri: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    trace: Option<PathBuf>,
    model: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct SpeechConfigFile {
    command: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    retrigger: Option<RetriggerPolicy>,
    visible_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct FocusConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub thresholds: Thresholds,
    /// External TTS program; `None` logs utterances instead.
    pub speech_command: Option<String>,
    pub retrigger: RetriggerPolicy,
    pub alert_visible_for: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// `stub://<name>` or a local device path such as `/dev/video0`.
    pub uri: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub trace_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self::from_file(FocusConfigFile::default())
    }
}

impl FocusConfig {
    /// Defaults, then the file named by `FOCUS_CONFIG`, then `FOCUS_*` overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FOCUS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FocusConfigFile) -> Self {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraSettings {
            uri: camera_file
                .uri
                .unwrap_or_else(|| DEFAULT_CAMERA_URI.to_string()),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
            trace_path: detector_file.trace,
            model_path: detector_file.model,
        };
        let alerts = file.alerts.unwrap_or_default();
        Self {
            camera,
            detector,
            thresholds: file.thresholds.unwrap_or_default(),
            speech_command: file.speech.and_then(|speech| speech.command),
            retrigger: alerts.retrigger.unwrap_or_default(),
            alert_visible_for: alerts
                .visible_ms
                .map(Duration::from_millis)
                .unwrap_or(ALERT_VISIBLE_FOR),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(uri) = non_empty_env("FOCUS_CAMERA") {
            self.camera.uri = uri;
        }
        if let Some(fps) = non_empty_env("FOCUS_FPS") {
            self.camera.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("FOCUS_FPS must be an integer frame rate"))?;
        }
        if let Some(backend) = non_empty_env("FOCUS_DETECTOR") {
            self.detector.backend = backend;
        }
        if let Some(trace) = non_empty_env("FOCUS_TRACE") {
            self.detector.trace_path = Some(PathBuf::from(trace));
        }
        if let Some(model) = non_empty_env("FOCUS_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
        }
        if let Some(ear) = non_empty_env("FOCUS_EAR_THRESHOLD") {
            self.thresholds.ear = ear
                .parse()
                .map_err(|_| anyhow!("FOCUS_EAR_THRESHOLD must be a number"))?;
        }
        if let Some(command) = non_empty_env("FOCUS_SPEECH_COMMAND") {
            self.speech_command = Some(command);
        }
        if let Some(policy) = non_empty_env("FOCUS_RETRIGGER") {
            self.retrigger = policy.parse()?;
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.camera.target_fps == 0 || self.camera.target_fps > MAX_CAMERA_FPS {
            return Err(anyhow!(
                "camera target_fps must be between 1 and {}",
                MAX_CAMERA_FPS
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be non-zero"));
        }

        let (lo, hi) = EAR_THRESHOLD_RANGE;
        let t = &self.thresholds;
        if !(lo..=hi).contains(&t.ear) {
            return Err(anyhow!(
                "ear threshold {} outside {}..={}",
                t.ear,
                lo,
                hi
            ));
        }
        if !(t.pitch_degrees > 0.0 && t.pitch_degrees < 90.0)
            || !(t.yaw_degrees > 0.0 && t.yaw_degrees < 180.0)
        {
            return Err(anyhow!("pitch/yaw thresholds must be positive angles"));
        }
        if t.drowsy_frames == 0 || t.attention_lapse_frames == 0 || t.absence_frames == 0 {
            return Err(anyhow!("frame thresholds must be greater than zero"));
        }
        if self.alert_visible_for.is_zero() {
            return Err(anyhow!("alert visibility window must be greater than zero"));
        }

        self.detector.backend = self.detector.backend.trim().to_lowercase();
        if let Some(command) = &self.speech_command {
            if command.trim().is_empty() {
                self.speech_command = None;
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<FocusConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
