use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use focus_sentinel::{FocusConfig, RetriggerPolicy};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FOCUS_CONFIG",
        "FOCUS_CAMERA",
        "FOCUS_FPS",
        "FOCUS_DETECTOR",
        "FOCUS_TRACE",
        "FOCUS_MODEL",
        "FOCUS_EAR_THRESHOLD",
        "FOCUS_SPEECH_COMMAND",
        "FOCUS_RETRIGGER",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let trace_path = file.path().with_extension("jsonl");
    let json = format!(
        r#"{{
            "camera": {{
                "uri": "stub://laptop",
                "target_fps": 15,
                "width": 320,
                "height": 240
            }},
            "detector": {{
                "backend": " Replay ",
                "trace": "{}"
            }},
            "thresholds": {{
                "ear": 0.3,
                "absence_frames": 45
            }},
            "speech": {{
                "command": "espeak-ng"
            }},
            "alerts": {{
                "retrigger": "extend_window",
                "visible_ms": 1500
            }}
        }}"#,
        trace_path.display()
    );
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("FOCUS_CONFIG", file.path());
    std::env::set_var("FOCUS_EAR_THRESHOLD", "0.2");
    std::env::set_var("FOCUS_FPS", "24");

    let cfg = FocusConfig::load().expect("load config");

    assert_eq!(cfg.camera.uri, "stub://laptop");
    assert_eq!(cfg.camera.target_fps, 24);
    assert_eq!(cfg.camera.width, 320);
    assert_eq!(cfg.camera.height, 240);
    assert_eq!(cfg.detector.backend, "replay");
    assert_eq!(cfg.detector.trace_path.unwrap(), trace_path);
    assert_eq!(cfg.thresholds.ear, 0.2);
    assert_eq!(cfg.thresholds.absence_frames, 45);
    assert_eq!(cfg.thresholds.drowsy_frames, 48);
    assert_eq!(cfg.speech_command.as_deref(), Some("espeak-ng"));
    assert_eq!(cfg.retrigger, RetriggerPolicy::ExtendWindow);
    assert_eq!(cfg.alert_visible_for, Duration::from_millis(1500));

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [camera]
        uri = "stub://study-room"

        [thresholds]
        pitch_degrees = 18.0
        yaw_degrees = 25.0
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("FOCUS_CONFIG", file.path());
    std::env::set_var("FOCUS_RETRIGGER", "ignore");

    let cfg = FocusConfig::load().expect("load config");

    assert_eq!(cfg.camera.uri, "stub://study-room");
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.thresholds.pitch_degrees, 18.0);
    assert_eq!(cfg.thresholds.yaw_degrees, 25.0);
    assert_eq!(cfg.thresholds.ear, 0.25);
    assert_eq!(cfg.detector.backend, "scripted");
    assert_eq!(cfg.retrigger, RetriggerPolicy::Ignore);

    clear_env();
}

#[test]
fn rejects_invalid_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FOCUS_EAR_THRESHOLD", "0.9");
    assert!(FocusConfig::load().is_err());

    std::env::set_var("FOCUS_EAR_THRESHOLD", "sleepy");
    assert!(FocusConfig::load().is_err());
    std::env::remove_var("FOCUS_EAR_THRESHOLD");

    std::env::set_var("FOCUS_RETRIGGER", "sometimes");
    assert!(FocusConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("temp dir");
    std::env::set_var("FOCUS_CONFIG", dir.path().join("absent.json"));
    let err = FocusConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
