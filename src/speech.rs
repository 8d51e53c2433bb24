//! Speech output collaborators.
//!
//! Speech is best effort and fire-and-forget: a sink that is already speaking
//! makes the presenter skip the new utterance, and a failed `speak` is logged
//! without affecting alert state.

use anyhow::{Context, Result};
use serde::Serialize;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_LANG: &str = "ko-KR";
pub const DEFAULT_RATE: f32 = 1.2;

/// Base speaking rate used to convert `rate` into words per minute.
const BASE_WPM: f32 = 175.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Utterance {
    pub text: String,
    /// BCP 47 language tag.
    pub lang: String,
    /// Relative speaking rate, 1.0 is normal.
    pub rate: f32,
}

impl Utterance {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            lang: DEFAULT_LANG.to_string(),
            rate: DEFAULT_RATE,
        }
    }
}

pub trait SpeechSink: Send {
    fn is_speaking(&mut self) -> bool;

    fn speak(&mut self, utterance: &Utterance) -> Result<()>;

    /// Stop any utterance in progress. Must be safe to call when idle.
    fn cancel(&mut self);
}

// ----------------------------------------------------------------------------
// LogSpeech
// ----------------------------------------------------------------------------

/// Writes utterances to the log instead of an audio device.
#[derive(Default)]
pub struct LogSpeech;

impl SpeechSink for LogSpeech {
    fn is_speaking(&mut self) -> bool {
        false
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        log::info!("speech [{}]: {}", utterance.lang, utterance.text);
        Ok(())
    }

    fn cancel(&mut self) {}
}

// ----------------------------------------------------------------------------
// CommandSpeech
// ----------------------------------------------------------------------------

/// Speaks through an external espeak-compatible program (`-v <voice> -s <wpm> <text>`).
pub struct CommandSpeech {
    program: String,
    child: Option<Child>,
}

impl CommandSpeech {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            child: None,
        }
    }

    fn args(utterance: &Utterance) -> Vec<String> {
        let voice = utterance
            .lang
            .split(['-', '_'])
            .next()
            .unwrap_or(DEFAULT_LANG)
            .to_lowercase();
        let wpm = (BASE_WPM * utterance.rate.max(0.1)).round() as u32;
        vec![
            "-v".to_string(),
            voice,
            "-s".to_string(),
            wpm.to_string(),
            utterance.text.clone(),
        ]
    }
}

impl SpeechSink for CommandSpeech {
    fn is_speaking(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(_status)) => {
                self.child = None;
                false
            }
            Err(e) => {
                log::warn!("speech: failed to poll {}: {}", self.program, e);
                self.child = None;
                false
            }
        }
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        self.cancel();
        let child = Command::new(&self.program)
            .args(Self::args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn speech program {}", self.program))?;
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSpeech {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ----------------------------------------------------------------------------
// MemorySpeech
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemorySpeechState {
    spoken: Vec<Utterance>,
    speaking: bool,
    cancels: usize,
}

/// In-memory sink. Clones share state, so a test can keep a handle after
/// handing the sink to a session.
#[derive(Clone, Debug, Default)]
pub struct MemorySpeech {
    state: Arc<Mutex<MemorySpeechState>>,
}

impl MemorySpeech {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemorySpeechState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.state().spoken.clone()
    }

    /// Simulate an utterance in progress (cleared by `cancel`).
    pub fn set_speaking(&self, speaking: bool) {
        self.state().speaking = speaking;
    }

    pub fn cancel_count(&self) -> usize {
        self.state().cancels
    }
}

impl SpeechSink for MemorySpeech {
    fn is_speaking(&mut self) -> bool {
        self.state().speaking
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        self.state().spoken.push(utterance.clone());
        Ok(())
    }

    fn cancel(&mut self) {
        let mut state = self.state();
        state.speaking = false;
        state.cancels += 1;
    }
}
