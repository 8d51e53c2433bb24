//! Trace replay detector.
//!
//! A trace is a JSON-lines file with one detector result per frame:
//!
//! ```text
//! {"landmarks":[{"x":0.41,"y":0.38,"z":-0.02}, ...],"pose":[1.0,0.0, ...]}
//! null
//! ```
//!
//! `null` records a frame without a face. Lines are parsed lazily, so a malformed
//! line surfaces as a detection error for that frame only. Blank lines are ignored.

use anyhow::{anyhow, Context, Result};
use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use crate::detect::backend::LandmarkDetector;
use crate::detect::result::FaceLandmarks;

pub struct ReplayDetector {
    source: String,
    /// Non-blank records with their 1-based line number in the trace.
    lines: Vec<(usize, String)>,
    cursor: usize,
}

impl ReplayDetector {
    /// Load a trace file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open replay trace {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file), &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read replay trace {}", source))?;
            if !line.trim().is_empty() {
                lines.push((index + 1, line));
            }
        }
        log::info!("ReplayDetector: loaded {} frames from {}", lines.len(), source);
        Ok(Self {
            source: source.to_string(),
            lines,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.lines.len()
    }
}

impl LandmarkDetector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
        _timestamp: Duration,
    ) -> Result<Option<FaceLandmarks>> {
        let (line_number, line) = self
            .lines
            .get(self.cursor)
            .ok_or_else(|| anyhow!("replay trace {} exhausted", self.source))?;
        self.cursor += 1;
        serde_json::from_str::<Option<FaceLandmarks>>(line)
            .map_err(|e| anyhow!("{}:{}: invalid trace record: {}", self.source, line_number, e))
    }
}
