use std::collections::VecDeque;
use std::path::Path;

use crate::detection::{Detection, Detector};
use crate::error::StreamError;
use crate::frame::Frame;

/// Plays back recorded detections, one list per processed frame.
///
/// The file is a JSON array of arrays of [`Detection`]. Once the recording
/// runs out every further frame has no detections.
#[derive(Clone, Debug, Default)]
pub struct ReplayDetector {
    frames: VecDeque<Vec<Detection>>,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, StreamError> {
        let frames: Vec<Vec<Detection>> = serde_json::from_str(raw)?;
        Ok(Self::new(frames))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, StreamError> {
        let raw = std::fs::read_to_string(path)?;
        let replay = Self::from_json_str(&raw)?;
        log::info!(
            "replaying {} recorded frame(s) from {}",
            replay.remaining(),
            path.display()
        );
        Ok(replay)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, _frame: &Frame, threshold: f64) -> Result<Vec<Detection>, StreamError> {
        let mut detections = self.frames.pop_front().unwrap_or_default();
        detections.retain(|d| d.confidence >= threshold);
        Ok(detections)
    }
}
