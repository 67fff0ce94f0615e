//! Run configuration: JSON file plus command-line overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use polar_locate_core::{CalibrationAccumulator, CalibrationParams};
use serde::{Deserialize, Serialize};

use crate::adapters::BlobParams;
use crate::error::ConfigError;
use crate::mode::Mode;
use crate::overlay::OverlayFlags;

pub const DEFAULT_THRESHOLD: f64 = 0.25;
pub const DEFAULT_MAX_DETECTIONS: usize = 1;
pub const DEFAULT_OVERLAY: &str = "lines";
pub const DEFAULT_PHYSICAL_UNIT: &str = "cm";
pub const PIXEL_UNIT: &str = "pix";

/// Detector selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetectorConfig {
    /// Bright-region detector on the frame itself.
    Blob(BlobParams),
    /// Pre-recorded detections, one list per frame.
    Replay { path: PathBuf },
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::Blob(BlobParams::default())
    }
}

impl FromStr for DetectorConfig {
    type Err = ConfigError;

    /// `blob` or `replay:<path>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "blob" => Ok(DetectorConfig::default()),
            Some(("replay", path)) if !path.is_empty() => Ok(DetectorConfig::Replay {
                path: PathBuf::from(path),
            }),
            _ => Err(ConfigError::UnknownDetector(s.to_string())),
        }
    }
}

/// Raw, unvalidated configuration as read from JSON or the command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateConfig {
    /// Image file or directory of frames.
    pub input: String,
    /// Output directory for annotated frames, or `null://`.
    pub output: String,
    pub threshold: f64,
    pub overlay: String,
    /// Detections processed per frame (`nbox`).
    pub max_detections: usize,
    /// `[known_radius, known_distance]`: run calibration.
    pub calibrate: Option<Vec<f64>>,
    /// `[focal_length, known_distance]`: report physical units.
    pub convert: Option<Vec<f64>>,
    pub calibration: CalibrationParams,
    pub detector: DetectorConfig,
    /// Unit label for converted radii; must match the unit of the distances.
    pub physical_unit: String,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: "null://".to_string(),
            threshold: DEFAULT_THRESHOLD,
            overlay: DEFAULT_OVERLAY.to_string(),
            max_detections: DEFAULT_MAX_DETECTIONS,
            calibrate: None,
            convert: None,
            calibration: CalibrationParams::default(),
            detector: DetectorConfig::default(),
            physical_unit: DEFAULT_PHYSICAL_UNIT.to_string(),
        }
    }
}

/// Configuration that passed [`LocateConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedConfig {
    pub input: String,
    pub output: String,
    pub threshold: f64,
    pub overlay: OverlayFlags,
    pub max_detections: usize,
    pub mode: Mode,
    pub calibration: CalibrationParams,
    pub detector: DetectorConfig,
    pub physical_unit: String,
}

impl ValidatedConfig {
    /// Unit label for reported radii in this mode.
    pub fn radius_unit(&self) -> &str {
        match self.mode {
            Mode::Converting(_) => &self.physical_unit,
            Mode::Idle | Mode::Calibrating(_) => PIXEL_UNIT,
        }
    }
}

impl LocateConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.input.trim().is_empty() {
            return Err(ConfigError::MissingInput);
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.max_detections == 0 {
            return Err(ConfigError::InvalidMaxDetections);
        }
        let overlay: OverlayFlags = self.overlay.parse()?;
        let mode = Mode::from_inputs(self.calibrate.as_deref(), self.convert.as_deref())?;
        if let Mode::Calibrating(target) = mode {
            // Surface a bad sample count now rather than when the loop starts.
            CalibrationAccumulator::new(target, self.calibration.clone())?;
        }

        Ok(ValidatedConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            threshold: self.threshold,
            overlay,
            max_detections: self.max_detections,
            mode,
            calibration: self.calibration.clone(),
            detector: self.detector.clone(),
            physical_unit: self.physical_unit.clone(),
        })
    }
}
