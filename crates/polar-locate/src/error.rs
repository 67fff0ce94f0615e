use std::path::PathBuf;

use polar_locate_core::{CalibrationError, UnitModelError};

/// Problems with the requested configuration. These are reported at
/// startup, before any frame is read.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("calibration and focal-length conversion are mutually exclusive; pass only one")]
    ConflictingModes,
    #[error("`{name}` expects exactly 2 values, got {got}")]
    BadArity { name: &'static str, got: usize },
    #[error("detection threshold must be within [0, 1] (got {0})")]
    InvalidThreshold(f64),
    #[error("maximum detections per frame must be at least 1")]
    InvalidMaxDetections,
    #[error("no input stream given")]
    MissingInput,
    #[error("unknown overlay flag `{0}` (expected lines, box, rays or none)")]
    UnknownOverlay(String),
    #[error("unknown detector `{0}` (expected `blob` or `replay:<path>`)")]
    UnknownDetector(String),
    #[error(transparent)]
    UnitModel(#[from] UnitModelError),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures of the external collaborators (frame source, detector, sink).
///
/// Inside the measurement loop these are absorbed per frame; they only
/// surface when opening a stream fails.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no frames found at `{0}`")]
    NoFrames(String),
    #[error("unsupported stream URI `{0}` (expected a path, `file://<path>` or `null://`)")]
    UnsupportedUri(String),
    #[error("detector failed: {0}")]
    Detector(String),
}

/// Top-level error of the `polar-locate` facade.
#[derive(thiserror::Error, Debug)]
pub enum LocateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}
