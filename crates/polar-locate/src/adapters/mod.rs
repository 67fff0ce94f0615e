//! Concrete frame sources, sinks and detectors.

mod blob;
mod image_sink;
mod image_source;
mod replay;

pub use blob::{BlobDetector, BlobParams};
pub use image_sink::{ImageDirSink, NullSink};
pub use image_source::ImageSequenceSource;
pub use replay::ReplayDetector;

use crate::config::DetectorConfig;
use crate::detection::Detector;
use crate::error::StreamError;
use crate::frame::{FrameSink, FrameSource};

pub const NULL_OUTPUT: &str = "null://";

/// Filesystem path behind `uri`: a bare path or `file://<path>`.
/// Any other `scheme://` is rejected.
fn local_path(uri: &str) -> Result<&str, StreamError> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Ok(path);
    }
    if uri.contains("://") {
        return Err(StreamError::UnsupportedUri(uri.to_string()));
    }
    Ok(uri)
}

/// Open the input stream named by `uri` (an image file or directory).
pub fn open_source(uri: &str) -> Result<Box<dyn FrameSource>, StreamError> {
    Ok(Box::new(ImageSequenceSource::open(local_path(uri)?)?))
}

/// Open the output stream: `null://` or a directory for annotated frames.
pub fn open_sink(uri: &str) -> Result<Box<dyn FrameSink>, StreamError> {
    if uri.is_empty() || uri == NULL_OUTPUT {
        return Ok(Box::new(NullSink::default()));
    }
    Ok(Box::new(ImageDirSink::create(local_path(uri)?)?))
}

pub fn build_detector(cfg: &DetectorConfig) -> Result<Box<dyn Detector>, StreamError> {
    match cfg {
        DetectorConfig::Blob(params) => Ok(Box::new(BlobDetector::new(params.clone()))),
        DetectorConfig::Replay { path } => Ok(Box::new(ReplayDetector::from_json_file(path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_schemes_are_rejected_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("display://{}", dir.path().join("screen").display());
        assert!(matches!(
            open_sink(&uri),
            Err(StreamError::UnsupportedUri(u)) if u == uri
        ));
        assert!(matches!(
            open_source("rtsp://camera/0"),
            Err(StreamError::UnsupportedUri(_))
        ));
        assert!(!dir.path().join("screen").exists());
    }

    #[test]
    fn file_scheme_and_bare_paths_open_a_directory_sink() {
        let dir = tempfile::tempdir().unwrap();
        let bare = dir.path().join("bare");
        let prefixed = dir.path().join("prefixed");
        open_sink(bare.to_str().unwrap()).unwrap();
        open_sink(&format!("file://{}", prefixed.display())).unwrap();
        assert!(bare.is_dir());
        assert!(prefixed.is_dir());
        open_sink(NULL_OUTPUT).unwrap();
    }
}
