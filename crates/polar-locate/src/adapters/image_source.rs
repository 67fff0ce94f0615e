use std::path::{Path, PathBuf};

use crate::error::StreamError;
use crate::frame::{Frame, FrameSource};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "pnm", "ppm"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Frames read from a single image or a directory of images.
///
/// Directory entries are played in file-name order. A file that fails to
/// decode counts as a missed frame; the stream ends after the last file.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(uri: &str) -> Result<Self, StreamError> {
        let root = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
        let paths = if root.is_dir() {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(root)? {
                let path = entry?.path();
                if path.is_file() && is_image(&path) {
                    paths.push(path);
                }
            }
            paths.sort();
            paths
        } else if root.is_file() {
            vec![root.to_path_buf()]
        } else {
            return Err(StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input `{uri}` is neither a file nor a directory"),
            )));
        };

        if paths.is_empty() {
            return Err(StreamError::NoFrames(uri.to_string()));
        }
        log::info!("input {uri}: {} frame(s)", paths.len());
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn capture(&mut self) -> Result<Option<Frame>, StreamError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;
        self.next += 1;
        let image = image::open(path)?.to_rgb8();
        Ok(Some(Frame::new(index, image)))
    }

    fn is_streaming(&self) -> bool {
        self.next < self.paths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn plays_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            RgbImage::from_pixel(4, 3, Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut src = ImageSequenceSource::open(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(src.len(), 3);

        let mut shades = Vec::new();
        while src.is_streaming() {
            let frame = src.capture().unwrap().expect("frame");
            assert_eq!((frame.width(), frame.height()), (4, 3));
            shades.push(frame.image.get_pixel(0, 0)[0]);
        }
        assert_eq!(shades, vec![10, 20, 30]);
        assert!(src.capture().unwrap().is_none());
    }

    #[test]
    fn undecodable_file_is_a_frame_error_not_the_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0_broken.png"), b"garbage").unwrap();
        RgbImage::new(2, 2).save(dir.path().join("1_ok.png")).unwrap();

        let mut src = ImageSequenceSource::open(dir.path().to_str().unwrap()).unwrap();
        assert!(src.capture().is_err());
        assert!(src.is_streaming());
        assert_eq!(src.capture().unwrap().unwrap().index, 1);
        assert!(!src.is_streaming());
    }

    #[test]
    fn empty_or_missing_input_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path().to_str().unwrap()),
            Err(StreamError::NoFrames(_))
        ));
        assert!(ImageSequenceSource::open("/definitely/not/here").is_err());
    }
}
