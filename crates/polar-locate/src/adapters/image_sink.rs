use std::path::{Path, PathBuf};

use crate::error::StreamError;
use crate::frame::{Frame, FrameSink};
use crate::overlay::{draw_overlay, Overlay};

/// Writes each annotated frame as `frame_NNNNNN.png` into a directory.
#[derive(Debug)]
pub struct ImageDirSink {
    dir: PathBuf,
    status: String,
    written: usize,
}

impl ImageDirSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, StreamError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        log::info!("writing annotated frames to {}", dir.display());
        Ok(Self {
            dir,
            status: String::new(),
            written: 0,
        })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl FrameSink for ImageDirSink {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<(), StreamError> {
        let mut canvas = frame.image.clone();
        draw_overlay(&mut canvas, overlay);
        for label in &overlay.labels {
            log::info!(
                "frame {} @({:.0}, {:.0}): {}",
                frame.index,
                label.anchor.x,
                label.anchor.y,
                label.text
            );
        }
        canvas.save(self.frame_path(frame.index))?;
        self.written += 1;
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        if self.status != status {
            log::debug!("{status}");
            self.status.clear();
            self.status.push_str(status);
        }
    }

    fn is_streaming(&self) -> bool {
        true
    }
}

/// Discards frames; labels still go to the log.
#[derive(Debug, Default)]
pub struct NullSink {
    status: String,
    rendered: usize,
}

impl NullSink {
    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl FrameSink for NullSink {
    fn render(&mut self, frame: &Frame, overlay: &Overlay) -> Result<(), StreamError> {
        for label in &overlay.labels {
            log::info!("frame {}: {}", frame.index, label.text);
        }
        self.rendered += 1;
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.status.clear();
        self.status.push_str(status);
    }

    fn is_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayFlags;
    use image::RgbImage;

    #[test]
    fn writes_annotated_png_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut sink = ImageDirSink::create(&out).unwrap();

        let frame = Frame::new(7, RgbImage::new(20, 10));
        let overlay = Overlay::with_axes(OverlayFlags::default(), 20, 10);
        sink.render(&frame, &overlay).unwrap();
        sink.set_status("FPS: 30");

        let saved = image::open(out.join("frame_000007.png")).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (20, 10));
        assert_eq!(saved.get_pixel(10, 2)[1], 255);
        assert_eq!(sink.written(), 1);
        assert_eq!(sink.status(), "FPS: 30");
        assert!(sink.is_streaming());
    }

    #[test]
    fn null_sink_counts_frames() {
        let mut sink = NullSink::default();
        let frame = Frame::new(0, RgbImage::new(2, 2));
        sink.render(&frame, &Overlay::default()).unwrap();
        sink.set_status("FPS: 1");
        assert_eq!(sink.rendered(), 1);
        assert_eq!(sink.status(), "FPS: 1");
    }
}
