use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_4;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};

use crate::detection::{BoundingBox, Detection, Detector};
use crate::error::StreamError;
use crate::frame::Frame;

/// Parameters for [`BlobDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Luma level (inclusive) separating targets from background.
    pub level: u8,
    /// Components with fewer pixels are dropped as noise.
    pub min_area: u32,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            level: 200,
            min_area: 25,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Extent {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

impl Extent {
    fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        }
    }

    fn grow(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
    }

    /// Pixel-edge box: a single pixel at (x, y) spans [x, x+1) x [y, y+1).
    fn bbox(&self) -> BoundingBox {
        BoundingBox {
            left: self.min_x as f64,
            top: self.min_y as f64,
            right: self.max_x as f64 + 1.0,
            bottom: self.max_y as f64 + 1.0,
        }
    }

    /// How disc-like the component is: fill ratio of its box relative to
    /// an inscribed disc, clamped to `[0, 1]`.
    fn roundness(&self) -> f64 {
        let b = self.bbox();
        let fill = self.area as f64 / (b.width() * b.height());
        (fill / FRAC_PI_4).clamp(0.0, 1.0)
    }
}

/// Detects bright, roughly round regions such as lit toy balls.
///
/// Pixels at or above [`BlobParams::level`] are grouped into 4-connected
/// components. Larger components come first.
#[derive(Clone, Debug, Default)]
pub struct BlobDetector {
    params: BlobParams,
}

impl BlobDetector {
    pub fn new(params: BlobParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BlobParams {
        &self.params
    }

    pub fn detect_gray(&self, gray: &GrayImage, threshold: f64) -> Vec<Detection> {
        let level = self.params.level;
        let mask = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] >= level {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        let labels = connected_components(&mask, Connectivity::Four, Luma([0u8]));

        let mut extents: BTreeMap<u32, Extent> = BTreeMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let id = label[0];
            if id == 0 {
                continue;
            }
            extents
                .entry(id)
                .or_insert_with(|| Extent::at(x, y))
                .grow(x, y);
        }

        let mut blobs: Vec<Extent> = extents
            .into_values()
            .filter(|e| e.area >= self.params.min_area)
            .collect();
        blobs.sort_by(|a, b| {
            b.area
                .cmp(&a.area)
                .then(a.min_y.cmp(&b.min_y))
                .then(a.min_x.cmp(&b.min_x))
        });

        blobs
            .iter()
            .map(|e| Detection {
                bbox: e.bbox(),
                confidence: e.roundness(),
                class_id: 0,
            })
            .filter(|d| d.confidence >= threshold)
            .collect()
    }
}

impl Detector for BlobDetector {
    fn detect(&mut self, frame: &Frame, threshold: f64) -> Result<Vec<Detection>, StreamError> {
        let gray = image::imageops::grayscale(&frame.image);
        let detections = self.detect_gray(&gray, threshold);
        log::trace!("frame {}: {} blob(s)", frame.index, detections.len());
        Ok(detections)
    }
}
