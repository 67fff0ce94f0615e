use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::frame::Frame;

/// Axis-aligned box in image-pixel coordinates (origin top-left, y down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            0.5 * (self.left + self.right),
            0.5 * (self.top + self.bottom),
        )
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f64> {
        Point2::new(self.left, self.top)
    }
}

/// One object reported by a [`Detector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    #[serde(default)]
    pub class_id: u32,
}

impl Detection {
    #[inline]
    pub fn center(&self) -> Point2<f64> {
        self.bbox.center()
    }
}

/// Object detector collaborator.
///
/// Implementations return detections at or above `threshold` in their own
/// preferred order; the measurement loop never re-ranks them.
pub trait Detector {
    fn detect(&mut self, frame: &Frame, threshold: f64) -> Result<Vec<Detection>, StreamError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame, threshold: f64) -> Result<Vec<Detection>, StreamError> {
        (**self).detect(frame, threshold)
    }
}

/// The first `min(max, detections.len())` detections.
#[inline]
pub fn select_detections(detections: &[Detection], max: usize) -> &[Detection] {
    &detections[..max.min(detections.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(left: f64, confidence: f64) -> Detection {
        Detection {
            bbox: BoundingBox {
                left,
                top: 0.0,
                right: left + 10.0,
                bottom: 20.0,
            },
            confidence,
            class_id: 0,
        }
    }

    #[test]
    fn bbox_center_and_extent() {
        let b = BoundingBox {
            left: 10.0,
            top: 20.0,
            right: 30.0,
            bottom: 60.0,
        };
        assert_eq!(b.center(), Point2::new(20.0, 40.0));
        assert_eq!(b.width(), 20.0);
        assert_eq!(b.height(), 40.0);
        assert_eq!(b.top_left(), Point2::new(10.0, 20.0));
    }

    #[test]
    fn selection_keeps_detector_order_and_caps() {
        let dets = vec![det(5.0, 0.3), det(1.0, 0.9), det(3.0, 0.5)];
        let two = select_detections(&dets, 2);
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].bbox.left, 5.0);
        assert_eq!(two[1].bbox.left, 1.0);

        assert_eq!(select_detections(&dets, 10).len(), 3);
        assert!(select_detections(&[], 4).is_empty());
    }

    #[test]
    fn class_id_defaults_when_missing() {
        let d: Detection = serde_json::from_str(
            r#"{"bbox":{"left":1,"top":2,"right":3,"bottom":4},"confidence":0.5}"#,
        )
        .unwrap();
        assert_eq!(d.class_id, 0);
        assert_eq!(d.center(), Point2::new(2.0, 3.0));
    }
}
