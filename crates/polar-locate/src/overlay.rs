//! Per-frame annotations handed to the frame sink.
//!
//! The axes through the frame center and the measurement labels are always
//! present. [`OverlayFlags`] adds detection outlines, filled boxes and rays
//! from the center to each target.

use std::str::FromStr;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::detection::BoundingBox;
use crate::error::ConfigError;

pub const AXIS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 200, 255]);

/// Which optional annotations to draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayFlags {
    /// Detection box outlines (`lines`).
    pub outline: bool,
    /// Translucent filled boxes (`box`).
    pub fill: bool,
    /// Segment from the frame center to each target (`rays`).
    pub rays: bool,
}

impl FromStr for OverlayFlags {
    type Err = ConfigError;

    /// Parse a comma-separated list such as `lines,rays`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = OverlayFlags::default();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "lines" => flags.outline = true,
                "box" => flags.fill = true,
                "rays" => flags.rays = true,
                "none" => flags = OverlayFlags::default(),
                other => return Err(ConfigError::UnknownOverlay(other.to_string())),
            }
        }
        Ok(flags)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: Point2<f64>,
    pub to: Point2<f64>,
}

/// Text anchored at a detection's top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub anchor: Point2<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub flags: OverlayFlags,
    pub axes: Vec<Segment>,
    pub boxes: Vec<BoundingBox>,
    pub rays: Vec<Segment>,
    pub labels: Vec<Label>,
}

impl Overlay {
    /// Start an overlay for a `width x height` frame with both axes.
    pub fn with_axes(flags: OverlayFlags, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        let axes = vec![
            Segment {
                from: Point2::new(w / 2.0, 0.0),
                to: Point2::new(w / 2.0, h),
            },
            Segment {
                from: Point2::new(0.0, h / 2.0),
                to: Point2::new(w, h / 2.0),
            },
        ];
        Self {
            flags,
            axes,
            ..Self::default()
        }
    }

    pub fn add_target(&mut self, center: Point2<f64>, bbox: BoundingBox, label: Option<String>) {
        if self.flags.outline || self.flags.fill {
            self.boxes.push(bbox);
        }
        if self.flags.rays {
            self.rays.push(Segment {
                from: center,
                to: bbox.center(),
            });
        }
        if let Some(text) = label {
            self.labels.push(Label {
                text,
                anchor: bbox.top_left(),
            });
        }
    }
}

fn to_rect(b: &BoundingBox, width: u32, height: u32) -> Option<Rect> {
    let x0 = b.left.floor().max(0.0);
    let y0 = b.top.floor().max(0.0);
    let x1 = b.right.ceil().min(width as f64 - 1.0);
    let y1 = b.bottom.ceil().min(height as f64 - 1.0);
    if x1 < x0 || y1 < y0 {
        return None;
    }
    Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32 + 1, (y1 - y0) as u32 + 1))
}

fn blend_rect(img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    for y in rect.top()..=rect.bottom() {
        for x in rect.left()..=rect.right() {
            let px = img.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                px[c] = ((px[c] as u16 + color[c] as u16) / 2) as u8;
            }
        }
    }
}

fn segment(img: &mut RgbImage, s: &Segment, color: Rgb<u8>) {
    draw_line_segment_mut(
        img,
        (s.from.x as f32, s.from.y as f32),
        (s.to.x as f32, s.to.y as f32),
        color,
    );
}

/// Rasterise axes, boxes and rays into `img`. Labels are not rendered.
pub fn draw_overlay(img: &mut RgbImage, overlay: &Overlay) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    for axis in &overlay.axes {
        segment(img, axis, AXIS_COLOR);
    }
    for b in &overlay.boxes {
        let Some(rect) = to_rect(b, w, h) else {
            continue;
        };
        if overlay.flags.fill {
            blend_rect(img, rect, BOX_COLOR);
        }
        if overlay.flags.outline {
            draw_hollow_rect_mut(img, rect, BOX_COLOR);
        }
    }
    for ray in &overlay.rays {
        segment(img, ray, AXIS_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_lists() {
        assert_eq!(
            "lines".parse::<OverlayFlags>().unwrap(),
            OverlayFlags {
                outline: true,
                ..OverlayFlags::default()
            }
        );
        let all: OverlayFlags = "lines, box,RAYS".parse().unwrap();
        assert!(all.outline && all.fill && all.rays);
        assert_eq!(
            "lines,none".parse::<OverlayFlags>().unwrap(),
            OverlayFlags::default()
        );
        assert!(matches!(
            "conf".parse::<OverlayFlags>(),
            Err(ConfigError::UnknownOverlay(t)) if t == "conf"
        ));
    }

    #[test]
    fn axes_cross_at_frame_center() {
        let o = Overlay::with_axes(OverlayFlags::default(), 640, 480);
        assert_eq!(o.axes.len(), 2);
        assert_eq!(o.axes[0].from, Point2::new(320.0, 0.0));
        assert_eq!(o.axes[1].to, Point2::new(640.0, 240.0));
    }

    #[test]
    fn targets_respect_flags() {
        let bbox = BoundingBox {
            left: 10.0,
            top: 20.0,
            right: 30.0,
            bottom: 40.0,
        };
        let mut plain = Overlay::with_axes(OverlayFlags::default(), 100, 100);
        plain.add_target(Point2::new(50.0, 50.0), bbox, Some("(1.00pix, 0.00deg)".into()));
        assert!(plain.boxes.is_empty() && plain.rays.is_empty());
        assert_eq!(plain.labels[0].anchor, Point2::new(10.0, 20.0));

        let flags: OverlayFlags = "lines,rays".parse().unwrap();
        let mut full = Overlay::with_axes(flags, 100, 100);
        full.add_target(Point2::new(50.0, 50.0), bbox, None);
        assert_eq!(full.boxes.len(), 1);
        assert_eq!(full.rays[0].to, Point2::new(20.0, 30.0));
        assert!(full.labels.is_empty());
    }

    #[test]
    fn draws_axes_and_outlines() {
        let mut img = RgbImage::new(41, 31);
        let flags: OverlayFlags = "lines".parse().unwrap();
        let mut o = Overlay::with_axes(flags, 41, 31);
        o.add_target(
            Point2::new(20.5, 15.5),
            BoundingBox {
                left: 2.0,
                top: 2.0,
                right: 8.0,
                bottom: 8.0,
            },
            None,
        );
        draw_overlay(&mut img, &o);
        assert_eq!(*img.get_pixel(20, 3), AXIS_COLOR);
        assert_eq!(*img.get_pixel(35, 15), AXIS_COLOR);
        assert_eq!(*img.get_pixel(2, 5), BOX_COLOR);
        assert_eq!(*img.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_outside_the_frame_are_skipped() {
        let mut img = RgbImage::new(10, 10);
        let flags: OverlayFlags = "lines,box".parse().unwrap();
        let mut o = Overlay::with_axes(flags, 10, 10);
        o.boxes.push(BoundingBox {
            left: 50.0,
            top: 50.0,
            right: 60.0,
            bottom: 60.0,
        });
        draw_overlay(&mut img, &o);
    }
}
