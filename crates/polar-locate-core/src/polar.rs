use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Position relative to an origin: distance and bearing.
///
/// `angle_deg` follows the mathematical convention (counter-clockwise from
/// the +x axis, "up" positive) and lies in `(-180, 180]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolarCoord {
    pub radius: f64,
    pub angle_deg: f64,
}

/// Convert `target` to polar coordinates around `center`.
///
/// Both points live in image-pixel space (origin top-left, y down). The y
/// difference is flipped so that a target above the center has a positive
/// angle. When `center == target` the radius is `0` and the angle is `0`.
#[inline]
pub fn to_polar(center: Point2<f64>, target: Point2<f64>) -> PolarCoord {
    let nx = target.x - center.x;
    let ny = center.y - target.y;
    let radius = nx.hypot(ny);
    let mut angle_deg = ny.atan2(nx).to_degrees();
    // atan2(-0.0, x<0) lands on -180; fold it onto the closed end.
    if angle_deg <= -180.0 {
        angle_deg += 360.0;
    }
    PolarCoord { radius, angle_deg }
}

/// Center of a `width x height` frame in pixel coordinates.
#[inline]
pub fn frame_center(width: u32, height: u32) -> Point2<f64> {
    Point2::new(width as f64 / 2.0, height as f64 / 2.0)
}
