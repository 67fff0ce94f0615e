//! Polar measurement and focal-length calibration for detected targets.
//!
//! This crate is purely numeric. It knows nothing about images, detectors
//! or video streams; callers hand it pixel coordinates.
//!
//! ```
//! use nalgebra::Point2;
//! use polar_locate_core::{to_polar, FocalModel};
//!
//! let polar = to_polar(Point2::new(100.0, 100.0), Point2::new(100.0, 50.0));
//! assert_eq!(polar.radius, 50.0);
//! assert!((polar.angle_deg - 90.0).abs() < 1e-9);
//!
//! let model = FocalModel::new(1170.7599, 89.5).unwrap();
//! let cm = model.to_physical(polar.radius);
//! assert!(cm > 3.8 && cm < 3.9);
//! ```

mod calibration;
mod polar;
mod units;

pub use calibration::{
    CalibrationAccumulator, CalibrationError, CalibrationParams, CalibrationStatus, Reduction,
    DEFAULT_SAMPLE_COUNT,
};
pub use polar::{frame_center, to_polar, PolarCoord};
pub use units::{
    estimate_focal_length, to_physical, CalibrationTarget, FocalModel, UnitModelError,
};
