//! Pixel to physical radius conversion.
//!
//! Both directions share the linear model `physical = pixel / f * d`, where
//! `f` is an empirical focal-length constant and `d` the camera-to-origin
//! distance. Physical values come out in whatever unit `d` is given in.

use serde::{Deserialize, Serialize};

/// Invalid input to the unit model.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum UnitModelError {
    #[error("focal length must be non-zero")]
    ZeroFocalLength,
    #[error("known radius must be non-zero")]
    ZeroKnownRadius,
    #[error("known distance must be non-zero")]
    ZeroKnownDistance,
    #[error("{name} must be positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be finite (got {value})")]
    NonFinite { name: &'static str, value: f64 },
}

/// Accept finite, strictly positive values. Zero maps to `zero`.
fn positive(name: &'static str, value: f64, zero: UnitModelError) -> Result<f64, UnitModelError> {
    if !value.is_finite() {
        return Err(UnitModelError::NonFinite { name, value });
    }
    if value == 0.0 {
        return Err(zero);
    }
    if value < 0.0 {
        return Err(UnitModelError::NonPositive { name, value });
    }
    Ok(value)
}

/// Convert a pixel radius into physical units: `pixel_radius / f * d`.
pub fn to_physical(pixel_radius: f64, f: f64, d: f64) -> Result<f64, UnitModelError> {
    Ok(FocalModel::new(f, d)?.to_physical(pixel_radius))
}

/// Solve the model for `f` from one observation of a target whose physical
/// offset from the origin (`known_radius`) and camera distance
/// (`known_distance`) are known.
pub fn estimate_focal_length(
    pixel_radius: f64,
    known_radius: f64,
    known_distance: f64,
) -> Result<f64, UnitModelError> {
    Ok(CalibrationTarget::new(known_radius, known_distance)?.estimate(pixel_radius))
}

/// A validated `(f, d)` pair for measurement-mode conversion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct FocalModel {
    focal_length: f64,
    distance: f64,
}

impl FocalModel {
    pub fn new(focal_length: f64, distance: f64) -> Result<Self, UnitModelError> {
        Ok(Self {
            focal_length: positive("focal length", focal_length, UnitModelError::ZeroFocalLength)?,
            distance: positive("distance", distance, UnitModelError::ZeroKnownDistance)?,
        })
    }

    #[inline]
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Infallible once constructed.
    #[inline]
    pub fn to_physical(&self, pixel_radius: f64) -> f64 {
        pixel_radius / self.focal_length * self.distance
    }
}

impl TryFrom<[f64; 2]> for FocalModel {
    type Error = UnitModelError;

    fn try_from([f, d]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(f, d)
    }
}

impl From<FocalModel> for [f64; 2] {
    fn from(m: FocalModel) -> Self {
        [m.focal_length, m.distance]
    }
}

/// Known placement of the calibration target: offset `known_radius` from
/// the origin, with the origin `known_distance` away from the camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct CalibrationTarget {
    known_radius: f64,
    known_distance: f64,
}

impl CalibrationTarget {
    pub fn new(known_radius: f64, known_distance: f64) -> Result<Self, UnitModelError> {
        Ok(Self {
            known_radius: positive(
                "known radius",
                known_radius,
                UnitModelError::ZeroKnownRadius,
            )?,
            known_distance: positive(
                "known distance",
                known_distance,
                UnitModelError::ZeroKnownDistance,
            )?,
        })
    }

    #[inline]
    pub fn known_radius(&self) -> f64 {
        self.known_radius
    }

    #[inline]
    pub fn known_distance(&self) -> f64 {
        self.known_distance
    }

    /// Focal-length estimate for one observed pixel radius.
    #[inline]
    pub fn estimate(&self, pixel_radius: f64) -> f64 {
        pixel_radius / (self.known_radius / self.known_distance)
    }

    /// Model that converts back to physical units at this target's distance.
    pub fn model_for(&self, focal_length: f64) -> Result<FocalModel, UnitModelError> {
        FocalModel::new(focal_length, self.known_distance)
    }
}

impl TryFrom<[f64; 2]> for CalibrationTarget {
    type Error = UnitModelError;

    fn try_from([rr, d]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(rr, d)
    }
}

impl From<CalibrationTarget> for [f64; 2] {
    fn from(t: CalibrationTarget) -> Self {
        [t.known_radius, t.known_distance]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn physical_conversion_is_linear() {
        assert_relative_eq!(to_physical(1170.7599, 1170.7599, 89.5).unwrap(), 89.5);
        assert_relative_eq!(to_physical(500.0, 1000.0, 80.0).unwrap(), 40.0);
        assert_relative_eq!(to_physical(0.0, 1000.0, 80.0).unwrap(), 0.0);
    }

    #[test]
    fn estimate_then_convert_returns_known_radius() {
        for (r, rr, d) in [
            (500.0, 10.0, 89.5),
            (12.25, 3.0, 40.0),
            (1e4, 0.5, 250.0),
        ] {
            let f = estimate_focal_length(r, rr, d).unwrap();
            assert_relative_eq!(to_physical(r, f, d).unwrap(), rr, max_relative = 1e-12);
        }
    }

    #[test]
    fn zero_divisors_are_rejected() {
        assert_eq!(
            to_physical(10.0, 0.0, 89.5),
            Err(UnitModelError::ZeroFocalLength)
        );
        assert_eq!(
            estimate_focal_length(10.0, 0.0, 89.5),
            Err(UnitModelError::ZeroKnownRadius)
        );
        assert_eq!(
            estimate_focal_length(10.0, 5.0, 0.0),
            Err(UnitModelError::ZeroKnownDistance)
        );
        assert!(matches!(
            to_physical(10.0, f64::NAN, 1.0),
            Err(UnitModelError::NonFinite { .. })
        ));
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert_eq!(
            FocalModel::new(-1000.0, 80.0),
            Err(UnitModelError::NonPositive {
                name: "focal length",
                value: -1000.0
            })
        );
        assert!(matches!(
            FocalModel::new(1000.0, -80.0),
            Err(UnitModelError::NonPositive { name: "distance", .. })
        ));
        assert!(matches!(
            CalibrationTarget::new(-7.0, 60.0),
            Err(UnitModelError::NonPositive { name: "known radius", .. })
        ));
        assert!(matches!(
            estimate_focal_length(73.0, 7.0, -60.0),
            Err(UnitModelError::NonPositive { .. })
        ));
        assert!(to_physical(500.0, -1000.0, 80.0).is_err());
        assert!(serde_json::from_str::<FocalModel>("[-1000.0, 80.0]").is_err());
    }

    #[test]
    fn validated_types_match_free_functions() {
        let target = CalibrationTarget::new(10.0, 89.5).unwrap();
        let f = target.estimate(500.0);
        assert_relative_eq!(f, estimate_focal_length(500.0, 10.0, 89.5).unwrap());

        let model = target.model_for(f).unwrap();
        assert_relative_eq!(model.to_physical(500.0), 10.0, max_relative = 1e-12);
        assert_relative_eq!(model.distance(), 89.5);
    }

    #[test]
    fn serde_goes_through_validation() {
        let model: FocalModel = serde_json::from_str("[1170.7599, 89.5]").unwrap();
        assert_relative_eq!(model.focal_length(), 1170.7599);
        assert_eq!(serde_json::to_string(&model).unwrap(), "[1170.7599,89.5]");

        assert!(serde_json::from_str::<FocalModel>("[0.0, 89.5]").is_err());
        assert!(serde_json::from_str::<CalibrationTarget>("[0.0, 89.5]").is_err());
        assert!(serde_json::from_str::<CalibrationTarget>("[10.0]").is_err());
    }
}
