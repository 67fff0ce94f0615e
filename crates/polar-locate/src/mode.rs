use polar_locate_core::{CalibrationTarget, FocalModel};

use crate::error::ConfigError;

/// Operating mode, fixed for the lifetime of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    /// Report positions in pixels.
    Idle,
    /// Derive the focal length from a target at a known placement.
    Calibrating(CalibrationTarget),
    /// Report positions in physical units with a known focal length.
    Converting(FocalModel),
}

fn pair(name: &'static str, values: &[f64]) -> Result<[f64; 2], ConfigError> {
    match values {
        [a, b] => Ok([*a, *b]),
        _ => Err(ConfigError::BadArity {
            name,
            got: values.len(),
        }),
    }
}

impl Mode {
    /// Resolve the mode from the two optional operator inputs.
    ///
    /// `calibrate` is `[known_radius, known_distance]`, `convert` is
    /// `[focal_length, known_distance]`. Supplying both is an error.
    pub fn from_inputs(
        calibrate: Option<&[f64]>,
        convert: Option<&[f64]>,
    ) -> Result<Self, ConfigError> {
        match (calibrate, convert) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingModes),
            (Some(c), None) => {
                let [rr, d] = pair("calibrate", c)?;
                Ok(Mode::Calibrating(CalibrationTarget::new(rr, d)?))
            }
            (None, Some(c)) => {
                let [f, d] = pair("convert", c)?;
                Ok(Mode::Converting(FocalModel::new(f, d)?))
            }
            (None, None) => Ok(Mode::Idle),
        }
    }

    #[inline]
    pub fn is_calibrating(&self) -> bool {
        matches!(self, Mode::Calibrating(_))
    }
}
