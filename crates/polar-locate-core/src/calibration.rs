//! Focal-length calibration from repeated observations.
//!
//! The accumulator collects one focal-length estimate per observed target
//! radius and finalizes once [`CalibrationParams::sample_count`] estimates
//! are in. Frames without a detection simply contribute nothing.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::units::CalibrationTarget;

/// Number of estimates collected before calibration finalizes.
pub const DEFAULT_SAMPLE_COUNT: usize = 10;

/// How the collected estimates are reduced to one focal length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Arithmetic mean of all samples.
    #[default]
    Mean,
    /// Middle sample (mean of the two middle samples for even counts).
    Median,
}

impl Reduction {
    /// Reduce a non-empty slice. Returns `None` for an empty slice.
    pub fn apply(self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        match self {
            Reduction::Mean => Some(samples.iter().sum::<f64>() / samples.len() as f64),
            Reduction::Median => {
                let mut sorted = samples.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 1 {
                    Some(sorted[mid])
                } else {
                    Some(0.5 * (sorted[mid - 1] + sorted[mid]))
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub sample_count: usize,
    pub reduction: Reduction,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            reduction: Reduction::Mean,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("calibration sample count must be at least 1")]
    ZeroSampleCount,
    #[error("calibration not finished ({collected}/{required} samples)")]
    NotFinished { collected: usize, required: usize },
}

/// Where the accumulator is after a push.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationStatus {
    Collecting { collected: usize, required: usize },
    Done { focal_length: f64 },
}

impl CalibrationStatus {
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, CalibrationStatus::Done { .. })
    }
}

/// Calibration state: the known target placement plus the estimates so far.
#[derive(Clone, Debug)]
pub struct CalibrationAccumulator {
    target: CalibrationTarget,
    params: CalibrationParams,
    samples: Vec<f64>,
    result: Option<f64>,
}

impl CalibrationAccumulator {
    pub fn new(
        target: CalibrationTarget,
        params: CalibrationParams,
    ) -> Result<Self, CalibrationError> {
        if params.sample_count == 0 {
            return Err(CalibrationError::ZeroSampleCount);
        }
        Ok(Self {
            target,
            samples: Vec::with_capacity(params.sample_count),
            params,
            result: None,
        })
    }

    pub fn target(&self) -> &CalibrationTarget {
        &self.target
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Estimates collected so far, in arrival order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn status(&self) -> CalibrationStatus {
        match self.result {
            Some(focal_length) => CalibrationStatus::Done { focal_length },
            None => CalibrationStatus::Collecting {
                collected: self.samples.len(),
                required: self.params.sample_count,
            },
        }
    }

    /// Record one observed pixel radius.
    ///
    /// Once done, further observations are ignored and the final status is
    /// returned unchanged.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn push_radius(&mut self, pixel_radius: f64) -> CalibrationStatus {
        if self.result.is_some() {
            return self.status();
        }
        let f = self.target.estimate(pixel_radius);
        self.samples.push(f);
        log::debug!(
            "calibration sample {}/{}: r={:.3}px f={:.4}",
            self.samples.len(),
            self.params.sample_count,
            pixel_radius,
            f
        );
        if self.samples.len() >= self.params.sample_count {
            self.result = self.params.reduction.apply(&self.samples);
        }
        self.status()
    }

    /// The final focal length, available once done.
    pub fn focal_length(&self) -> Result<f64, CalibrationError> {
        self.result.ok_or(CalibrationError::NotFinished {
            collected: self.samples.len(),
            required: self.params.sample_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn target() -> CalibrationTarget {
        CalibrationTarget::new(10.0, 89.5).expect("target")
    }

    #[test]
    fn constant_observations_finish_on_tenth_sample() {
        let mut acc = CalibrationAccumulator::new(target(), CalibrationParams::default()).unwrap();
        for i in 1..10 {
            assert_eq!(
                acc.push_radius(500.0),
                CalibrationStatus::Collecting {
                    collected: i,
                    required: 10
                }
            );
        }
        let CalibrationStatus::Done { focal_length } = acc.push_radius(500.0) else {
            panic!("expected done after 10 samples");
        };
        assert_relative_eq!(focal_length, 500.0 / (10.0 / 89.5), max_relative = 1e-12);
        assert_eq!(acc.samples().len(), 10);
    }

    #[test]
    fn pushes_after_done_are_ignored() {
        let params = CalibrationParams {
            sample_count: 2,
            ..CalibrationParams::default()
        };
        let mut acc = CalibrationAccumulator::new(target(), params).unwrap();
        acc.push_radius(100.0);
        let done = acc.push_radius(300.0);
        assert_eq!(acc.push_radius(10_000.0), done);
        assert_eq!(acc.samples().len(), 2);
        assert_relative_eq!(
            acc.focal_length().unwrap(),
            200.0 * 8.95,
            max_relative = 1e-12
        );
    }

    #[test]
    fn focal_length_before_done_is_an_error() {
        let mut acc = CalibrationAccumulator::new(target(), CalibrationParams::default()).unwrap();
        acc.push_radius(1.0);
        assert_eq!(
            acc.focal_length(),
            Err(CalibrationError::NotFinished {
                collected: 1,
                required: 10
            })
        );
    }

    #[test]
    fn zero_sample_count_is_rejected() {
        let params = CalibrationParams {
            sample_count: 0,
            ..CalibrationParams::default()
        };
        assert_eq!(
            CalibrationAccumulator::new(target(), params).unwrap_err(),
            CalibrationError::ZeroSampleCount
        );
    }

    #[test]
    fn reductions() {
        assert_eq!(Reduction::Mean.apply(&[]), None);
        assert_relative_eq!(Reduction::Mean.apply(&[1.0, 2.0, 6.0]).unwrap(), 3.0);
        assert_relative_eq!(Reduction::Median.apply(&[9.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_relative_eq!(
            Reduction::Median.apply(&[4.0, 1.0, 100.0, 2.0]).unwrap(),
            3.0
        );
    }

    #[test]
    fn median_ignores_a_single_outlier() {
        let params = CalibrationParams {
            sample_count: 5,
            reduction: Reduction::Median,
        };
        let mut acc = CalibrationAccumulator::new(target(), params).unwrap();
        for r in [500.0, 500.0, 5_000.0, 500.0, 500.0] {
            acc.push_radius(r);
        }
        assert_relative_eq!(acc.focal_length().unwrap(), target().estimate(500.0));
    }
}
