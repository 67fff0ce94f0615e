//! The per-frame measurement loop.
//!
//! One iteration: capture a frame, detect, take the first `max_detections`
//! detections in detector order, measure each one around the frame center,
//! then either feed calibration or label the frame, render it and update the
//! throughput status. Frames are handled strictly one at a time.

use std::time::Instant;

use nalgebra::Point2;
use polar_locate_core::{
    to_polar, CalibrationAccumulator, CalibrationStatus, FocalModel, PolarCoord,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ValidatedConfig;
use crate::detection::{select_detections, Detector};
use crate::error::ConfigError;
use crate::frame::{Frame, FrameSink, FrameSource};
use crate::mode::Mode;
use crate::overlay::{Overlay, OverlayFlags};

/// One measured detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    /// Pixel-space position around the frame center.
    pub polar: PolarCoord,
    /// Reported radius, in `unit`.
    pub radius: f64,
    pub unit: String,
    /// `"(r unit, angle deg)"`.
    pub label: String,
    /// Detection top-left corner, where the label goes.
    pub anchor: Point2<f64>,
}

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub index: u64,
    /// Number of detections the detector returned (before capping).
    pub detected: usize,
    pub measurements: Vec<Measurement>,
    /// Calibration progress after this frame, when calibrating.
    pub calibration: Option<CalibrationStatus>,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// Source or sink stopped streaming.
    StreamEnded { frames: u64 },
    /// Calibration collected its samples.
    Calibrated {
        focal_length: f64,
        samples: Vec<f64>,
        frames: u64,
    },
}

/// Result of a single loop iteration.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// No frame this cycle; try again.
    Missed,
    Processed(FrameReport),
    /// The run is over; no frame was captured.
    Finished(RunOutcome),
}

/// Smoothed frames-per-second meter.
#[derive(Clone, Debug)]
pub struct Throughput {
    last: Option<Instant>,
    fps: f64,
    smoothing: f64,
}

impl Default for Throughput {
    fn default() -> Self {
        Self {
            last: None,
            fps: 0.0,
            smoothing: 0.9,
        }
    }
}

impl Throughput {
    /// Record a frame completed at `now` and return the current estimate.
    pub fn tick(&mut self, now: Instant) -> f64 {
        if let Some(last) = self.last.replace(now) {
            let dt = now.duration_since(last).as_secs_f64();
            if dt > 0.0 {
                let instant = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    instant
                } else {
                    self.smoothing * self.fps + (1.0 - self.smoothing) * instant
                };
            }
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn status(&self) -> String {
        format!("FPS: {:.0}", self.fps)
    }
}

enum LoopState {
    Measuring(Option<FocalModel>),
    Calibrating(CalibrationAccumulator),
}

/// Drives source, detector and sink until the stream ends or calibration
/// completes.
pub struct MeasurementLoop<S, D, K> {
    source: S,
    detector: D,
    sink: K,
    threshold: f64,
    max_detections: usize,
    overlay: OverlayFlags,
    unit: String,
    state: LoopState,
    throughput: Throughput,
    frames: u64,
}

impl<S, D, K> MeasurementLoop<S, D, K>
where
    S: FrameSource,
    D: Detector,
    K: FrameSink,
{
    pub fn new(
        config: &ValidatedConfig,
        source: S,
        detector: D,
        sink: K,
    ) -> Result<Self, ConfigError> {
        let state = match config.mode {
            Mode::Idle => LoopState::Measuring(None),
            Mode::Converting(model) => LoopState::Measuring(Some(model)),
            Mode::Calibrating(target) => LoopState::Calibrating(CalibrationAccumulator::new(
                target,
                config.calibration.clone(),
            )?),
        };
        Ok(Self {
            source,
            detector,
            sink,
            threshold: config.threshold,
            max_detections: config.max_detections,
            overlay: config.overlay,
            unit: config.radius_unit().to_string(),
            state,
            throughput: Throughput::default(),
            frames: 0,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Calibration progress, or `None` outside calibration mode.
    pub fn calibration(&self) -> Option<&CalibrationAccumulator> {
        match &self.state {
            LoopState::Calibrating(acc) => Some(acc),
            LoopState::Measuring(_) => None,
        }
    }

    /// Measure every selected detection of `frame` and build its overlay.
    ///
    /// In calibration mode each measured pixel radius becomes one sample.
    pub fn process_frame(&mut self, frame: &Frame) -> (FrameReport, Overlay) {
        let detections = match self.detector.detect(frame, self.threshold) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("frame {}: detector failed, skipping: {e}", frame.index);
                Vec::new()
            }
        };

        let center = frame.center();
        let mut overlay = Overlay::with_axes(self.overlay, frame.width(), frame.height());
        let mut measurements = Vec::new();

        for det in select_detections(&detections, self.max_detections) {
            let polar = to_polar(center, det.center());
            let radius = match &self.state {
                LoopState::Measuring(Some(model)) => model.to_physical(polar.radius),
                _ => polar.radius,
            };
            let label = format!("({radius:.2}{}, {:.2}deg)", self.unit, polar.angle_deg);

            let show_label = match &mut self.state {
                LoopState::Calibrating(acc) => {
                    acc.push_radius(polar.radius);
                    false
                }
                LoopState::Measuring(_) => true,
            };
            overlay.add_target(center, det.bbox, show_label.then(|| label.clone()));

            measurements.push(Measurement {
                polar,
                radius,
                unit: self.unit.clone(),
                label,
                anchor: det.bbox.top_left(),
            });
        }

        let calibration = self.calibration().map(|acc| acc.status());
        let report = FrameReport {
            index: frame.index,
            detected: detections.len(),
            measurements,
            calibration,
        };
        (report, overlay)
    }

    /// Run one iteration of the loop.
    ///
    /// Every captured frame comes back as [`Step::Processed`]. The end of the
    /// stream or a completed calibration is reported by the following call,
    /// and by every call after that.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn step(&mut self) -> Step {
        if let Some(outcome) = self.outcome() {
            return Step::Finished(outcome);
        }
        let frame = match self.source.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => return self.after_miss(),
            Err(e) => {
                log::warn!("frame capture failed, skipping: {e}");
                return self.after_miss();
            }
        };
        self.frames += 1;

        let (report, overlay) = self.process_frame(&frame);
        log::debug!(
            "frame {}: {} detection(s), {} measured",
            report.index,
            report.detected,
            report.measurements.len()
        );

        if let Err(e) = self.sink.render(&frame, &overlay) {
            log::warn!("frame {}: render failed: {e}", frame.index);
        }
        self.throughput.tick(Instant::now());
        self.sink.set_status(&self.throughput.status());

        Step::Processed(report)
    }

    /// Loop until the stream ends or calibration completes.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn run(&mut self) -> RunOutcome {
        loop {
            if let Step::Finished(outcome) = self.step() {
                match &outcome {
                    RunOutcome::StreamEnded { frames } => {
                        log::info!("stream ended after {frames} frame(s)");
                    }
                    RunOutcome::Calibrated {
                        focal_length,
                        samples,
                        frames,
                    } => {
                        log::info!(
                            "calibrated focal length {focal_length:.4} from {} sample(s) over {frames} frame(s)",
                            samples.len()
                        );
                    }
                }
                return outcome;
            }
        }
    }

    fn after_miss(&self) -> Step {
        match self.outcome() {
            Some(outcome) => Step::Finished(outcome),
            None => Step::Missed,
        }
    }

    /// Calibration completion takes precedence over the end of the stream.
    fn outcome(&self) -> Option<RunOutcome> {
        if let Some(outcome) = self.calibration_outcome() {
            return Some(outcome);
        }
        if !self.source.is_streaming() || !self.sink.is_streaming() {
            return Some(RunOutcome::StreamEnded {
                frames: self.frames,
            });
        }
        None
    }

    fn calibration_outcome(&self) -> Option<RunOutcome> {
        let acc = self.calibration()?;
        match acc.status() {
            CalibrationStatus::Done { focal_length } => Some(RunOutcome::Calibrated {
                focal_length,
                samples: acc.samples().to_vec(),
                frames: self.frames,
            }),
            CalibrationStatus::Collecting { .. } => None,
        }
    }
}
