//! Locate detected targets around the frame center in polar coordinates.
//!
//! This crate provides:
//! - the seams to the outside world: [`Detector`], [`FrameSource`] and
//!   [`FrameSink`];
//! - run configuration ([`LocateConfig`]) resolved into one operating
//!   [`Mode`] at startup;
//! - the [`MeasurementLoop`] that ties them together frame by frame;
//! - ready-made adapters in [`adapters`]: image files in, annotated PNGs
//!   out, a bright-blob detector and a detection replayer.
//!
//! The numeric core lives in `polar-locate-core` and is re-exported as
//! [`core`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use polar_locate::adapters::{build_detector, open_sink, open_source};
//! use polar_locate::{LocateConfig, MeasurementLoop, RunOutcome};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = LocateConfig {
//!     input: "frames/".into(),
//!     calibrate: Some(vec![10.0, 89.5]),
//!     ..LocateConfig::default()
//! }
//! .validate()?;
//!
//! let source = open_source(&cfg.input)?;
//! let sink = open_sink(&cfg.output)?;
//! let detector = build_detector(&cfg.detector)?;
//!
//! let mut run = MeasurementLoop::new(&cfg, source, detector, sink)?;
//! if let RunOutcome::Calibrated { focal_length, .. } = run.run() {
//!     println!("focal length: {focal_length:.4}");
//! }
//! # Ok(())
//! # }
//! ```

pub use polar_locate_core as core;

pub mod adapters;
mod config;
mod detection;
mod error;
mod frame;
mod measure;
mod mode;
mod overlay;

pub use config::{
    DetectorConfig, LocateConfig, ValidatedConfig, DEFAULT_MAX_DETECTIONS, DEFAULT_OVERLAY,
    DEFAULT_PHYSICAL_UNIT, DEFAULT_THRESHOLD, PIXEL_UNIT,
};
pub use detection::{select_detections, BoundingBox, Detection, Detector};
pub use error::{ConfigError, LocateError, StreamError};
pub use frame::{Frame, FrameSink, FrameSource};
pub use measure::{FrameReport, Measurement, MeasurementLoop, RunOutcome, Step, Throughput};
pub use mode::Mode;
pub use overlay::{draw_overlay, Label, Overlay, OverlayFlags, Segment};
