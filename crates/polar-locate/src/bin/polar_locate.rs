use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use polar_locate::adapters::{build_detector, open_sink, open_source};
use polar_locate::core::Reduction;
use polar_locate::{ConfigError, LocateConfig, LocateError, MeasurementLoop, Mode, RunOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "polar-locate",
    version,
    about = "Locate toy balls in frames as (distance, bearing) from the frame center"
)]
struct Cli {
    /// Input stream: an image file or a directory of frames.
    input: Option<String>,

    /// Output stream: a directory for annotated frames, or `null://`.
    output: Option<String>,

    /// JSON config file; command-line flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detection confidence threshold.
    #[arg(long)]
    threshold: Option<f64>,

    /// Overlay flags: comma-separated `lines`, `box`, `rays` or `none`.
    #[arg(long)]
    overlay: Option<String>,

    /// Number of detections to measure per frame.
    #[arg(long)]
    nbox: Option<usize>,

    /// Calibrate: distance from the target to the origin, and from the origin to the camera.
    #[arg(long, alias = "calib1", num_args = 2, value_names = ["RADIUS", "DISTANCE"])]
    calibrate: Option<Vec<f64>>,

    /// Convert to physical units: focal length, and distance from the origin to the camera.
    #[arg(long, alias = "calib2", num_args = 2, value_names = ["FOCAL", "DISTANCE"])]
    focal: Option<Vec<f64>>,

    /// Focal-length samples to collect before calibration finishes.
    #[arg(long)]
    samples: Option<usize>,

    /// How calibration samples are combined.
    #[arg(long, value_enum)]
    reduction: Option<ReductionArg>,

    /// Detector: `blob` or `replay:<detections.json>`.
    #[arg(long)]
    detector: Option<String>,

    /// Unit label for converted distances.
    #[arg(long)]
    unit: Option<String>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Emit JSON log lines (needs the `tracing` feature).
    #[arg(long)]
    json_log: bool,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse::<LevelFilter>()
        .map_err(|_| "expected one of off, error, warn, info, debug, trace".to_string())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReductionArg {
    Mean,
    Median,
}

impl From<ReductionArg> for Reduction {
    fn from(r: ReductionArg) -> Self {
        match r {
            ReductionArg::Mean => Reduction::Mean,
            ReductionArg::Median => Reduction::Median,
        }
    }
}

impl Cli {
    fn into_config(self) -> Result<LocateConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => LocateConfig::from_json_file(path)?,
            None => LocateConfig::default(),
        };
        if let Some(input) = self.input {
            cfg.input = input;
        }
        if let Some(output) = self.output {
            cfg.output = output;
        }
        if let Some(threshold) = self.threshold {
            cfg.threshold = threshold;
        }
        if let Some(overlay) = self.overlay {
            cfg.overlay = overlay;
        }
        if let Some(nbox) = self.nbox {
            cfg.max_detections = nbox;
        }
        if self.calibrate.is_some() {
            cfg.calibrate = self.calibrate;
        }
        if self.focal.is_some() {
            cfg.convert = self.focal;
        }
        if let Some(samples) = self.samples {
            cfg.calibration.sample_count = samples;
        }
        if let Some(reduction) = self.reduction {
            cfg.calibration.reduction = reduction.into();
        }
        if let Some(detector) = self.detector {
            cfg.detector = detector.parse()?;
        }
        if let Some(unit) = self.unit {
            cfg.physical_unit = unit;
        }
        Ok(cfg)
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let installed = env_logger::Builder::new()
        .filter_level(cli.log_level)
        .format_timestamp_millis()
        .format_target(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("failed to install logger: {e}");
    }
    if cli.json_log {
        log::warn!("--json-log needs the `tracing` feature; writing plain log lines");
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_string().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let installed = if cli.json_log {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = installed {
        eprintln!("failed to install tracing subscriber: {e}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(cli)))]
fn run(cli: Cli) -> Result<(), LocateError> {
    let cfg = cli.into_config()?.validate()?;

    let banner = "-".repeat(10);
    match cfg.mode {
        Mode::Calibrating(_) => println!(
            "{banner} Calibrating the camera for {} iteration {banner}",
            cfg.calibration.sample_count
        ),
        Mode::Converting(_) => println!("{banner} Using focal length {banner}"),
        Mode::Idle => {}
    }

    let source = open_source(&cfg.input)?;
    let sink = open_sink(&cfg.output)?;
    let detector = build_detector(&cfg.detector)?;

    let mut measurement = MeasurementLoop::new(&cfg, source, detector, sink)?;
    match measurement.run() {
        RunOutcome::Calibrated { focal_length, .. } => {
            println!("{banner} Calibration done with focal length: {focal_length:.4} {banner}");
        }
        RunOutcome::StreamEnded { frames } => {
            if cfg.mode.is_calibrating() {
                let collected = measurement
                    .calibration()
                    .map(|acc| acc.samples().len())
                    .unwrap_or(0);
                log::warn!(
                    "stream ended after {frames} frame(s) with {collected}/{} calibration samples",
                    cfg.calibration.sample_count
                );
            }
        }
    }
    Ok(())
}
