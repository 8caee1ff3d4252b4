//! CLI entry point for roi-scope
//!
//! ```bash
//! # Live photometry on the mock camera, 50 frames, logged to CSV
//! roi-scope live --frames 50 --plot --log-dir data
//!
//! # Enclosed energy of a frame file with background subtraction
//! roi-scope analyze frame.csv --source-size 80 --subtract-background
//! ```

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use roi_camera::{Camera, ExposureControl, GainControl, MockCamera};
use roi_core::PhotometryReport;
use roi_scope::config::{ScopeConfig, DEFAULT_CONFIG_PATH};
use roi_scope::live::{run_live, LiveOptions};
use roi_scope::loader::load_csv_frame;
use roi_scope::session::{AnalysisSession, DisplaySink};
use roi_scope::storage::MeasurementLog;
use roi_scope::telemetry::{self, LogFormat, TracingConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "roi-scope")]
#[command(about = "Region-of-interest photometry for camera frames", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Log span open/close events
    #[arg(long, global = true)]
    log_spans: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture from the camera and measure every frame
    Live {
        /// Stop after this many frames (default: until Ctrl-C)
        #[arg(long)]
        frames: Option<u64>,

        /// Exposure in seconds (0-100)
        #[arg(long)]
        exposure: Option<String>,

        /// Analogue gain (0-300)
        #[arg(long)]
        gain: Option<String>,

        /// Report electrons instead of counts
        #[arg(long)]
        electrons: bool,

        /// Report rates (divide by exposure)
        #[arg(long)]
        per_second: bool,

        /// Record net counts for plotting
        #[arg(long)]
        plot: bool,

        /// Directory for a CSV measurement log
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Measure enclosed energy on a frame file
    Analyze {
        /// Frame as CSV (one image row per line)
        frame: PathBuf,

        /// Source circle diameter in pixels (0-400)
        #[arg(long)]
        source_size: Option<String>,

        /// Move the source circle's bounding box to X,Y
        #[arg(long, value_delimiter = ',', num_args = 2)]
        source_at: Option<Vec<f64>>,

        /// Move the background square's bounding box to X,Y
        #[arg(long, value_delimiter = ',', num_args = 2)]
        background_at: Option<Vec<f64>>,

        /// Subtract the background mean before measuring
        #[arg(long)]
        subtract_background: bool,

        /// Swap rows and columns of the loaded frame
        #[arg(long)]
        transpose: bool,
    },
}

/// Prints readouts to stdout.
struct StdoutSink;

impl DisplaySink for StdoutSink {
    fn show_enclosed_energy(&self, text: &str) {
        println!("Energy enclosed: {text}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ScopeConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.application.log_format = format;
    }
    config.validate().map_err(|e| anyhow!(e))?;
    let tracing_config = TracingConfig::from_config(&config)
        .map_err(|e| anyhow!(e))?
        .with_span_events(cli.log_spans)
        .with_ansi(!cli.no_color);
    telemetry::init(tracing_config).map_err(|e| anyhow!(e))?;
    info!(name = %config.application.name, "Starting");

    match cli.command {
        Commands::Live {
            frames,
            exposure,
            gain,
            electrons,
            per_second,
            plot,
            log_dir,
        } => {
            config.analysis.units.use_electrons |= electrons;
            config.analysis.units.per_second |= per_second;
            config.analysis.plot_net |= plot;
            live(config, frames, exposure, gain, log_dir).await
        }
        Commands::Analyze {
            frame,
            source_size,
            source_at,
            background_at,
            subtract_background,
            transpose,
        } => {
            let request = AnalyzeRequest {
                source_size,
                source_at,
                background_at,
                subtract_background,
                transpose,
            };
            analyze(config, frame, request).await
        }
    }
}

async fn live(
    config: ScopeConfig,
    frames: Option<u64>,
    exposure: Option<String>,
    gain: Option<String>,
    log_dir: Option<PathBuf>,
) -> Result<()> {
    let mock = config.camera.mock_config().map_err(|e| anyhow!(e))?;
    let camera: Arc<dyn Camera> = Arc::new(MockCamera::new(mock)?);

    let mut exposure_control = ExposureControl::new(camera.exposure().await?)?;
    if let Some(text) = exposure {
        let requested = exposure_control.set_text(&text)?;
        exposure_control.sync(camera.set_exposure(requested).await?);
    }
    let mut gain_control = GainControl::new(camera.gain().await?);
    if let Some(text) = gain {
        let requested = gain_control.set_text(&text)?;
        camera.set_gain(requested).await?;
    }
    info!(
        exposure_s = exposure_control.seconds(),
        timeout_ms = exposure_control.capture_timeout().as_millis() as u64,
        gain = camera.gain().await?,
        "Camera configured"
    );

    let log = log_dir.map(MeasurementLog::create_in).transpose()?;
    let options = LiveOptions { frames, log };
    let summary = run_live(camera, &config, options, |captured, report| {
        println!("Frame {}", captured.sequence);
        print_report(report);
    })
    .await?;

    println!(
        "Processed {} frames ({} skipped, {} capture errors)",
        summary.processed, summary.skipped, summary.capture.errors
    );
    if !summary.history.is_empty() {
        let net: Vec<String> = summary.history.iter().map(|v| format!("{v:.3e}")).collect();
        println!("Net history: {}", net.join(", "));
    }
    Ok(())
}

struct AnalyzeRequest {
    source_size: Option<String>,
    source_at: Option<Vec<f64>>,
    background_at: Option<Vec<f64>>,
    subtract_background: bool,
    transpose: bool,
}

async fn analyze(config: ScopeConfig, path: PathBuf, request: AnalyzeRequest) -> Result<()> {
    let mut frame = load_csv_frame(&path)?;
    if request.transpose {
        frame = frame.transposed();
    }
    let frame = frame.into_shared();
    let session = AnalysisSession::new(
        tokio::runtime::Handle::current(),
        config.regions,
        Arc::new(StdoutSink),
    );
    session.load_frame(Arc::clone(&frame))?;

    if let Some(text) = request.source_size {
        session.set_source_size_text(&text)?;
    }
    if let (Some(source), Some(at)) = (session.source(), request.source_at) {
        session.move_source(source.moved_to(at[0], at[1])?)?;
    }
    if let (Some(background), Some(at)) = (session.background_region(), request.background_at) {
        session.move_background(background.moved_to(at[0], at[1])?)?;
    }
    if request.subtract_background {
        let level = session.commit_background()?;
        println!("Background level: {level:.4}");
    }
    session.idle().await;

    // Full photometry on the displayed frame for reference
    let displayed = session.displayed_frame().unwrap_or(frame);
    if let (Some(source), Some(background)) = (session.source(), session.background_region()) {
        let radius = source.radius().unwrap_or(source.width / 2.0);
        let report = PhotometryReport::measure(
            &source.extract(&displayed),
            radius,
            &background.extract(&displayed),
            &config.analysis.units,
        );
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &PhotometryReport) {
    for line in report.lines() {
        println!("  {line}");
    }
}
