//! Live photometry on captured frames.
//!
//! [`LivePhotometry`] measures a source circle and a background rectangle on
//! every frame, converts the numbers to the selected unit and keeps a
//! bounded history of net counts for plotting. Changing the unit or toggling
//! plotting starts a fresh history, since mixed units cannot share an axis.
//!
//! [`run_live`] wires it to a camera through a [`CaptureLoop`].

use std::sync::Arc;

use anyhow::{Context, Result};
use roi_camera::{Camera, CameraProperties, CaptureLoop, CaptureSummary, CapturedFrame};
use roi_core::{
    Frame, MeasurementHistory, PhotometryReport, Region, RegionShape, RoiResult, UnitConversion,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::config::ScopeConfig;
use crate::storage::{MeasurementLog, MeasurementRecord};

/// Per-frame source and background photometry.
#[derive(Debug, Clone)]
pub struct LivePhotometry {
    source: Region,
    background: Region,
    units: UnitConversion,
    plot_net: bool,
    history: MeasurementHistory,
}

impl LivePhotometry {
    /// Measure `source` against `background`.
    pub fn new(
        source: Region,
        background: Region,
        units: UnitConversion,
        plot_net: bool,
        history_capacity: usize,
    ) -> RoiResult<Self> {
        units.validate()?;
        Ok(Self {
            source,
            background,
            units,
            plot_net,
            history: MeasurementHistory::new(history_capacity),
        })
    }

    /// Default layout for a camera: centred circle, background square in the
    /// bottom-right corner, conversion gain taken from the sensor.
    pub fn for_camera(properties: &CameraProperties, config: &ScopeConfig) -> RoiResult<Self> {
        let (w, h) = (properties.width, properties.height);
        let source = Region::centered_in(RegionShape::Circle, w, h, config.regions.source_size)?
            .clamped_to(w, h);
        let size = config.regions.background_size;
        let background = Region::rectangle(0.0, 0.0, size, size)?
            .anchored_bottom_right(w, h)
            .clamped_to(w, h);
        let units = UnitConversion {
            electrons_per_adu: properties.electrons_per_adu,
            ..config.analysis.units
        };
        Self::new(
            source,
            background,
            units,
            config.analysis.plot_net,
            config.analysis.history_capacity,
        )
    }

    /// Measure one frame, recording net counts when plotting is on.
    pub fn process(&mut self, frame: &Frame) -> PhotometryReport {
        let source_pixels = self.source.extract(frame);
        let background_pixels = self.background.extract(frame);
        let radius = self
            .source
            .radius()
            .unwrap_or_else(|| self.source.width.min(self.source.height) / 2.0);

        let report =
            PhotometryReport::measure(&source_pixels, radius, &background_pixels, &self.units);
        if self.plot_net {
            self.history.push(report.net);
        }
        report
    }

    /// Switch units; the history restarts when the unit label changes.
    pub fn set_units(&mut self, units: UnitConversion) -> RoiResult<()> {
        units.validate()?;
        if units.label() != self.units.label() {
            debug!(from = self.units.label(), to = units.label(), "Unit changed, resetting history");
            self.history.reset();
        }
        self.units = units;
        Ok(())
    }

    /// Follow a camera exposure change for rate units.
    pub fn set_exposure(&mut self, seconds: f64) -> RoiResult<()> {
        self.set_units(UnitConversion {
            exposure_s: seconds,
            ..self.units
        })
    }

    /// Turn net count recording on or off; either way the history restarts.
    pub fn set_plot_net(&mut self, enabled: bool) {
        if enabled != self.plot_net {
            self.history.reset();
            self.plot_net = enabled;
        }
    }

    /// Move the source region.
    pub fn move_source(&mut self, region: Region) {
        self.source = region;
    }

    /// Move the background region.
    pub fn move_background(&mut self, region: Region) {
        self.background = region;
    }

    /// Source region.
    pub fn source(&self) -> &Region {
        &self.source
    }

    /// Background region.
    pub fn background(&self) -> &Region {
        &self.background
    }

    /// Active unit conversion.
    pub fn units(&self) -> &UnitConversion {
        &self.units
    }

    /// Recorded net counts.
    pub fn history(&self) -> &MeasurementHistory {
        &self.history
    }
}

/// How long to run and where to record.
#[derive(Debug, Default)]
pub struct LiveOptions {
    /// Stop after this many processed frames; run until Ctrl-C otherwise
    pub frames: Option<u64>,
    /// CSV log receiving one row per processed frame
    pub log: Option<MeasurementLog>,
}

/// Outcome of a live run.
#[derive(Debug, Clone)]
pub struct LiveSummary {
    /// Frames measured
    pub processed: u64,
    /// Frames skipped because measurement fell behind capture
    pub skipped: u64,
    /// Capture loop totals
    pub capture: CaptureSummary,
    /// Net counts recorded for plotting
    pub history: Vec<f64>,
}

/// Capture from `camera` and measure every frame until done or interrupted.
///
/// `on_report` is called for each measured frame.
pub async fn run_live<F>(
    camera: Arc<dyn Camera>,
    config: &ScopeConfig,
    mut options: LiveOptions,
    mut on_report: F,
) -> Result<LiveSummary>
where
    F: FnMut(&CapturedFrame, &PhotometryReport),
{
    let mut photometry = LivePhotometry::for_camera(&camera.properties(), config)
        .context("Invalid photometry settings")?;
    photometry.set_exposure(camera.exposure().await?)?;

    let capture = CaptureLoop::spawn(Arc::clone(&camera), config.camera.capture_buffer).await?;
    let mut frames = capture.subscribe();
    info!(limit = ?options.frames, unit = photometry.units().label(), "Live photometry started");

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let (mut processed, mut skipped) = (0u64, 0u64);
    while options.frames.map_or(true, |limit| processed < limit) {
        let captured = tokio::select! {
            _ = &mut interrupt => {
                info!("Interrupted, stopping capture");
                break;
            }
            received = frames.recv() => received,
        };

        match captured {
            Ok(captured) => {
                let report = photometry.process(&captured.frame);
                processed += 1;
                if let Some(log) = options.log.as_mut() {
                    log.append(&MeasurementRecord::from_report(
                        captured.sequence,
                        captured.captured_at,
                        &report,
                    ))?;
                }
                on_report(&captured, &report);
            }
            Err(RecvError::Lagged(n)) => {
                skipped += n;
                warn!(skipped = n, "Photometry fell behind capture, frames dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }

    let capture = capture.stop().await?;
    if let Some(log) = options.log.as_mut() {
        log.flush()?;
    }
    info!(processed, skipped, "Live photometry finished");

    Ok(LiveSummary {
        processed,
        skipped,
        capture,
        history: photometry.history().values(),
    })
}
