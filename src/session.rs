//! Enclosed-energy analysis session.
//!
//! [`AnalysisSession`] is the headless counterpart of the viewer window: it
//! owns the loaded frame (through a [`BackgroundSubtractor`]), the source
//! circle and the background rectangle. Every user action that can change the
//! enclosed-energy readout goes through the single-flight
//! [`RegionProcessor`], so a burst of region drags costs at most one running
//! integration plus one replay against the latest state.
//!
//! Results are formatted as `"<fraction> (<sum>/<total>)"` and handed to a
//! [`DisplaySink`].
//!
//! ## Threading
//!
//! Session methods may be called from any thread. State lives behind a
//! `parking_lot::RwLock`; the processor's sampler takes a read lock to
//! snapshot the current region and displayed frame, so a replay always sees
//! the newest state.

use std::sync::Arc;

use parking_lot::RwLock;
use roi_core::{
    parse_bounded_u32, BackgroundState, BackgroundSubtractor, Frame, Region, RegionShape, RoiError,
};
use roi_processor::{region_processor, RegionJob, RegionProcessor, RequestOutcome};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::{RegionsConfig, MAX_SOURCE_SIZE};

/// Receives formatted enclosed-energy results.
pub trait DisplaySink: Send + Sync + 'static {
    /// Show a new readout, e.g. `"0.25 (250/1000)"`.
    fn show_enclosed_energy(&self, text: &str);
}

/// Errors from session operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// An operation needs a frame but none has been loaded.
    #[error("No frame loaded")]
    NoFrame,

    /// Input rejected by the region primitives.
    #[error(transparent)]
    Roi(#[from] RoiError),
}

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone)]
struct SessionState {
    background: BackgroundSubtractor,
    source: Region,
    background_region: Region,
    total: f64,
}

impl SessionState {
    fn job(&self) -> RegionJob {
        RegionJob {
            region: self.source,
            frame: Arc::clone(self.background.displayed()),
            frame_total: self.total,
        }
    }

    fn refresh_total(&mut self) {
        self.total = self.background.displayed().total();
    }

    /// Keep both regions inside the displayed frame.
    fn clamp_regions(&mut self) {
        let (w, h) = {
            let frame = self.background.displayed();
            (frame.width, frame.height)
        };
        self.source = self.source.clamped_to(w, h);
        self.background_region = self.background_region.clamped_to(w, h);
    }
}

/// Interactive enclosed-energy measurement over one frame at a time.
pub struct AnalysisSession {
    state: Arc<RwLock<Option<SessionState>>>,
    processor: RegionProcessor,
    regions: RegionsConfig,
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("state", &*self.state.read())
            .field("processor", &self.processor)
            .finish()
    }
}

impl AnalysisSession {
    /// Create a session whose integrations run on `runtime`.
    pub fn new(runtime: Handle, regions: RegionsConfig, sink: Arc<dyn DisplaySink>) -> Self {
        let state: Arc<RwLock<Option<SessionState>>> = Arc::new(RwLock::new(None));

        let sampler_state = Arc::clone(&state);
        let processor = region_processor(runtime, move || {
            sampler_state.read().as_ref().map(SessionState::job)
        });
        processor.subscribe(move |done| {
            let text = done.output.enclosed_energy().to_string();
            debug!(run = done.run, %text, "Enclosed energy updated");
            sink.show_enclosed_energy(&text);
        });

        Self {
            state,
            processor,
            regions,
        }
    }

    /// Show a new frame and place both regions on it.
    ///
    /// The source circle is centred, the background square sits in the
    /// bottom-right corner; both are clamped to the frame. Any committed
    /// background subtraction is discarded.
    pub fn load_frame(&self, frame: Arc<Frame>) -> SessionResult<RequestOutcome> {
        let (w, h) = (frame.width, frame.height);
        let source = Region::centered_in(RegionShape::Circle, w, h, self.regions.source_size)?
            .clamped_to(w, h);
        let size = self.regions.background_size;
        let background_region = Region::rectangle(0.0, 0.0, size, size)?
            .anchored_bottom_right(w, h)
            .clamped_to(w, h);

        let mut state = SessionState {
            background: BackgroundSubtractor::new(frame),
            source,
            background_region,
            total: 0.0,
        };
        state.refresh_total();
        info!(width = w, height = h, total = state.total, "Frame loaded");

        let job = state.job();
        *self.state.write() = Some(state);
        Ok(self.processor.request(job))
    }

    /// Move or reshape the source region.
    pub fn move_source(&self, region: Region) -> SessionResult<RequestOutcome> {
        self.update(|state| {
            state.source = region;
            Ok(())
        })
    }

    /// Apply a diameter typed into the ROI size box (whole pixels, 0..=400).
    ///
    /// The circle keeps its centre. Invalid text leaves the region unchanged.
    pub fn set_source_size_text(&self, text: &str) -> SessionResult<f64> {
        let size = parse_bounded_u32("roi size", text, 0, MAX_SOURCE_SIZE)? as f64;
        self.update(|state| {
            state.source = state.source.with_size_centered(size)?;
            Ok(())
        })?;
        Ok(size)
    }

    /// Move the background region; a committed subtraction is reverted.
    pub fn move_background(&self, region: Region) -> SessionResult<RequestOutcome> {
        self.update(|state| {
            state.background_region = region;
            if state.background.region_moved() {
                state.refresh_total();
            }
            Ok(())
        })
    }

    /// Subtract the mean of the background region from the original frame.
    ///
    /// Returns the subtracted level.
    pub fn commit_background(&self) -> SessionResult<f64> {
        let mut level = 0.0;
        self.update(|state| {
            let region = state.background_region;
            level = state.background.commit(&region)?;
            state.refresh_total();
            Ok(())
        })?;
        Ok(level)
    }

    fn update<F>(&self, apply: F) -> SessionResult<RequestOutcome>
    where
        F: FnOnce(&mut SessionState) -> SessionResult<()>,
    {
        let job = {
            let mut guard = self.state.write();
            let state = guard.as_mut().ok_or(SessionError::NoFrame)?;
            apply(state)?;
            state.clamp_regions();
            state.job()
        };
        Ok(self.processor.request(job))
    }

    /// Current source region.
    pub fn source(&self) -> Option<Region> {
        self.state.read().as_ref().map(|s| s.source)
    }

    /// Current background region.
    pub fn background_region(&self) -> Option<Region> {
        self.state.read().as_ref().map(|s| s.background_region)
    }

    /// Raw or subtracted.
    pub fn background_state(&self) -> Option<BackgroundState> {
        self.state.read().as_ref().map(|s| s.background.state())
    }

    /// Frame being shown and measured.
    pub fn displayed_frame(&self) -> Option<Arc<Frame>> {
        self.state
            .read()
            .as_ref()
            .map(|s| Arc::clone(s.background.displayed()))
    }

    /// Sum of the displayed frame.
    pub fn total(&self) -> Option<f64> {
        self.state.read().as_ref().map(|s| s.total)
    }

    /// Processor driving the readout.
    pub fn processor(&self) -> &RegionProcessor {
        &self.processor
    }

    /// Wait until the readout reflects the latest state.
    pub async fn idle(&self) {
        self.processor.idle().await;
    }
}
