//! Background subtraction with an immutable original frame.
//!
//! The subtractor holds two frames: the original as loaded, and the frame
//! currently shown. Committing a background region replaces the shown frame with
//! `max(original - level, 0)`, where `level` is the mean of the background
//! region measured on the original. Moving the background region afterwards
//! reverts the shown frame to the original `Arc`.
//!
//! The displayed frame is always derived from the original, never from a
//! previously subtracted frame, so repeated commits never compound.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{RoiError, RoiResult};
use crate::frame::Frame;
use crate::region::Region;
use crate::stats::RegionStatistics;

/// Which version of the frame is being displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundState {
    /// Unmodified original frame
    Raw,
    /// Original minus the committed background level, floored at zero
    Subtracted {
        /// Mean background level that was removed
        level: f64,
    },
}

/// Two-state background subtraction over a frame.
#[derive(Debug, Clone)]
pub struct BackgroundSubtractor {
    original: Arc<Frame>,
    displayed: Arc<Frame>,
    state: BackgroundState,
}

impl BackgroundSubtractor {
    /// Start in [`BackgroundState::Raw`] showing `original`.
    pub fn new(original: Arc<Frame>) -> Self {
        Self {
            displayed: Arc::clone(&original),
            original,
            state: BackgroundState::Raw,
        }
    }

    /// Current state.
    pub fn state(&self) -> BackgroundState {
        self.state
    }

    /// The frame as loaded.
    pub fn original(&self) -> &Arc<Frame> {
        &self.original
    }

    /// The frame that should be shown and measured.
    pub fn displayed(&self) -> &Arc<Frame> {
        &self.displayed
    }

    /// Subtract the mean of `region` (measured on the original) from the original.
    ///
    /// Returns the removed level. An empty region leaves the state unchanged.
    pub fn commit(&mut self, region: &Region) -> RoiResult<f64> {
        let stats = RegionStatistics::from_values(&region.extract(&self.original));
        if stats.pixel_count == 0 {
            return Err(RoiError::EmptyRegion("background".to_string()));
        }
        let level = stats.mean;
        self.displayed = Arc::new(self.original.map_values(|p| (p - level).max(0.0)));
        self.state = BackgroundState::Subtracted { level };
        info!(level, pixels = stats.pixel_count, "Background subtracted");
        Ok(level)
    }

    /// The background region was edited; drop any committed subtraction.
    ///
    /// Returns `true` when the displayed frame reverted to the original.
    pub fn region_moved(&mut self) -> bool {
        match self.state {
            BackgroundState::Raw => false,
            BackgroundState::Subtracted { level } => {
                debug!(level, "Background region moved, reverting to original frame");
                self.displayed = Arc::clone(&self.original);
                self.state = BackgroundState::Raw;
                true
            }
        }
    }
}
