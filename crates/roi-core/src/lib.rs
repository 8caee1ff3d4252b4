//! `roi-core`
//!
//! Frame and region-of-interest primitives for roi_scope.
//!
//! ## Key Types
//!
//! - [`Frame`]: immutable monochrome pixel grid, shared as `Arc<Frame>`
//! - [`Region`]: rectangle / ellipse / circle over a frame with pixel extraction
//! - [`RegionStatistics`], [`EnclosedEnergy`], [`PhotometryReport`]: what gets measured
//! - [`BackgroundSubtractor`]: Raw ⇄ Subtracted state machine over an original frame
//! - [`EventBus`]: observer registration replacing widget signals
//! - [`ScaledSlider`]: integer slider positions mapped onto a float range
//!
//! ## Example
//!
//! ```rust
//! use roi_core::{EnclosedEnergy, Frame, Region};
//!
//! # fn main() -> roi_core::RoiResult<()> {
//! let frame = Frame::from_u16(4, 4, vec![10; 16])?;
//! let roi = Region::rectangle(0.0, 0.0, 2.0, 2.0)?;
//! let (sum, _) = roi.integrate(&frame);
//! let ee = EnclosedEnergy::new(sum, frame.total());
//! assert_eq!(ee.to_string(), "0.25 (40/160)");
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod error;
pub mod frame;
pub mod history;
pub mod observable;
pub mod region;
pub mod scale;
pub mod stats;

pub use background::{BackgroundState, BackgroundSubtractor};
pub use error::{RoiError, RoiResult};
pub use frame::{Frame, PixelBuffer};
pub use history::MeasurementHistory;
pub use observable::{EventBus, SubscriptionId};
pub use region::{Region, RegionShape};
pub use scale::{parse_bounded_f64, parse_bounded_u32, ScaledSlider};
pub use stats::{net_counts, EnclosedEnergy, PhotometryReport, RegionStatistics, UnitConversion};
