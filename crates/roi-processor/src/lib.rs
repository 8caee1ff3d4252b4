//! `roi-processor`
//!
//! Keeps expensive region statistics off the interactive thread without ever
//! falling behind: [`SingleFlight`] runs at most one computation at a time and
//! coalesces every request that arrives meanwhile into a single replay against
//! the latest region/frame state.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parking_lot::RwLock;
//! use roi_core::{Frame, Region};
//! use roi_processor::{region_processor, RegionJob};
//!
//! # #[tokio::main]
//! # async fn main() -> roi_core::RoiResult<()> {
//! let frame = Frame::from_u16(64, 64, vec![1; 64 * 64])?.into_shared();
//! let current = Arc::new(RwLock::new(RegionJob::new(Region::circle(16.0, 16.0, 32.0)?, frame)));
//!
//! let sampler = Arc::clone(&current);
//! let processor = region_processor(tokio::runtime::Handle::current(), move || {
//!     Some(sampler.read().clone())
//! });
//! processor.subscribe(|done| println!("Energy enclosed: {}", done.output.enclosed_energy()));
//!
//! processor.request(current.read().clone());
//! processor.idle().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod integrate;
pub mod single_flight;

pub use error::ProcessorError;
pub use integrate::{integrate_region, region_processor, RegionJob, RegionProcessor, RegionSum};
pub use single_flight::{Completion, FlightMetrics, RequestOutcome, SingleFlight};
