//! # ROI Scope
//!
//! Headless region-of-interest photometry for scientific camera frames.
//!
//! The workspace is split by responsibility:
//!
//! - **`roi-core`**: frames, regions, statistics, background subtraction
//!   and the observer bus.
//! - **`roi-processor`**: the single-flight coordinator that keeps region
//!   integration off the interactive path while always converging on the
//!   latest region and frame.
//! - **`roi-camera`**: camera trait, mock camera, exposure/gain controls and
//!   the capture loop.
//!
//! This crate wires them into an application:
//!
//! - **`config`**: Figment-based configuration (TOML + `ROI_SCOPE_` env).
//! - **`telemetry`**: tracing subscriber setup.
//! - **`session`**: interactive enclosed-energy analysis of a single frame.
//! - **`live`**: per-frame photometry on a running capture.
//! - **`loader`** / **`storage`**: CSV frame files and measurement logs.

pub mod config;
pub mod live;
pub mod loader;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use config::ScopeConfig;
pub use live::{run_live, LiveOptions, LivePhotometry, LiveSummary};
pub use session::{AnalysisSession, DisplaySink, SessionError};
