//! `roi-camera`
//!
//! Camera abstraction and acquisition for roi_scope.
//!
//! - [`Camera`]: async trait a driver implements
//! - [`MockCamera`]: synthetic frames configured from TOML
//! - [`ExposureControl`] / [`GainControl`]: slider and text box semantics
//! - [`CaptureLoop`]: background capture broadcasting [`CapturedFrame`]s

pub mod camera;
pub mod capture;
pub mod error;
pub mod mock;
pub mod settings;

pub use camera::{Camera, CameraProperties};
pub use capture::{CaptureLoop, CaptureSummary, CapturedFrame};
pub use error::{CameraError, CameraResult};
pub use mock::{HotSpot, MockCamera, MockCameraConfig};
pub use settings::{capture_timeout, ExposureControl, GainControl, MAX_EXPOSURE_S, MAX_GAIN};
