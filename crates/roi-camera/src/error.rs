//! Camera error type.

use std::time::Duration;

use roi_core::RoiError;
use thiserror::Error;

/// Result alias for camera operations.
pub type CameraResult<T> = std::result::Result<T, CameraError>;

/// Errors raised by cameras, their settings and the capture loop.
#[derive(Error, Debug)]
pub enum CameraError {
    /// Capture requested before `start()` or after `stop()`.
    #[error("Camera is not capturing")]
    NotStarted,

    /// The exposure did not finish within the capture timeout.
    #[error("Capture timed out after {0:?}")]
    Timeout(Duration),

    /// Camera configuration rejected.
    #[error("Invalid camera configuration: {0}")]
    Config(String),

    /// Hardware or driver reported a failure.
    #[error("Camera hardware error: {0}")]
    Hardware(String),

    /// Frame or input validation failed.
    #[error(transparent)]
    Roi(#[from] RoiError),
}
