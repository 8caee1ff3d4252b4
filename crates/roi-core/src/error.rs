//! Error types for frame and region analysis.
//!
//! `RoiError` covers everything the analysis primitives can reject: frames whose
//! buffers do not match their declared dimensions, malformed user input coming
//! from text boxes or sliders, and regions that select no pixels.
//!
//! None of these are fatal. Callers reject the offending input at the boundary
//! and keep their previous state, so every variant carries enough context to be
//! shown back to the user verbatim.

use thiserror::Error;

/// Convenience alias for results using [`RoiError`].
pub type RoiResult<T> = std::result::Result<T, RoiError>;

/// Primary error type for the analysis primitives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiError {
    /// Pixel buffer length does not match `width * height`.
    #[error("Frame dimension mismatch: expected {expected} pixels, got {actual}")]
    DimensionMismatch {
        /// Pixel count implied by width and height
        expected: usize,
        /// Length of the supplied buffer
        actual: usize,
    },

    /// A text or numeric input could not be parsed or is not finite.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidInput {
        /// Name of the input (e.g. "exposure")
        field: String,
        /// Human readable explanation
        reason: String,
    },

    /// A parsed value lies outside the accepted range.
    #[error("Value {value} for '{field}' is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the input
        field: String,
        /// Offending value
        value: f64,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },

    /// A range was configured with its minimum above its maximum.
    #[error("Invalid range: minimum {min} is greater than maximum {max}")]
    InvalidRange {
        /// Requested minimum
        min: f64,
        /// Requested maximum
        max: f64,
    },

    /// The region does not cover any pixel of the frame.
    #[error("Region '{0}' does not cover any pixel of the frame")]
    EmptyRegion(String),

    /// Bit depth outside of what a 16-bit container can hold.
    #[error("Unsupported bit depth {0} (expected 1..=16)")]
    UnsupportedBitDepth(u32),
}

impl RoiError {
    /// Shorthand for [`RoiError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
