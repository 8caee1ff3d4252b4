//! Camera abstraction.
//!
//! A [`Camera`] delivers raw frames in a 16-bit container together with the
//! static [`CameraProperties`] needed to interpret them. Sensors with fewer
//! than 16 bits left-align their samples, so consumers divide by
//! [`CameraProperties::division_factor`] (the capture loop does this for you).

use std::time::Duration;

use async_trait::async_trait;
use roi_core::Frame;
use serde::{Deserialize, Serialize};

use crate::error::CameraResult;

/// Static description of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraProperties {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Native ADC resolution
    pub bit_depth: u32,
    /// Conversion gain at unity
    pub electrons_per_adu: f64,
    /// Physical pixel pitch
    pub pixel_size_um: f64,
}

impl CameraProperties {
    /// Divisor that maps 16-bit container values back to native ADU.
    ///
    /// Bit depths above 16 are treated as 16.
    pub fn division_factor(&self) -> u32 {
        1u32 << (16 - self.bit_depth.min(16))
    }
}

/// A camera that can be started, configured and polled for frames.
///
/// Setters return the value the camera actually applied, which may differ
/// from the request after clamping to hardware limits.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Sensor description.
    fn properties(&self) -> CameraProperties;

    /// Begin video capture.
    async fn start(&self) -> CameraResult<()>;

    /// End video capture. Stopping an idle camera is not an error.
    async fn stop(&self) -> CameraResult<()>;

    /// Wait for the next frame, giving up after `timeout`.
    async fn capture_frame(&self, timeout: Duration) -> CameraResult<Frame>;

    /// Set the exposure time in seconds.
    async fn set_exposure(&self, seconds: f64) -> CameraResult<f64>;

    /// Current exposure time in seconds.
    async fn exposure(&self) -> CameraResult<f64>;

    /// Set the analogue gain.
    async fn set_gain(&self, gain: u32) -> CameraResult<u32>;

    /// Current analogue gain.
    async fn gain(&self) -> CameraResult<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(bit_depth: u32) -> CameraProperties {
        CameraProperties {
            width: 8,
            height: 8,
            bit_depth,
            electrons_per_adu: 1.0,
            pixel_size_um: 3.75,
        }
    }

    #[test]
    fn division_factor_follows_bit_depth() {
        assert_eq!(props(16).division_factor(), 1);
        assert_eq!(props(14).division_factor(), 4);
        assert_eq!(props(12).division_factor(), 16);
        assert_eq!(props(8).division_factor(), 256);
        assert_eq!(props(20).division_factor(), 1);
    }
}
