//! Exposure and gain controls.
//!
//! Both controls pair a slider with a free-text box. The exposure slider has
//! 100 integer positions covering 0 to 10 s (position / 10); the text box
//! accepts any value in 0..=100 s. Gain is a whole number in 0..=300.
//!
//! Invalid text is rejected and leaves the control unchanged.

use std::time::Duration;

use roi_core::{parse_bounded_f64, parse_bounded_u32, RoiError, RoiResult, ScaledSlider};

/// Largest exposure accepted from the text box, in seconds.
pub const MAX_EXPOSURE_S: f64 = 100.0;
/// Largest exposure reachable with the slider, in seconds.
pub const MAX_SLIDER_EXPOSURE_S: f64 = 10.0;
/// Number of exposure slider positions.
pub const EXPOSURE_SLIDER_STEPS: u32 = 100;
/// Largest analogue gain.
pub const MAX_GAIN: u32 = 300;

/// How long to wait for a frame at the given exposure.
///
/// Four exposure periods plus 500 ms of readout headroom.
pub fn capture_timeout(exposure_s: f64) -> Duration {
    let exposure_ms = (exposure_s.max(0.0) * 1000.0) as u64;
    Duration::from_millis(exposure_ms.saturating_mul(4).saturating_add(500))
}

/// Exposure time with slider and text entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureControl {
    seconds: f64,
    slider: ScaledSlider,
}

impl ExposureControl {
    /// Start at `seconds`, which must lie in `0..=100`.
    pub fn new(seconds: f64) -> RoiResult<Self> {
        if !seconds.is_finite() {
            return Err(RoiError::invalid_input("exposure", "must be finite"));
        }
        if !(0.0..=MAX_EXPOSURE_S).contains(&seconds) {
            return Err(RoiError::OutOfRange {
                field: "exposure".to_string(),
                value: seconds,
                min: 0.0,
                max: MAX_EXPOSURE_S,
            });
        }
        // 10^2 positions over 0..=10 s gives position / 10 seconds per step
        let mut slider = ScaledSlider::new(0.0, MAX_SLIDER_EXPOSURE_S, 2)?;
        slider.set_value(seconds);
        Ok(Self { seconds, slider })
    }

    /// Exposure in seconds.
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Slider position matching the current exposure (pinned at the end for
    /// exposures longer than the slider covers).
    pub fn slider_position(&self) -> u32 {
        self.slider.position()
    }

    /// Move the slider; the exposure becomes `position / 10` seconds.
    pub fn set_slider_position(&mut self, position: u32) -> f64 {
        self.slider.set_position(position.min(EXPOSURE_SLIDER_STEPS));
        self.seconds = self.slider.value();
        self.seconds
    }

    /// Apply a value typed into the exposure box.
    pub fn set_text(&mut self, text: &str) -> RoiResult<f64> {
        let seconds = parse_bounded_f64("exposure", text, 0.0, MAX_EXPOSURE_S)?;
        self.seconds = seconds;
        self.slider.set_value(seconds);
        Ok(seconds)
    }

    /// Adopt the value the camera actually applied.
    pub fn sync(&mut self, seconds: f64) {
        self.seconds = seconds.clamp(0.0, MAX_EXPOSURE_S);
        self.slider.set_value(self.seconds);
    }

    /// Frame wait budget for the current exposure.
    pub fn capture_timeout(&self) -> Duration {
        capture_timeout(self.seconds)
    }
}

/// Analogue gain with slider and text entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GainControl {
    gain: u32,
}

impl GainControl {
    /// Start at `gain`, clamped to the valid range.
    pub fn new(gain: u32) -> Self {
        Self {
            gain: gain.min(MAX_GAIN),
        }
    }

    /// Current gain.
    pub fn gain(&self) -> u32 {
        self.gain
    }

    /// Move the slider.
    pub fn set_slider_position(&mut self, position: u32) -> u32 {
        self.gain = position.min(MAX_GAIN);
        self.gain
    }

    /// Apply a value typed into the gain box.
    pub fn set_text(&mut self, text: &str) -> RoiResult<u32> {
        self.gain = parse_bounded_u32("gain", text, 0, MAX_GAIN)?;
        Ok(self.gain)
    }
}
