//! Integer slider ↔ float value mapping and bounded text input parsing.
//!
//! Sliders only store integer positions. [`ScaledSlider`] maps the positions
//! `0..=10^decimals` linearly onto a floating point `[min, max]` range, the way
//! exposure and gain sliders need it.
//!
//! Text boxes next to sliders go through [`parse_bounded_f64`] /
//! [`parse_bounded_u32`]: malformed or out-of-range input is rejected before it
//! reaches any state.

use crate::error::{RoiError, RoiResult};

/// Slider with integer positions mapped onto a float range.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSlider {
    steps: u32,
    min: f64,
    max: f64,
    position: u32,
}

impl ScaledSlider {
    /// Slider over `[min, max]` with `10^decimals` steps, starting at `min`.
    pub fn new(min: f64, max: f64, decimals: u32) -> RoiResult<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(RoiError::InvalidRange { min, max });
        }
        let steps = 10u32
            .checked_pow(decimals)
            .ok_or_else(|| RoiError::invalid_input("decimals", "too many decimal places"))?;
        Ok(Self {
            steps,
            min,
            max,
            position: 0,
        })
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Current integer position.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Number of steps between `min` and `max`.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Lower bound.
    pub fn minimum(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    pub fn maximum(&self) -> f64 {
        self.max
    }

    /// Move to an integer position, clamped to the slider.
    pub fn set_position(&mut self, position: u32) {
        self.position = position.min(self.steps);
    }

    /// Current float value.
    pub fn value(&self) -> f64 {
        self.position as f64 / self.steps as f64 * self.span() + self.min
    }

    /// Move to the position closest to `value` (clamped to the range).
    pub fn set_value(&mut self, value: f64) {
        if self.span() <= 0.0 || !value.is_finite() {
            self.position = 0;
            return;
        }
        let fraction = ((value - self.min) / self.span()).clamp(0.0, 1.0);
        self.position = (fraction * self.steps as f64).round() as u32;
    }

    /// Change the range, keeping the current value where possible.
    pub fn set_range(&mut self, min: f64, max: f64) -> RoiResult<()> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(RoiError::InvalidRange { min, max });
        }
        let value = self.value();
        self.min = min;
        self.max = max;
        self.set_value(value);
        Ok(())
    }
}

fn parse_number(field: &str, text: &str) -> RoiResult<f64> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| RoiError::invalid_input(field, format!("'{}' is not a number", text.trim())))?;
    if !value.is_finite() {
        return Err(RoiError::invalid_input(field, "must be finite"));
    }
    Ok(value)
}

fn check_bounds(field: &str, value: f64, min: f64, max: f64) -> RoiResult<()> {
    if value < min || value > max {
        return Err(RoiError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Parse a float from a text box and check it lies in `[min, max]`.
pub fn parse_bounded_f64(field: &str, text: &str, min: f64, max: f64) -> RoiResult<f64> {
    let value = parse_number(field, text)?;
    check_bounds(field, value, min, max)?;
    Ok(value)
}

/// Parse a whole number from a text box and check it lies in `[min, max]`.
pub fn parse_bounded_u32(field: &str, text: &str, min: u32, max: u32) -> RoiResult<u32> {
    let value = parse_number(field, text)?;
    if value.fract() != 0.0 {
        return Err(RoiError::invalid_input(field, "must be a whole number"));
    }
    check_bounds(field, value, min as f64, max as f64)?;
    Ok(value as u32)
}
