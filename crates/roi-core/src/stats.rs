//! Photometric statistics over extracted region pixels.
//!
//! - [`RegionStatistics`]: sum, mean, spread and extrema of a pixel set
//! - [`UnitConversion`]: counts → electrons and counts → rate transforms
//! - [`net_counts`]: source sum with the background contribution removed
//! - [`EnclosedEnergy`]: fraction of the frame total inside a region
//! - [`PhotometryReport`]: the text a live display shows for one frame

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RoiError, RoiResult};

/// Statistics computed from region pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionStatistics {
    /// Sum of all pixel values
    pub sum: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Number of pixels that contributed
    pub pixel_count: usize,
}

impl RegionStatistics {
    /// Compute statistics from extracted pixel values
    pub fn from_values(pixels: &[f64]) -> Self {
        if pixels.is_empty() {
            return Self::default();
        }

        let n = pixels.len();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for &p in pixels {
            sum += p;
            min = min.min(p);
            max = max.max(p);
        }

        let mean = sum / n as f64;

        let variance: f64 = pixels.iter().map(|&p| (p - mean).powi(2)).sum::<f64>() / n as f64;

        Self {
            sum,
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            pixel_count: n,
        }
    }
}

/// Unit transform applied to raw ADU sums and means before display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    /// Sensor gain in electrons per ADU
    #[serde(default = "default_electrons_per_adu")]
    pub electrons_per_adu: f64,
    /// Report electrons instead of counts
    #[serde(default)]
    pub use_electrons: bool,
    /// Divide by the exposure time to report a rate
    #[serde(default)]
    pub per_second: bool,
    /// Exposure time in seconds used for the rate
    #[serde(default = "default_exposure_s")]
    pub exposure_s: f64,
}

fn default_electrons_per_adu() -> f64 {
    1.0
}

fn default_exposure_s() -> f64 {
    0.1
}

impl Default for UnitConversion {
    fn default() -> Self {
        Self {
            electrons_per_adu: default_electrons_per_adu(),
            use_electrons: false,
            per_second: false,
            exposure_s: default_exposure_s(),
        }
    }
}

impl UnitConversion {
    /// Check that the transform is well defined.
    pub fn validate(&self) -> RoiResult<()> {
        if !self.electrons_per_adu.is_finite() || self.electrons_per_adu <= 0.0 {
            return Err(RoiError::invalid_input(
                "electrons_per_adu",
                "must be a positive number",
            ));
        }
        if self.per_second && (!self.exposure_s.is_finite() || self.exposure_s <= 0.0) {
            return Err(RoiError::invalid_input(
                "exposure_s",
                "rate mode requires a positive exposure",
            ));
        }
        Ok(())
    }

    /// Transform a raw ADU quantity.
    pub fn apply(&self, value: f64) -> f64 {
        let mut value = value;
        if self.use_electrons {
            value *= self.electrons_per_adu;
        }
        if self.per_second && self.exposure_s > 0.0 {
            value /= self.exposure_s;
        }
        value
    }

    /// Unit label for transformed quantities.
    pub fn label(&self) -> &'static str {
        match (self.use_electrons, self.per_second) {
            (false, false) => "counts",
            (true, false) => "e-",
            (false, true) => "counts/sec",
            (true, true) => "e-/sec",
        }
    }
}

/// Foreground sum minus the estimated background contribution.
///
/// `background_mean` is the per-pixel background level and must already be
/// in the same unit as `source_sum`.
pub fn net_counts(source_sum: f64, source_pixels: usize, background_mean: f64) -> f64 {
    source_sum - background_mean * source_pixels as f64
}

/// Share of the frame total that falls inside a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnclosedEnergy {
    /// Sum of the region pixels
    pub region_sum: f64,
    /// Sum of every pixel in the frame
    pub total: f64,
}

impl EnclosedEnergy {
    /// Pair a region sum with the frame total.
    pub fn new(region_sum: f64, total: f64) -> Self {
        Self { region_sum, total }
    }

    /// `region_sum / total`, or `None` when nothing has been captured yet.
    pub fn fraction(&self) -> Option<f64> {
        (self.total != 0.0).then(|| self.region_sum / self.total)
    }
}

impl fmt::Display for EnclosedEnergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fraction() {
            Some(fraction) => {
                let rounded = (fraction * 10_000.0).round() / 10_000.0;
                // Whole fractions keep a decimal point: "1.0", "0.0"
                if rounded.fract() == 0.0 {
                    write!(f, "{rounded:.1}")?;
                } else {
                    write!(f, "{rounded}")?;
                }
                write!(f, " ({}/{})", self.region_sum.trunc(), self.total.trunc())
            }
            None => write!(f, "0 ({}/{})", self.region_sum, self.total),
        }
    }
}

/// Everything a live display shows for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotometryReport {
    /// Circle radius in pixels
    pub source_radius: f64,
    /// Source region statistics, converted
    pub source: RegionStatistics,
    /// Background region statistics, converted
    pub background: RegionStatistics,
    /// Net source signal, converted
    pub net: f64,
    /// Unit label of every converted quantity
    pub unit: &'static str,
}

impl PhotometryReport {
    /// Measure source and background pixel sets under a unit conversion.
    pub fn measure(
        source_pixels: &[f64],
        source_radius: f64,
        background_pixels: &[f64],
        conversion: &UnitConversion,
    ) -> Self {
        let convert = |s: RegionStatistics| RegionStatistics {
            sum: conversion.apply(s.sum),
            mean: conversion.apply(s.mean),
            std_dev: conversion.apply(s.std_dev),
            min: conversion.apply(s.min),
            max: conversion.apply(s.max),
            pixel_count: s.pixel_count,
        };
        let source = convert(RegionStatistics::from_values(source_pixels));
        let background = convert(RegionStatistics::from_values(background_pixels));
        let net = net_counts(source.sum, source.pixel_count, background.mean);
        Self {
            source_radius,
            source,
            background,
            net,
            unit: conversion.label(),
        }
    }

    /// Display lines in panel order.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Radius: {:.1} px", self.source_radius),
            format!("Sum: {:.3e} {}", self.source.sum, self.unit),
            format!("Mean: {:.4} {}", self.source.mean, self.unit),
            format!("Net: {:.3e} {}", self.net, self.unit),
            format!("Background sum: {:.3e} {}", self.background.sum, self.unit),
            format!("Background mean: {:.4} {}", self.background.mean, self.unit),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_of_known_values() {
        let stats = RegionStatistics::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.sum, 40.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
        assert_eq!((stats.min, stats.max), (2.0, 9.0));
        assert_eq!(stats.pixel_count, 8);
    }

    #[test]
    fn statistics_of_empty_region_are_zero() {
        assert_eq!(RegionStatistics::from_values(&[]), RegionStatistics::default());
    }

    #[test]
    fn enclosed_energy_example() {
        let ee = EnclosedEnergy::new(250.0, 1000.0);
        assert_eq!(ee.fraction(), Some(0.25));
        assert_eq!(ee.to_string(), "0.25 (250/1000)");
    }

    #[test]
    fn whole_fractions_keep_a_decimal_point() {
        assert_eq!(EnclosedEnergy::new(1000.0, 1000.0).to_string(), "1.0 (1000/1000)");
        assert_eq!(EnclosedEnergy::new(0.0, 50.0).to_string(), "0.0 (0/50)");
        // Rounds to a whole number only after four places
        assert_eq!(EnclosedEnergy::new(99_999.0, 100_000.0).to_string(), "1.0 (99999/100000)");
    }

    #[test]
    fn enclosed_energy_rounds_to_four_places() {
        let ee = EnclosedEnergy::new(1.0, 3.0);
        assert_eq!(ee.to_string(), "0.3333 (1/3)");
    }

    #[test]
    fn zero_total_reports_sentinel() {
        for sum in [0.0, 17.0, 250.0, -4.0] {
            let ee = EnclosedEnergy::new(sum, 0.0);
            assert_eq!(ee.fraction(), None);
            assert_eq!(ee.to_string(), format!("0 ({}/0)", sum));
        }
        assert_eq!(EnclosedEnergy::new(250.0, 0.0).to_string(), "0 (250/0)");
    }

    #[test]
    fn unit_conversion_labels_and_scaling() {
        let mut conv = UnitConversion {
            electrons_per_adu: 0.5,
            exposure_s: 2.0,
            ..Default::default()
        };
        assert_eq!(conv.apply(100.0), 100.0);
        assert_eq!(conv.label(), "counts");

        conv.use_electrons = true;
        assert_eq!(conv.apply(100.0), 50.0);
        assert_eq!(conv.label(), "e-");

        conv.per_second = true;
        assert_eq!(conv.apply(100.0), 25.0);
        assert_eq!(conv.label(), "e-/sec");
    }

    #[test]
    fn rate_mode_requires_positive_exposure() {
        let conv = UnitConversion {
            per_second: true,
            exposure_s: 0.0,
            ..Default::default()
        };
        assert!(conv.validate().is_err());
        assert!(UnitConversion::default().validate().is_ok());
    }

    #[test]
    fn net_counts_removes_background_level() {
        assert_eq!(net_counts(1000.0, 100, 2.5), 750.0);
    }

    #[test]
    fn report_uses_converted_background_mean() {
        let conv = UnitConversion {
            electrons_per_adu: 2.0,
            use_electrons: true,
            ..Default::default()
        };
        let report = PhotometryReport::measure(&[10.0; 4], 1.0, &[1.0; 9], &conv);
        assert_eq!(report.source.sum, 80.0);
        assert_eq!(report.background.mean, 2.0);
        assert_eq!(report.net, 72.0);
        assert_eq!(report.unit, "e-");
        assert_eq!(report.lines()[0], "Radius: 1.0 px");
        assert_eq!(report.lines()[1], "Sum: 8.000e1 e-");
    }
}
