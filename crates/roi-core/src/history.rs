//! Bounded history of plotted measurements.

use std::collections::VecDeque;

/// Bounded series of a plotted quantity (e.g. net counts per frame).
///
/// Oldest samples are dropped once `capacity` is reached. The series is reset
/// whenever the unit of the plotted quantity changes.
#[derive(Debug, Clone)]
pub struct MeasurementHistory {
    capacity: usize,
    values: VecDeque<f64>,
}

impl MeasurementHistory {
    /// History holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Samples from oldest to newest.
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no sample is held.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every sample.
    pub fn reset(&mut self) {
        self.values.clear();
    }
}
