//! Region integration: the per-frame computation behind the enclosed-energy readout.

use std::sync::Arc;

use roi_core::{EnclosedEnergy, Frame, Region};
use tokio::runtime::Handle;

use crate::single_flight::SingleFlight;

/// Snapshot handed to a worker: the region and the frame it is measured on.
#[derive(Debug, Clone)]
pub struct RegionJob {
    /// Region to integrate
    pub region: Region,
    /// Frame being displayed when the job was sampled
    pub frame: Arc<Frame>,
    /// Sum of the whole frame, cached by the owner of the frame
    pub frame_total: f64,
}

impl RegionJob {
    /// Build a job, computing the frame total.
    pub fn new(region: Region, frame: Arc<Frame>) -> Self {
        let frame_total = frame.total();
        Self {
            region,
            frame,
            frame_total,
        }
    }
}

/// Result of integrating one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSum {
    /// Sum of the pixels inside the region
    pub sum: f64,
    /// Number of pixels inside the region
    pub pixel_count: usize,
    /// Sum of the whole frame
    pub total: f64,
}

impl RegionSum {
    /// Share of the frame total inside the region.
    pub fn enclosed_energy(&self) -> EnclosedEnergy {
        EnclosedEnergy::new(self.sum, self.total)
    }
}

/// Sum the pixels of `job.frame` that lie inside `job.region`.
pub fn integrate_region(job: RegionJob) -> RegionSum {
    let (sum, pixel_count) = job.region.integrate(&job.frame);
    RegionSum {
        sum,
        pixel_count,
        total: job.frame_total,
    }
}

/// Single-flight processor specialised for region integration.
pub type RegionProcessor = SingleFlight<RegionJob, RegionSum>;

/// Build a [`RegionProcessor`] whose replays read the current job from `sampler`.
pub fn region_processor<S>(runtime: Handle, sampler: S) -> RegionProcessor
where
    S: Fn() -> Option<RegionJob> + Send + Sync + 'static,
{
    SingleFlight::new(runtime, sampler, integrate_region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_region_and_keeps_total() {
        let frame = Frame::from_u16(10, 10, vec![10; 100]).unwrap().into_shared();
        let region = Region::rectangle(0.0, 0.0, 5.0, 5.0).unwrap();
        let result = integrate_region(RegionJob::new(region, frame));
        assert_eq!(result.sum, 250.0);
        assert_eq!(result.pixel_count, 25);
        assert_eq!(result.total, 1000.0);
        assert_eq!(result.enclosed_energy().to_string(), "0.25 (250/1000)");
    }

    #[test]
    fn blank_frame_reports_sentinel() {
        let frame = Frame::from_u16(4, 4, vec![0; 16]).unwrap().into_shared();
        let region = Region::circle(0.0, 0.0, 4.0).unwrap();
        let result = integrate_region(RegionJob::new(region, frame));
        assert_eq!(result.enclosed_energy().to_string(), "0 (0/0)");
    }
}
