//! Continuous capture loop.
//!
//! [`CaptureLoop::spawn`] starts the camera and runs a background task that
//! pulls frames as fast as the exposure allows, rescales them from the 16-bit
//! container to the sensor's native bit depth, and broadcasts each one as a
//! [`CapturedFrame`]. Slow subscribers lag (and skip frames) rather than
//! stalling capture.
//!
//! A failed capture is logged and the loop waits one capture timeout before
//! trying again. The task ends only when stopped or when its handle is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use roi_core::Frame;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::camera::Camera;
use crate::error::{CameraError, CameraResult};
use crate::settings::capture_timeout;

/// One frame as delivered to subscribers.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// 1-based count of successful captures
    pub sequence: u64,
    /// Pixels in native ADU
    pub frame: Arc<Frame>,
    /// Wall-clock time the frame arrived
    pub captured_at: DateTime<Utc>,
}

/// Totals reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Frames broadcast
    pub frames: u64,
    /// Captures that failed
    pub errors: u64,
}

/// Handle to a running capture task.
pub struct CaptureLoop {
    camera: Arc<dyn Camera>,
    frames: broadcast::Sender<CapturedFrame>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<CaptureSummary>,
}

impl std::fmt::Debug for CaptureLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoop")
            .field("subscribers", &self.frames.receiver_count())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl CaptureLoop {
    /// Start the camera and begin capturing.
    ///
    /// `capacity` is the broadcast buffer depth; receivers further behind
    /// than that see `RecvError::Lagged`.
    pub async fn spawn(camera: Arc<dyn Camera>, capacity: usize) -> CameraResult<Self> {
        if capacity == 0 {
            return Err(CameraError::Config(
                "capture buffer capacity must be non-zero".to_string(),
            ));
        }
        camera.start().await?;

        let (frames, _) = broadcast::channel(capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(Arc::clone(&camera), frames.clone(), shutdown_rx));
        info!(capacity, "Capture loop started");

        Ok(Self {
            camera,
            frames,
            shutdown,
            task,
        })
    }

    /// Receive frames captured from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CapturedFrame> {
        self.frames.subscribe()
    }

    /// The camera being driven.
    pub fn camera(&self) -> &Arc<dyn Camera> {
        &self.camera
    }

    /// Signal the task to finish, wait for it, then stop the camera.
    pub async fn stop(self) -> CameraResult<CaptureSummary> {
        self.shutdown.send_replace(true);
        let summary = self
            .task
            .await
            .map_err(|e| CameraError::Hardware(format!("capture task failed: {e}")))?;
        self.camera.stop().await?;
        info!(
            frames = summary.frames,
            errors = summary.errors,
            "Capture loop stopped"
        );
        Ok(summary)
    }
}

async fn run(
    camera: Arc<dyn Camera>,
    frames: broadcast::Sender<CapturedFrame>,
    mut shutdown: watch::Receiver<bool>,
) -> CaptureSummary {
    let bit_depth = camera.properties().bit_depth;
    let mut summary = CaptureSummary::default();

    while !*shutdown.borrow() {
        let timeout = match camera.exposure().await {
            Ok(seconds) => capture_timeout(seconds),
            Err(e) => {
                warn!(error = %e, "Could not read exposure, using minimum timeout");
                capture_timeout(0.0)
            }
        };

        let captured = tokio::select! {
            _ = shutdown.changed() => break,
            result = camera.capture_frame(timeout) => result,
        };

        match captured.and_then(|raw| Ok(raw.rescale_to_bit_depth(bit_depth)?)) {
            Ok(frame) => {
                summary.frames += 1;
                let captured = CapturedFrame {
                    sequence: summary.frames,
                    frame: frame.into_shared(),
                    captured_at: Utc::now(),
                };
                // No subscribers is fine; the frame is simply dropped
                if frames.send(captured).is_err() {
                    debug!(sequence = summary.frames, "No frame subscribers");
                }
            }
            Err(e) => {
                summary.errors += 1;
                warn!(error = %e, retry_in = ?timeout, "Frame capture failed");
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = sleep(timeout) => {}
                }
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCamera, MockCameraConfig};

    #[tokio::test]
    async fn zero_capacity_is_rejected() {
        let camera: Arc<dyn Camera> = Arc::new(MockCamera::new(MockCameraConfig::default()).unwrap());
        let err = CaptureLoop::spawn(camera, 0).await.unwrap_err();
        assert!(matches!(err, CameraError::Config(_)));
    }
}
