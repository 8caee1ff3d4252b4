//! End-to-end behaviour of the capture loop against the mock camera.

use std::sync::Arc;
use std::time::Duration;

use roi_camera::{Camera, CaptureLoop, HotSpot, MockCamera, MockCameraConfig};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;

fn fast_camera(config: MockCameraConfig) -> Arc<MockCamera> {
    Arc::new(
        MockCamera::new(MockCameraConfig {
            width: 32,
            height: 24,
            exposure_s: 0.001,
            seed: Some(11),
            ..config
        })
        .unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn frames_arrive_in_sequence_at_native_bit_depth() {
    let camera = fast_camera(MockCameraConfig {
        bit_depth: 12,
        hot_spot: Some(HotSpot {
            x: 4,
            y: 4,
            size: 4,
            counts: 32_000,
        }),
        ..Default::default()
    });
    let capture = CaptureLoop::spawn(camera.clone(), 16).await.unwrap();
    let mut rx = capture.subscribe();

    let mut last = 0;
    for _ in 0..3 {
        let captured = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(captured.sequence > last);
        last = captured.sequence;

        assert_eq!(captured.frame.bit_depth, 12);
        // 12-bit samples never exceed 4095 after rescaling
        assert!(captured.frame.values().all(|p| p <= 4095.0));
        assert!(captured.frame.get(5, 5).unwrap() >= 2000.0);
    }

    let summary = capture.stop().await.unwrap();
    assert!(summary.frames >= 3);
    assert_eq!(summary.errors, 0);

    // Camera is stopped along with the loop
    assert!(camera
        .capture_frame(Duration::from_millis(100))
        .await
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn capture_errors_do_not_end_the_loop() {
    let camera = fast_camera(MockCameraConfig {
        fail_every: Some(2),
        ..Default::default()
    });
    let capture = CaptureLoop::spawn(camera, 16).await.unwrap();
    let mut rx = capture.subscribe();

    // Frames 1, 3 and 5 succeed; each failure costs one 500 ms timeout
    let mut received = 0;
    while received < 3 {
        match timeout(Duration::from_secs(10), rx.recv()).await.unwrap() {
            Ok(_) => received += 1,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("capture loop ended"),
        }
    }

    let summary = capture.stop().await.unwrap();
    assert!(summary.frames >= 3);
    assert!(summary.errors >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_interrupts_a_long_exposure() {
    let camera = fast_camera(MockCameraConfig::default());
    camera.set_exposure(30.0).await.unwrap();
    let capture = CaptureLoop::spawn(camera, 4).await.unwrap();

    let summary = timeout(Duration::from_secs(2), capture.stop())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.frames, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn settings_can_change_while_capturing() {
    let camera = fast_camera(MockCameraConfig::default());
    let capture = CaptureLoop::spawn(camera.clone(), 4).await.unwrap();
    let mut rx = capture.subscribe();

    timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(capture.camera().set_gain(100).await.unwrap(), 100);
    assert_eq!(camera.gain().await.unwrap(), 100);

    capture.stop().await.unwrap();
}
