//! Simulated camera for running without hardware.
//!
//! Frames are uniform noise in a 16-bit container, left-aligned to the
//! configured bit depth the way real sensors deliver them. An optional hot
//! spot adds a fixed number of counts to a square patch, amplified by gain,
//! so that enclosed-energy and photometry numbers have something to find.
//!
//! Configuration follows the driver convention: a `toml::Value` table
//! deserialized into [`MockCameraConfig`] with per-field defaults, then
//! checked by [`MockCameraConfig::validate`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roi_core::Frame;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::camera::{Camera, CameraProperties};
use crate::error::{CameraError, CameraResult};
use crate::settings::{MAX_EXPOSURE_S, MAX_GAIN};

/// Shortest exposure the mock accepts, in seconds.
pub const MIN_EXPOSURE_S: f64 = 32e-6;

// =============================================================================
// Configuration
// =============================================================================

/// Square patch of extra signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotSpot {
    /// Left edge in pixels
    #[serde(default = "default_spot_origin")]
    pub x: u32,
    /// Top edge in pixels
    #[serde(default = "default_spot_origin")]
    pub y: u32,
    /// Side length in pixels
    #[serde(default = "default_spot_size")]
    pub size: u32,
    /// Counts added at unity gain (16-bit container units)
    #[serde(default = "default_spot_counts")]
    pub counts: u16,
}

impl Default for HotSpot {
    fn default() -> Self {
        Self {
            x: default_spot_origin(),
            y: default_spot_origin(),
            size: default_spot_size(),
            counts: default_spot_counts(),
        }
    }
}

fn default_spot_origin() -> u32 {
    100
}
fn default_spot_size() -> u32 {
    100
}
fn default_spot_counts() -> u16 {
    30_000
}

/// Configuration for [`MockCamera`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockCameraConfig {
    /// Frame width in pixels (default: 640)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height in pixels (default: 480)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Native ADC resolution (default: 12)
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u32,

    /// Electrons per ADU at unity gain (default: 1.0)
    #[serde(default = "default_electrons_per_adu")]
    pub electrons_per_adu: f64,

    /// Pixel pitch in micrometres (default: 3.75)
    #[serde(default = "default_pixel_size")]
    pub pixel_size_um: f64,

    /// Initial exposure in seconds (default: 0.1)
    #[serde(default = "default_exposure")]
    pub exposure_s: f64,

    /// Initial gain (default: 0)
    #[serde(default)]
    pub gain: u32,

    /// Upper bound of the uniform noise, in container units (default: 4000)
    #[serde(default = "default_noise_max")]
    pub noise_max: u16,

    /// RNG seed for reproducible frames; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Optional bright square
    #[serde(default)]
    pub hot_spot: Option<HotSpot>,

    /// Fail every n-th capture to exercise error handling
    #[serde(default)]
    pub fail_every: Option<u64>,
}

fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_bit_depth() -> u32 {
    12
}
fn default_electrons_per_adu() -> f64 {
    1.0
}
fn default_pixel_size() -> f64 {
    3.75
}
fn default_exposure() -> f64 {
    0.1
}
fn default_noise_max() -> u16 {
    4000
}

impl Default for MockCameraConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            bit_depth: default_bit_depth(),
            electrons_per_adu: default_electrons_per_adu(),
            pixel_size_um: default_pixel_size(),
            exposure_s: default_exposure(),
            gain: 0,
            noise_max: default_noise_max(),
            seed: None,
            hot_spot: None,
            fail_every: None,
        }
    }
}

impl MockCameraConfig {
    /// Deserialize from a driver config table and validate.
    pub fn from_toml(value: &toml::Value) -> CameraResult<Self> {
        let config: Self = value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| CameraError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the mock cannot honour.
    pub fn validate(&self) -> CameraResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::Config(
                "camera resolution must be non-zero".to_string(),
            ));
        }
        if !(1..=16).contains(&self.bit_depth) {
            return Err(CameraError::Config(format!(
                "bit_depth must be in 1..=16, got {}",
                self.bit_depth
            )));
        }
        if !self.electrons_per_adu.is_finite() || self.electrons_per_adu <= 0.0 {
            return Err(CameraError::Config(
                "electrons_per_adu must be positive".to_string(),
            ));
        }
        if !(MIN_EXPOSURE_S..=MAX_EXPOSURE_S).contains(&self.exposure_s) {
            return Err(CameraError::Config(format!(
                "exposure_s must be in {MIN_EXPOSURE_S}..={MAX_EXPOSURE_S}, got {}",
                self.exposure_s
            )));
        }
        if self.gain > MAX_GAIN {
            return Err(CameraError::Config(format!(
                "gain must be at most {MAX_GAIN}, got {}",
                self.gain
            )));
        }
        if let Some(spot) = &self.hot_spot {
            if spot.size == 0 {
                return Err(CameraError::Config("hot_spot.size must be non-zero".to_string()));
            }
        }
        if self.fail_every == Some(0) {
            return Err(CameraError::Config("fail_every must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Sensor description implied by this configuration.
    pub fn properties(&self) -> CameraProperties {
        CameraProperties {
            width: self.width,
            height: self.height,
            bit_depth: self.bit_depth,
            electrons_per_adu: self.electrons_per_adu,
            pixel_size_um: self.pixel_size_um,
        }
    }
}

// =============================================================================
// MockCamera
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Exposure {
    seconds: f64,
    gain: u32,
}

/// Camera producing synthetic frames.
#[derive(Debug)]
pub struct MockCamera {
    config: MockCameraConfig,
    capturing: AtomicBool,
    captures: AtomicU64,
    settings: Mutex<Exposure>,
    rng: Mutex<StdRng>,
}

impl MockCamera {
    /// Build a camera from a validated configuration.
    pub fn new(config: MockCameraConfig) -> CameraResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            settings: Mutex::new(Exposure {
                seconds: config.exposure_s,
                gain: config.gain,
            }),
            config,
            capturing: AtomicBool::new(false),
            captures: AtomicU64::new(0),
            rng: Mutex::new(rng),
        })
    }

    /// Build from a `toml::Value` driver table.
    pub fn from_toml(value: &toml::Value) -> CameraResult<Self> {
        Self::new(MockCameraConfig::from_toml(value)?)
    }

    /// Active configuration.
    pub fn config(&self) -> &MockCameraConfig {
        &self.config
    }

    /// Captures attempted since construction.
    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }

    fn render(&self, gain: u32) -> CameraResult<Frame> {
        let (w, h) = (self.config.width, self.config.height);
        let shift = 16 - self.config.bit_depth;
        let native_max = (u16::MAX >> shift) as f64;
        // Gain is in 0.1 dB steps
        let amplification = 10f64.powf(gain as f64 / 200.0);

        let mut rng = self.rng.lock();
        let mut pixels: Vec<u16> = (0..w as usize * h as usize)
            .map(|_| rng.gen_range(0..=self.config.noise_max))
            .collect();
        drop(rng);

        if let Some(spot) = self.config.hot_spot {
            let boost = (spot.counts as f64 * amplification).min(u16::MAX as f64) as u16;
            let (x_end, y_end) = (
                spot.x.saturating_add(spot.size).min(w),
                spot.y.saturating_add(spot.size).min(h),
            );
            for y in spot.y.min(h)..y_end {
                let row = (y * w) as usize;
                for x in spot.x.min(w)..x_end {
                    let p = &mut pixels[row + x as usize];
                    *p = p.saturating_add(boost);
                }
            }
        }

        // Left-align native samples in the 16-bit container
        for p in &mut pixels {
            let native = (*p >> shift) as f64;
            *p = (native.min(native_max) as u16) << shift;
        }

        Ok(Frame::from_u16(w, h, pixels)?)
    }
}

#[async_trait]
impl Camera for MockCamera {
    fn properties(&self) -> CameraProperties {
        self.config.properties()
    }

    async fn start(&self) -> CameraResult<()> {
        if !self.capturing.swap(true, Ordering::SeqCst) {
            info!(
                width = self.config.width,
                height = self.config.height,
                "MockCamera: video capture started"
            );
        }
        Ok(())
    }

    async fn stop(&self) -> CameraResult<()> {
        if self.capturing.swap(false, Ordering::SeqCst) {
            info!("MockCamera: video capture stopped");
        } else {
            debug!("MockCamera: capture already stopped");
        }
        Ok(())
    }

    async fn capture_frame(&self, timeout: Duration) -> CameraResult<Frame> {
        if !self.capturing.load(Ordering::SeqCst) {
            return Err(CameraError::NotStarted);
        }
        let Exposure { seconds, gain } = *self.settings.lock();
        let exposure = Duration::from_secs_f64(seconds);
        if exposure > timeout {
            sleep(timeout).await;
            return Err(CameraError::Timeout(timeout));
        }
        sleep(exposure).await;

        let n = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(every) = self.config.fail_every {
            if n % every == 0 {
                return Err(CameraError::Hardware(format!(
                    "simulated dropout on capture {n}"
                )));
            }
        }
        self.render(gain)
    }

    async fn set_exposure(&self, seconds: f64) -> CameraResult<f64> {
        if !seconds.is_finite() {
            return Err(CameraError::Config("exposure must be finite".to_string()));
        }
        let applied = seconds.clamp(MIN_EXPOSURE_S, MAX_EXPOSURE_S);
        self.settings.lock().seconds = applied;
        debug!(requested = seconds, applied, "MockCamera: exposure set");
        Ok(applied)
    }

    async fn exposure(&self) -> CameraResult<f64> {
        Ok(self.settings.lock().seconds)
    }

    async fn set_gain(&self, gain: u32) -> CameraResult<u32> {
        let applied = gain.min(MAX_GAIN);
        self.settings.lock().gain = applied;
        debug!(requested = gain, applied, "MockCamera: gain set");
        Ok(applied)
    }

    async fn gain(&self) -> CameraResult<u32> {
        Ok(self.settings.lock().gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(config: MockCameraConfig) -> MockCamera {
        MockCamera::new(MockCameraConfig {
            exposure_s: 0.001,
            seed: Some(7),
            ..config
        })
        .unwrap()
    }

    #[test]
    fn config_defaults_from_empty_table() {
        let value = toml::Value::Table(toml::map::Map::new());
        let config = MockCameraConfig::from_toml(&value).unwrap();
        assert_eq!(config, MockCameraConfig::default());
    }

    #[test]
    fn config_parses_hot_spot_table() {
        let value: toml::Value = toml::from_str(
            r#"
            width = 320
            height = 240
            seed = 3

            [hot_spot]
            size = 20
            "#,
        )
        .unwrap();
        let config = MockCameraConfig::from_toml(&value).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.seed, Some(3));
        assert_eq!(
            config.hot_spot,
            Some(HotSpot {
                x: 100,
                y: 100,
                size: 20,
                counts: 30_000
            })
        );
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        let bad = [
            MockCameraConfig {
                width: 0,
                ..Default::default()
            },
            MockCameraConfig {
                bit_depth: 17,
                ..Default::default()
            },
            MockCameraConfig {
                exposure_s: 0.0,
                ..Default::default()
            },
            MockCameraConfig {
                gain: 301,
                ..Default::default()
            },
            MockCameraConfig {
                fail_every: Some(0),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(CameraError::Config(_))));
        }
    }

    #[tokio::test]
    async fn capture_requires_start() {
        let camera = quick(MockCameraConfig::default());
        let err = camera
            .capture_frame(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::NotStarted));
    }

    #[tokio::test]
    async fn frames_are_left_aligned_to_bit_depth() {
        let camera = quick(MockCameraConfig {
            width: 16,
            height: 8,
            bit_depth: 12,
            ..Default::default()
        });
        camera.start().await.unwrap();
        let frame = camera.capture_frame(Duration::from_secs(1)).await.unwrap();
        assert_eq!((frame.width, frame.height), (16, 8));
        assert!(frame.values().all(|p| p as u32 % 16 == 0));
        assert!(frame.values().all(|p| p <= 4000.0));
    }

    #[tokio::test]
    async fn hot_spot_is_brighter_than_noise() {
        let camera = quick(MockCameraConfig {
            width: 32,
            height: 32,
            bit_depth: 16,
            noise_max: 100,
            hot_spot: Some(HotSpot {
                x: 8,
                y: 8,
                size: 4,
                counts: 10_000,
            }),
            ..Default::default()
        });
        camera.start().await.unwrap();
        let frame = camera.capture_frame(Duration::from_secs(1)).await.unwrap();
        assert!(frame.get(9, 9).unwrap() >= 10_000.0);
        assert!(frame.get(0, 0).unwrap() <= 100.0);
        assert!(frame.get(12, 12).unwrap() <= 100.0);
    }

    #[tokio::test]
    async fn same_seed_same_frames() {
        let config = MockCameraConfig {
            width: 8,
            height: 8,
            ..Default::default()
        };
        let (a, b) = (quick(config.clone()), quick(config));
        a.start().await.unwrap();
        b.start().await.unwrap();
        let timeout = Duration::from_secs(1);
        assert_eq!(
            a.capture_frame(timeout).await.unwrap(),
            b.capture_frame(timeout).await.unwrap()
        );
    }

    #[test]
    fn setters_report_applied_values() {
        let camera = quick(MockCameraConfig::default());
        assert_eq!(tokio_test::block_on(camera.set_exposure(2.0)).unwrap(), 2.0);
        assert_eq!(
            tokio_test::block_on(camera.set_exposure(500.0)).unwrap(),
            MAX_EXPOSURE_S
        );
        assert_eq!(
            tokio_test::block_on(camera.set_exposure(0.0)).unwrap(),
            MIN_EXPOSURE_S
        );
        assert_eq!(tokio_test::block_on(camera.exposure()).unwrap(), MIN_EXPOSURE_S);
        assert!(tokio_test::block_on(camera.set_exposure(f64::NAN)).is_err());

        assert_eq!(tokio_test::block_on(camera.set_gain(150)).unwrap(), 150);
        assert_eq!(tokio_test::block_on(camera.set_gain(1_000)).unwrap(), MAX_GAIN);
        assert_eq!(tokio_test::block_on(camera.gain()).unwrap(), MAX_GAIN);
    }

    #[tokio::test]
    async fn exposure_longer_than_timeout_times_out() {
        let camera = quick(MockCameraConfig::default());
        camera.start().await.unwrap();
        camera.set_exposure(1.0).await.unwrap();
        let err = camera
            .capture_frame(Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CameraError::Timeout(_)));
    }

    #[tokio::test]
    async fn injected_failures_follow_schedule() {
        let camera = quick(MockCameraConfig {
            width: 4,
            height: 4,
            fail_every: Some(2),
            ..Default::default()
        });
        camera.start().await.unwrap();
        let timeout = Duration::from_secs(1);
        assert!(camera.capture_frame(timeout).await.is_ok());
        assert!(matches!(
            camera.capture_frame(timeout).await,
            Err(CameraError::Hardware(_))
        ));
        assert!(camera.capture_frame(timeout).await.is_ok());
        assert_eq!(camera.capture_count(), 3);
    }
}
