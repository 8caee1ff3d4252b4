//! Monochrome frames and their pixel storage.

use std::sync::Arc;

use crate::error::{RoiError, RoiResult};

/// Memory-efficient pixel storage for camera/sensor data
///
/// Supports native camera formats (U8, U16) and processed data (F64).
/// Raw camera frames stay in U16; background-subtracted or unit-converted
/// frames are materialised as F64.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    /// 8-bit unsigned integer pixels (1 byte/pixel)
    U8(Vec<u8>),
    /// 16-bit unsigned integer pixels (2 bytes/pixel) - Common for scientific cameras
    U16(Vec<u16>),
    /// 64-bit floating point pixels (8 bytes/pixel) - For processed data
    F64(Vec<f64>),
}

impl PixelBuffer {
    /// Number of pixels in the buffer.
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(v) => v.len(),
            PixelBuffer::U16(v) => v.len(),
            PixelBuffer::F64(v) => v.len(),
        }
    }

    /// True when the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel at linear index `idx` as f64.
    pub fn get(&self, idx: usize) -> Option<f64> {
        match self {
            PixelBuffer::U8(v) => v.get(idx).map(|&p| p as f64),
            PixelBuffer::U16(v) => v.get(idx).map(|&p| p as f64),
            PixelBuffer::F64(v) => v.get(idx).copied(),
        }
    }
}

/// A single monochrome image frame.
///
/// Pixels are stored row-major: the pixel at column `x`, row `y` lives at
/// index `y * width + x`. Frames are treated as immutable snapshots; every
/// transformation returns a new frame and callers share them as `Arc<Frame>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Bits per pixel (e.g., 8, 12, 16)
    pub bit_depth: u32,

    pixels: PixelBuffer,
}

impl Frame {
    fn checked(width: u32, height: u32, bit_depth: u32, pixels: PixelBuffer) -> RoiResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(RoiError::DimensionMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bit_depth,
            pixels,
        })
    }

    /// Create a new frame from 16-bit pixel data.
    pub fn from_u16(width: u32, height: u32, pixels: Vec<u16>) -> RoiResult<Self> {
        Self::checked(width, height, 16, PixelBuffer::U16(pixels))
    }

    /// Create a new frame from 8-bit pixel data.
    pub fn from_u8(width: u32, height: u32, pixels: Vec<u8>) -> RoiResult<Self> {
        Self::checked(width, height, 8, PixelBuffer::U8(pixels))
    }

    /// Create a new frame from floating point (processed) pixel data.
    pub fn from_f64(width: u32, height: u32, pixels: Vec<f64>) -> RoiResult<Self> {
        Self::checked(width, height, 64, PixelBuffer::F64(pixels))
    }

    /// Wrap the frame for sharing between the interactive side and workers.
    pub fn into_shared(self) -> Arc<Frame> {
        Arc::new(self)
    }

    /// Underlying pixel storage.
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Total pixel count.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True for a zero-sized frame.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Get pixel value at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize)
    }

    /// Iterate all pixel values in row-major order.
    pub fn values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match &self.pixels {
            PixelBuffer::U8(v) => Box::new(v.iter().map(|&p| p as f64)),
            PixelBuffer::U16(v) => Box::new(v.iter().map(|&p| p as f64)),
            PixelBuffer::F64(v) => Box::new(v.iter().copied()),
        }
    }

    /// Sum of every pixel in the frame.
    pub fn total(&self) -> f64 {
        self.values().sum()
    }

    /// Calculate mean pixel value.
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.total() / self.len() as f64
    }

    /// Apply `f` to every pixel, producing a floating point frame.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            bit_depth: 64,
            pixels: PixelBuffer::F64(self.values().map(f).collect()),
        }
    }

    /// Shift 16-bit container values down to the sensor's native bit depth.
    ///
    /// Cameras with a 12 or 14-bit ADC left-align samples in a 16-bit word;
    /// each pixel is integer-divided by `2^(16 - bit_depth)`. Non-U16 frames
    /// are returned unchanged apart from the bit depth tag.
    pub fn rescale_to_bit_depth(&self, bit_depth: u32) -> RoiResult<Frame> {
        if !(1..=16).contains(&bit_depth) {
            return Err(RoiError::UnsupportedBitDepth(bit_depth));
        }
        let factor = 1u16 << (16 - bit_depth);
        let pixels = match &self.pixels {
            PixelBuffer::U16(v) => PixelBuffer::U16(v.iter().map(|&p| p / factor).collect()),
            other => other.clone(),
        };
        Ok(Frame {
            width: self.width,
            height: self.height,
            bit_depth,
            pixels,
        })
    }

    /// Swap rows and columns.
    pub fn transposed(&self) -> Frame {
        let (w, h) = (self.width as usize, self.height as usize);
        let remap = |x: usize| (x % h) * w + x / h;
        let pixels = match &self.pixels {
            PixelBuffer::U8(v) => PixelBuffer::U8((0..v.len()).map(|i| v[remap(i)]).collect()),
            PixelBuffer::U16(v) => PixelBuffer::U16((0..v.len()).map(|i| v[remap(i)]).collect()),
            PixelBuffer::F64(v) => PixelBuffer::F64((0..v.len()).map(|i| v[remap(i)]).collect()),
        };
        Frame {
            width: self.height,
            height: self.width,
            bit_depth: self.bit_depth,
            pixels,
        }
    }

    /// Convert to 8-bit grayscale for display.
    ///
    /// Values are clipped to the 16-bit range and divided by 256, mapping
    /// [0, 65535] onto [0, 255].
    pub fn to_display_u8(&self) -> Vec<u8> {
        self.values()
            .map(|p| (p.clamp(0.0, 65535.0) / 256.0) as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Frame::from_u16(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            RoiError::DimensionMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn get_uses_row_major_layout() {
        let frame = Frame::from_u16(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(frame.get(2, 0), Some(2.0));
        assert_eq!(frame.get(0, 1), Some(3.0));
        assert_eq!(frame.get(3, 0), None);
        assert_eq!(frame.get(0, 2), None);
    }

    #[test]
    fn total_and_mean() {
        let frame = Frame::from_u16(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(frame.total(), 10.0);
        assert_eq!(frame.mean(), 2.5);

        let empty = Frame::from_u16(0, 0, vec![]).unwrap();
        assert_eq!(empty.mean(), 0.0);
    }

    #[test]
    fn rescale_divides_by_container_headroom() {
        let frame = Frame::from_u16(2, 1, vec![65535, 16]).unwrap();
        let rescaled = frame.rescale_to_bit_depth(12).unwrap();
        assert_eq!(rescaled.bit_depth, 12);
        assert_eq!(rescaled.get(0, 0), Some(4095.0));
        assert_eq!(rescaled.get(1, 0), Some(1.0));

        assert!(frame.rescale_to_bit_depth(0).is_err());
        assert!(frame.rescale_to_bit_depth(17).is_err());
    }

    #[test]
    fn transpose_swaps_axes() {
        // 3 wide, 2 tall:
        // 0 1 2
        // 3 4 5
        let frame = Frame::from_u16(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        let t = frame.transposed();
        assert_eq!((t.width, t.height), (2, 3));
        for x in 0..3 {
            for y in 0..2 {
                assert_eq!(t.get(y, x), frame.get(x, y));
            }
        }
    }

    #[test]
    fn display_conversion_scales_to_8_bit() {
        let frame = Frame::from_f64(4, 1, vec![-5.0, 255.0, 65535.0, 70000.0]).unwrap();
        assert_eq!(frame.to_display_u8(), vec![0, 0, 255, 255]);
    }

    #[test]
    fn map_values_produces_float_frame() {
        let frame = Frame::from_u16(2, 1, vec![10, 20]).unwrap();
        let halved = frame.map_values(|p| p / 2.0);
        assert!(matches!(halved.pixels(), PixelBuffer::F64(_)));
        assert_eq!(halved.get(1, 0), Some(10.0));
    }
}
