//! Region of interest geometry and pixel extraction.
//!
//! A [`Region`] is a rectangle, ellipse or circle described by the bounding box
//! it is drawn into. Coordinates are in pixels with the origin at the top-left
//! corner of the frame: `x` grows to the right (columns), `y` grows down (rows).
//!
//! A pixel belongs to a region when its centre `(col + 0.5, row + 0.5)` lies
//! inside the shape. Extraction is always clipped to the frame, so a region
//! that hangs off the edge simply selects fewer pixels.

use serde::{Deserialize, Serialize};

use crate::error::{RoiError, RoiResult};
use crate::frame::Frame;

/// Shape drawn inside a region's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegionShape {
    /// Axis-aligned rectangle filling the bounding box
    #[default]
    Rectangle,
    /// Ellipse inscribed in the bounding box
    Ellipse,
    /// Circle whose diameter is the shorter side of the bounding box
    Circle,
}

/// A user-positioned region over a pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Shape inside the bounding box
    pub shape: RegionShape,
    /// Left edge of the bounding box
    pub x: f64,
    /// Top edge of the bounding box
    pub y: f64,
    /// Bounding box width
    pub width: f64,
    /// Bounding box height
    pub height: f64,
}

fn check_size(field: &str, value: f64) -> RoiResult<()> {
    if !value.is_finite() {
        return Err(RoiError::invalid_input(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(RoiError::invalid_input(field, "must not be negative"));
    }
    Ok(())
}

impl Region {
    /// Create a region, validating its geometry.
    pub fn new(shape: RegionShape, x: f64, y: f64, width: f64, height: f64) -> RoiResult<Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(RoiError::invalid_input("position", "must be finite"));
        }
        check_size("width", width)?;
        check_size("height", height)?;
        Ok(Self {
            shape,
            x,
            y,
            width,
            height,
        })
    }

    /// Rectangle shorthand.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> RoiResult<Self> {
        Self::new(RegionShape::Rectangle, x, y, width, height)
    }

    /// Circle of the given diameter whose bounding box starts at `(x, y)`.
    pub fn circle(x: f64, y: f64, diameter: f64) -> RoiResult<Self> {
        Self::new(RegionShape::Circle, x, y, diameter, diameter)
    }

    /// Region of `size` x `size` centred in a `frame_width` x `frame_height` frame.
    pub fn centered_in(
        shape: RegionShape,
        frame_width: u32,
        frame_height: u32,
        size: f64,
    ) -> RoiResult<Self> {
        Self::new(
            shape,
            (frame_width as f64 - size) / 2.0,
            (frame_height as f64 - size) / 2.0,
            size,
            size,
        )
    }

    /// Same size, moved so the bounding box touches the bottom-right corner.
    pub fn anchored_bottom_right(&self, frame_width: u32, frame_height: u32) -> Self {
        Self {
            x: frame_width as f64 - self.width,
            y: frame_height as f64 - self.height,
            ..*self
        }
    }

    /// Same size and shape, moved so the bounding box starts at `(x, y)`.
    pub fn moved_to(&self, x: f64, y: f64) -> RoiResult<Self> {
        Self::new(self.shape, x, y, self.width, self.height)
    }

    /// Resize to `size` x `size` keeping the centre fixed.
    pub fn with_size_centered(&self, size: f64) -> RoiResult<Self> {
        check_size("size", size)?;
        let (cx, cy) = self.center();
        Ok(Self {
            x: cx - size / 2.0,
            y: cy - size / 2.0,
            width: size,
            height: size,
            ..*self
        })
    }

    /// Keep the bounding box inside a `frame_width` x `frame_height` frame.
    ///
    /// Oversized regions shrink to the frame, then the box is shifted back
    /// inside the bounds.
    pub fn clamped_to(&self, frame_width: u32, frame_height: u32) -> Self {
        let (fw, fh) = (frame_width as f64, frame_height as f64);
        let width = self.width.min(fw);
        let height = self.height.min(fh);
        Self {
            shape: self.shape,
            x: self.x.clamp(0.0, fw - width),
            y: self.y.clamp(0.0, fh - height),
            width,
            height,
        }
    }

    /// Centre of the bounding box (or of the circle for circular regions).
    pub fn center(&self) -> (f64, f64) {
        match self.shape {
            RegionShape::Circle => {
                let r = self.diameter() / 2.0;
                (self.x + r, self.y + r)
            }
            _ => (self.x + self.width / 2.0, self.y + self.height / 2.0),
        }
    }

    fn diameter(&self) -> f64 {
        self.width.min(self.height)
    }

    /// Radius of a circular region.
    pub fn radius(&self) -> Option<f64> {
        (self.shape == RegionShape::Circle).then(|| self.diameter() / 2.0)
    }

    /// Whether the point `(px, py)` lies inside the shape.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        match self.shape {
            RegionShape::Rectangle => {
                px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
            }
            RegionShape::Ellipse => {
                let (rx, ry) = (self.width / 2.0, self.height / 2.0);
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let (cx, cy) = self.center();
                let (dx, dy) = ((px - cx) / rx, (py - cy) / ry);
                dx * dx + dy * dy <= 1.0
            }
            RegionShape::Circle => {
                let r = self.diameter() / 2.0;
                if r <= 0.0 {
                    return false;
                }
                let (cx, cy) = self.center();
                let (dx, dy) = (px - cx, py - cy);
                dx * dx + dy * dy <= r * r
            }
        }
    }

    /// Pixel window (col_min, col_max, row_min, row_max) overlapping the frame.
    fn pixel_window(&self, frame: &Frame) -> (u32, u32, u32, u32) {
        let clip = |v: f64, max: u32| v.max(0.0).min(max as f64) as u32;
        (
            clip(self.x.floor(), frame.width),
            clip((self.x + self.width).ceil(), frame.width),
            clip(self.y.floor(), frame.height),
            clip((self.y + self.height).ceil(), frame.height),
        )
    }

    /// Values of every frame pixel whose centre lies inside the region.
    pub fn extract(&self, frame: &Frame) -> Vec<f64> {
        let (col_min, col_max, row_min, row_max) = self.pixel_window(frame);
        let mut values = Vec::new();
        for row in row_min..row_max {
            for col in col_min..col_max {
                if self.contains(col as f64 + 0.5, row as f64 + 0.5) {
                    if let Some(v) = frame.get(col, row) {
                        values.push(v);
                    }
                }
            }
        }
        values
    }

    /// Sum and pixel count of the region without materialising the values.
    pub fn integrate(&self, frame: &Frame) -> (f64, usize) {
        let (col_min, col_max, row_min, row_max) = self.pixel_window(frame);
        let mut sum = 0.0;
        let mut count = 0;
        for row in row_min..row_max {
            for col in col_min..col_max {
                if self.contains(col as f64 + 0.5, row as f64 + 0.5) {
                    if let Some(v) = frame.get(col, row) {
                        sum += v;
                        count += 1;
                    }
                }
            }
        }
        (sum, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(width: u32, height: u32) -> Frame {
        Frame::from_u16(width, height, vec![1; (width * height) as usize]).unwrap()
    }

    #[test]
    fn rectangle_extracts_exact_window() {
        let frame = Frame::from_u16(4, 3, (0..12).collect()).unwrap();
        let roi = Region::rectangle(1.0, 1.0, 2.0, 2.0).unwrap();
        assert_eq!(roi.extract(&frame), vec![5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn extraction_is_clipped_to_frame() {
        let frame = ones(10, 10);
        let roi = Region::rectangle(-5.0, 8.0, 10.0, 10.0).unwrap();
        // columns 0..5, rows 8..10
        assert_eq!(roi.extract(&frame).len(), 10);

        let outside = Region::rectangle(20.0, 20.0, 5.0, 5.0).unwrap();
        assert!(outside.extract(&frame).is_empty());
    }

    #[test]
    fn circle_area_approximates_pi_r_squared() {
        let frame = ones(200, 200);
        let roi = Region::circle(50.0, 50.0, 100.0).unwrap();
        let (sum, count) = roi.integrate(&frame);
        let expected = std::f64::consts::PI * 50.0 * 50.0;
        assert_eq!(sum, count as f64);
        assert!((count as f64 - expected).abs() / expected < 0.01);
    }

    #[test]
    fn circle_uses_shorter_side() {
        let roi = Region::new(RegionShape::Circle, 0.0, 0.0, 10.0, 4.0).unwrap();
        assert_eq!(roi.radius(), Some(2.0));
        assert_eq!(roi.center(), (2.0, 2.0));
        assert!(!roi.contains(8.0, 2.0));
    }

    #[test]
    fn ellipse_is_inscribed() {
        let roi = Region::new(RegionShape::Ellipse, 0.0, 0.0, 10.0, 4.0).unwrap();
        assert!(roi.contains(5.0, 2.0));
        assert!(roi.contains(9.5, 2.0));
        assert!(!roi.contains(9.5, 0.5));
        assert_eq!(roi.radius(), None);
    }

    #[test]
    fn degenerate_shapes_select_nothing() {
        let frame = ones(5, 5);
        let roi = Region::circle(2.0, 2.0, 0.0).unwrap();
        assert!(roi.extract(&frame).is_empty());
    }

    #[test]
    fn resize_keeps_center() {
        let roi = Region::circle(10.0, 10.0, 20.0).unwrap();
        let resized = roi.with_size_centered(40.0).unwrap();
        assert_eq!(resized.center(), (20.0, 20.0));
        assert_eq!(resized.radius(), Some(20.0));
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert!(Region::rectangle(0.0, 0.0, -1.0, 5.0).is_err());
        assert!(Region::rectangle(f64::NAN, 0.0, 1.0, 5.0).is_err());
        let roi = Region::circle(0.0, 0.0, 10.0).unwrap();
        assert!(roi.with_size_centered(f64::INFINITY).is_err());
    }

    #[test]
    fn clamping_keeps_box_inside_frame() {
        let roi = Region::rectangle(95.0, -3.0, 10.0, 10.0).unwrap();
        let clamped = roi.clamped_to(100, 50);
        assert_eq!((clamped.x, clamped.y), (90.0, 0.0));

        let huge = Region::rectangle(0.0, 0.0, 300.0, 300.0).unwrap();
        let clamped = huge.clamped_to(100, 50);
        assert_eq!((clamped.width, clamped.height), (100.0, 50.0));
    }

    #[test]
    fn default_placement_helpers() {
        let centered = Region::centered_in(RegionShape::Circle, 640, 480, 100.0).unwrap();
        assert_eq!((centered.x, centered.y), (270.0, 190.0));

        let bg = Region::rectangle(0.0, 0.0, 300.0, 300.0)
            .unwrap()
            .anchored_bottom_right(640, 480);
        assert_eq!((bg.x, bg.y), (340.0, 180.0));
    }
}
