//! Frame files.
//!
//! Frames are exchanged as headerless CSV: one image row per line, one pixel
//! per field. Files whose values are all whole numbers in `0..=65535` load as
//! 16-bit frames; anything else loads as floating point.

use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use roi_core::Frame;
use tracing::debug;

/// Read a frame from a CSV file.
pub fn load_csv_frame(path: impl AsRef<Path>) -> Result<Frame> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open frame file '{}'", path.display()))?;

    let mut width = None;
    let mut height = 0u32;
    let mut values = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Malformed CSV in '{}'", path.display()))?;
        let row_width = record.len();
        match width {
            None => width = Some(row_width),
            Some(w) if w != row_width => bail!(
                "Row {} of '{}' has {} pixels, expected {}",
                line + 1,
                path.display(),
                row_width,
                w
            ),
            Some(_) => {}
        }
        for (column, field) in record.iter().enumerate() {
            let value: f64 = field.parse().with_context(|| {
                format!("Pixel ({}, {}) is not a number: '{}'", column, line, field)
            })?;
            values.push(value);
        }
        height += 1;
    }

    let width = match width {
        Some(w) if w > 0 => w as u32,
        _ => bail!("Frame file '{}' contains no pixels", path.display()),
    };

    let integral = values
        .iter()
        .all(|v| v.fract() == 0.0 && (0.0..=u16::MAX as f64).contains(v));
    let frame = if integral {
        Frame::from_u16(width, height, values.into_iter().map(|v| v as u16).collect())?
    } else {
        Frame::from_f64(width, height, values)?
    };
    debug!(width, height, bit_depth = frame.bit_depth, path = %path.display(), "Loaded frame");
    Ok(frame)
}

/// Write a frame as CSV, one image row per line.
pub fn save_csv_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create frame file '{}'", path.display()))?;

    let values: Vec<String> = frame.values().map(|v| v.to_string()).collect();
    for row in values.chunks(frame.width.max(1) as usize) {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
