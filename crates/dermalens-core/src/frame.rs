//! Borrowed RGBA pixel view over a camera frame.

use thiserror::Error;

/// Bytes per pixel in the RGBA8 layout.
pub const RGBA_CHANNELS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("RGBA buffer too short for {width}x{height}: expected {expected}, got {actual}")]
    BufferTooShort {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Row-major RGBA8 pixels (the canvas `ImageData` layout), borrowed for one tick.
#[derive(Debug, Clone, Copy)]
pub struct RgbaView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> RgbaView<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, ViewError> {
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if data.len() < expected {
            return Err(ViewError::BufferTooShort {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// RGB channels at (x, y). Callers keep coordinates in bounds.
    #[inline]
    pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width as usize + x) * RGBA_CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Unweighted luminance (R+G+B)/3 on the 0–255 scale.
    #[inline]
    pub fn luminance(&self, x: usize, y: usize) -> f32 {
        let [r, g, b] = self.rgb(x, y);
        (r as f32 + g as f32 + b as f32) / 3.0
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }
}
