//! Frame type and pixel conversion — YUYV/GREY to RGBA, dark detection.

use dermalens_core::frame::{RgbaView, ViewError, RGBA_CHANNELS};
use image::RgbaImage;

/// A captured RGBA camera frame.
#[derive(Clone)]
pub struct Frame {
    /// RGBA8 pixel data (width * height * 4 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
    pub is_dark: bool,
}

impl Frame {
    /// Wrap an RGBA buffer, checking its length.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        let is_dark = is_dark_frame(&data, 0.95);
        Ok(Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
            is_dark,
        })
    }

    pub fn from_image(image: RgbaImage, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        let data = image.into_raw();
        let is_dark = is_dark_frame(&data, 0.95);
        Self {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
            is_dark,
        }
    }

    pub fn to_image(&self) -> Result<RgbaImage, FrameError> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::InvalidLength {
                expected: self.width as usize * self.height as usize * RGBA_CHANNELS,
                actual: self.data.len(),
            },
        )
    }

    /// Borrowed view for the analysis core.
    pub fn view(&self) -> Result<RgbaView<'_>, FrameError> {
        Ok(RgbaView::new(&self.data, self.width, self.height)?)
    }

    /// Average luminance (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        let pixels = self.data.len() / RGBA_CHANNELS;
        if pixels == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .data
            .chunks_exact(RGBA_CHANNELS)
            .map(|px| (px[0] as u64 + px[1] as u64 + px[2] as u64) / 3)
            .sum();
        sum as f32 / pixels as f32
    }
}

/// Convert packed YUYV (4:2:2) to RGBA using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share chroma.
pub fn yuyv_to_rgba(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgba = Vec::with_capacity(expected * 2);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            let r = y + 1.402 * v;
            let g = y - 0.344_136 * u - 0.714_136 * v;
            let b = y + 1.772 * u;
            rgba.extend_from_slice(&[clamp_u8(r), clamp_u8(g), clamp_u8(b), 255]);
        }
    }
    Ok(rgba)
}

/// Expand 8-bit grayscale to opaque RGBA.
pub fn grey_to_rgba(gray: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = (width * height) as usize;
    if gray.len() < pixels {
        return Err(FrameError::InvalidLength {
            expected: pixels,
            actual: gray.len(),
        });
    }
    Ok(gray[..pixels].iter().flat_map(|&g| [g, g, g, 255]).collect())
}

/// Check if an RGBA frame is dark.
///
/// Returns true if more than `threshold_pct` of pixels have luminance below 32.
pub fn is_dark_frame(rgba: &[u8], threshold_pct: f32) -> bool {
    let pixels = rgba.len() / RGBA_CHANNELS;
    if pixels == 0 {
        return true;
    }
    let dark_count = rgba
        .chunks_exact(RGBA_CHANNELS)
        .filter(|px| (px[0] as u32 + px[1] as u32 + px[2] as u32) / 3 < 32)
        .count();
    (dark_count as f32 / pixels as f32) > threshold_pct
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("frame source failed: {0}")]
    Source(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_grey() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let yuyv = vec![100, 128, 200, 128];
        let rgba = yuyv_to_rgba(&yuyv, 2, 1).unwrap();
        assert_eq!(rgba, vec![100, 100, 100, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // Strong V pushes red up and green down.
        let rgba = yuyv_to_rgba(&[100, 128, 100, 200], 2, 1).unwrap();
        assert!(rgba[0] > 190, "r = {}", rgba[0]);
        assert!(rgba[1] < 60, "g = {}", rgba[1]);
        assert_eq!(rgba[2], 100);
        assert_eq!(&rgba[..4], &rgba[4..]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        assert!(matches!(
            yuyv_to_rgba(&yuyv, 2, 1),
            Err(FrameError::InvalidLength { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_grey_expands_to_rgba() {
        let rgba = grey_to_rgba(&[7, 9], 2, 1).unwrap();
        assert_eq!(rgba, vec![7, 7, 7, 255, 9, 9, 9, 255]);
        assert!(grey_to_rgba(&[7], 2, 1).is_err());
    }

    #[test]
    fn test_dark_frame_all_black() {
        assert!(is_dark_frame(&[0u8; 4000], 0.95));
    }

    #[test]
    fn test_dark_frame_normal() {
        let rgba: Vec<u8> = [128, 128, 128, 255].repeat(1000);
        assert!(!is_dark_frame(&rgba, 0.95));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], 0.95));
    }

    #[test]
    fn test_dark_frame_borderline_bright() {
        // 94% dark, 6% bright → should NOT be dark
        let mut rgba = [10, 10, 10, 255].repeat(940);
        rgba.extend([128, 128, 128, 255].repeat(60));
        assert!(!is_dark_frame(&rgba, 0.95));
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Frame::from_rgba(vec![0; 15], 2, 2, 0).is_err());
        let frame = Frame::from_rgba([90, 120, 150, 255].repeat(4), 2, 2, 3).unwrap();
        assert_eq!(frame.sequence, 3);
        assert!(!frame.is_dark);
        assert_eq!(frame.avg_brightness(), 120.0);
        assert_eq!(frame.view().unwrap().luminance(1, 1), 120.0);
    }

    #[test]
    fn test_image_conversion_keeps_pixels() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgba([1, 2, 3, 4]));
        let frame = Frame::from_image(img.clone(), 0);
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.to_image().unwrap(), img);
    }
}
