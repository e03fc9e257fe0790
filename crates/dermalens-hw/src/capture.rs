//! The capture action: mirror, composite the guide, encode JPEG.

use crate::frame::{Frame, FrameError};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture frame unusable: {0}")]
    Frame(#[from] FrameError),
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Encoded capture artifact handed to the caller.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Sequence number of the source frame.
    pub sequence: u32,
}

impl CapturedImage {
    pub fn save(&self, path: &Path) -> Result<(), CaptureError> {
        std::fs::write(path, &self.jpeg).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = self.jpeg.len(), "capture saved");
        Ok(())
    }
}

/// Mirror `frame` into preview orientation, draw `overlay` on top at full
/// frame resolution and encode as JPEG at `quality` (1–100).
///
/// An overlay of a different size is stretched to the frame.
pub fn compose_capture(
    frame: &Frame,
    overlay: Option<&RgbaImage>,
    quality: u8,
) -> Result<CapturedImage, CaptureError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CaptureError::EmptyFrame);
    }

    let mut image = frame.to_image()?;
    imageops::flip_horizontal_in_place(&mut image);

    if let Some(overlay) = overlay {
        if overlay.dimensions() == image.dimensions() {
            imageops::overlay(&mut image, overlay, 0, 0);
        } else {
            let scaled = imageops::resize(overlay, frame.width, frame.height, FilterType::Triangle);
            imageops::overlay(&mut image, &scaled, 0, 0);
        }
    }

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&rgb)?;

    tracing::debug!(
        width = frame.width,
        height = frame.height,
        bytes = jpeg.len(),
        quality,
        "capture encoded"
    );

    Ok(CapturedImage {
        jpeg,
        width: frame.width,
        height: frame.height,
        sequence: frame.sequence,
    })
}
