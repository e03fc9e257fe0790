//! Recorded sessions: a directory of frames plus a JSON landmark track.
//!
//! The track is a JSON array with one entry per frame: either an array of
//! 468 `{"x": .., "y": ..}` points in normalized coordinates, or `null` for
//! frames without a face.

use anyhow::{bail, Context, Result};
use dermalens_core::{DetectError, LandmarkSet, LandmarkSource, RgbaView};
use dermalens_hw::Frame;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Decode every image in `dir`, ordered by file name.
pub fn load_frames(dir: &Path) -> Result<Vec<Frame>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading frame directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("no image files in {}", dir.display());
    }

    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let image = image::open(path)
                .with_context(|| format!("decoding {}", path.display()))?
                .to_rgba8();
            Ok(Frame::from_image(image, i as u32))
        })
        .collect()
}

/// Parse a landmark track.
pub fn parse_track(json: &str) -> Result<Vec<Option<LandmarkSet>>> {
    serde_json::from_str(json).context("parsing landmark track")
}

pub fn load_track(path: &Path) -> Result<Vec<Option<LandmarkSet>>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading landmark track {}", path.display()))?;
    parse_track(&json)
}

/// Landmark source that replays a recorded track, one entry per detection.
///
/// Once the track is exhausted the final entry is repeated, matching a
/// frame source that holds its last frame.
pub struct ReplayLandmarks {
    track: VecDeque<Option<LandmarkSet>>,
    last: Option<LandmarkSet>,
}

impl ReplayLandmarks {
    pub fn new(track: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            track: track.into(),
            last: None,
        }
    }
}

impl LandmarkSource for ReplayLandmarks {
    fn detect(&mut self, _frame: RgbaView<'_>, _timestamp_ms: f64) -> Result<Option<LandmarkSet>, DetectError> {
        if let Some(entry) = self.track.pop_front() {
            self.last = entry;
        }
        Ok(self.last.clone())
    }
}
