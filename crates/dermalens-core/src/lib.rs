//! dermalens-core — Live capture gating for selfie skin analysis.
//!
//! Turns a per-frame facial landmark set and the frame's pixels into a
//! validation snapshot (centering, lighting, distance, pose, eyewear),
//! smooths the noisy signals over time, and drives the 3-2-1 countdown
//! that decides when a frame is good enough to capture.

pub mod config;
pub mod eyewear;
pub mod frame;
pub mod geometry;
pub mod landmarks;
pub mod pipeline;
pub mod readiness;
pub mod smoother;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use config::CaptureConfig;
pub use eyewear::{EyewearPolicy, HeuristicEyewearPolicy};
pub use frame::RgbaView;
pub use landmarks::{DetectError, LandmarkSource};
pub use pipeline::{FramePipeline, TickReport};
pub use readiness::{Directive, Phase, ReadinessMachine};
pub use types::{
    DistanceHint, FaceBox, Landmark, LandmarkError, LandmarkSet, LightingHint,
    ValidationSnapshot, FACE_MESH_POINTS,
};
