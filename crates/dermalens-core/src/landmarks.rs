//! Face-mesh anatomical indices and the landmark source contract.
//!
//! Indices follow the 468-point face mesh topology.

use crate::frame::RgbaView;
use crate::types::LandmarkSet;
use thiserror::Error;

pub const NOSE_TIP: usize = 4;
pub const NOSE_BRIDGE: usize = 6;
pub const LEFT_EYE_OUTER: usize = 33;
pub const LEFT_EYE_INNER: usize = 133;
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const RIGHT_EYE_INNER: usize = 362;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;
pub const LEFT_TEMPLE: usize = 234;
pub const RIGHT_TEMPLE: usize = 454;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("landmark detector unavailable: {0}")]
    Unavailable(String),
    #[error("landmark detection failed: {0}")]
    Failed(String),
    #[error("malformed landmark set: {0}")]
    Malformed(#[from] crate::types::LandmarkError),
}

/// Produces at most one face's landmarks per frame.
///
/// `Ok(None)` means no face. Errors are absorbed by the session and
/// treated the same as no face for that tick.
pub trait LandmarkSource {
    fn detect(
        &mut self,
        frame: RgbaView<'_>,
        timestamp_ms: f64,
    ) -> Result<Option<LandmarkSet>, DetectError>;
}
