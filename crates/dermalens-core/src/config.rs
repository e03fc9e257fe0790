//! Tunable thresholds for capture gating.
//!
//! Defaults reproduce the production tuning. Distance and lighting limits
//! were calibrated at a single capture resolution (`calibrated_resolution`);
//! frames of any other size are still processed with the same numbers and
//! flagged by the pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// All gating thresholds, grouped by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frame size (width, height) the pixel thresholds were tuned for.
    pub calibrated_resolution: [u32; 2],
    pub viewport: ViewportConfig,
    pub lighting: LightingConfig,
    pub distance: DistanceConfig,
    pub pose: PoseConfig,
    pub eyewear: EyewearThresholds,
    pub smoothing: SmoothingConfig,
    pub readiness: ReadinessConfig,
    pub timing: TimingConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            calibrated_resolution: [390, 844],
            viewport: ViewportConfig::default(),
            lighting: LightingConfig::default(),
            distance: DistanceConfig::default(),
            pose: PoseConfig::default(),
            eyewear: EyewearThresholds::default(),
            smoothing: SmoothingConfig::default(),
            readiness: ReadinessConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl CaptureConfig {
    /// Parse a (possibly partial) TOML document; missing keys keep defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), "loaded capture config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the state machine or smoother cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.lighting.min_brightness >= self.lighting.max_brightness {
            return invalid("lighting.min_brightness must be below lighting.max_brightness");
        }
        if self.distance.min_face_width >= self.distance.max_face_width {
            return invalid("distance.min_face_width must be below distance.max_face_width");
        }
        if self.lighting.sample_stride == 0 {
            return invalid("lighting.sample_stride must be at least 1");
        }
        if self.eyewear.scan.temple_stride == 0 {
            return invalid("eyewear.scan.temple_stride must be at least 1");
        }
        if self.smoothing.glasses_window == 0 {
            return invalid("smoothing.glasses_window must be at least 1");
        }
        if self.smoothing.partial_depth > self.smoothing.full_depth {
            return invalid("smoothing.partial_depth must not exceed smoothing.full_depth");
        }
        if self.smoothing.full_depth > self.smoothing.glasses_window {
            return invalid("smoothing.full_depth must not exceed smoothing.glasses_window");
        }
        if self.readiness.streak_length == 0 {
            return invalid("readiness.streak_length must be at least 1");
        }
        if self.readiness.countdown_from == 0 {
            return invalid("readiness.countdown_from must be at least 1");
        }
        if self.timing.detection_interval_ms == 0 || self.timing.countdown_interval_ms == 0 {
            return invalid("timing intervals must be non-zero");
        }
        if !(1..=100).contains(&self.timing.jpeg_quality) {
            return invalid("timing.jpeg_quality must be within 1..=100");
        }
        Ok(())
    }
}

/// On-screen portrait guide the face must sit in, in logical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub max_offset_x: f32,
    pub max_offset_y: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
            max_offset_x: 60.0,
            max_offset_y: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Exclusive lower bound on mean face luminance (0–255).
    pub min_brightness: f32,
    /// Exclusive upper bound on mean face luminance (0–255).
    pub max_brightness: f32,
    /// Sample every Nth pixel of the face region (5 px = every 20th RGBA byte).
    pub sample_stride: usize,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            min_brightness: 60.0,
            max_brightness: 220.0,
            sample_stride: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Exclusive face-box width bounds in frame pixels.
    pub min_face_width: f32,
    pub max_face_width: f32,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            min_face_width: 150.0,
            max_face_width: 450.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Nose offset from the eye midpoint, relative to eye distance.
    pub max_asymmetry: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self { max_asymmetry: 0.15 }
    }
}

/// Eyewear classifier tuning: pixel scan, score weights, and signal policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EyewearThresholds {
    pub scan: ScanThresholds,
    pub weights: EyewearWeights,
    pub signals: SignalPolicy,
}

/// Per-pixel classification limits and region geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanThresholds {
    /// Eye box growth, as a multiple of the eye's own width/height, to cover rims.
    pub eye_expand_x: f32,
    pub eye_expand_y: f32,
    pub bridge_half_size: i64,
    pub temple_half_size: i64,
    pub temple_stride: usize,
    pub reflective_min_luminance: f32,
    pub reflective_max_variance: u32,
    pub bright_min_luminance: f32,
    pub medium_bright_range: [f32; 2],
    pub smooth_max_variance: u32,
    pub edge_min: f32,
    pub sharp_edge_min: f32,
    pub dark_edge_min: f32,
    pub dark_edge_max_luminance: f32,
    pub bridge_edge_min: f32,
    pub temple_edge_min: f32,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            eye_expand_x: 1.5,
            eye_expand_y: 2.0,
            bridge_half_size: 40,
            temple_half_size: 25,
            temple_stride: 2,
            reflective_min_luminance: 140.0,
            reflective_max_variance: 60,
            bright_min_luminance: 160.0,
            medium_bright_range: [120.0, 180.0],
            smooth_max_variance: 20,
            edge_min: 25.0,
            sharp_edge_min: 50.0,
            dark_edge_min: 20.0,
            dark_edge_max_luminance: 120.0,
            bridge_edge_min: 25.0,
            temple_edge_min: 20.0,
        }
    }
}

/// Score weights; the defaults sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyewearWeights {
    pub reflection: f32,
    pub bright: f32,
    pub edge: f32,
    pub sharp_edge: f32,
    pub dark_edge: f32,
    pub bridge_reflection: f32,
    pub bridge_edge: f32,
    pub temple_edge: f32,
}

impl Default for EyewearWeights {
    fn default() -> Self {
        Self {
            reflection: 0.25,
            bright: 0.15,
            edge: 0.15,
            sharp_edge: 0.10,
            dark_edge: 0.10,
            bridge_reflection: 0.10,
            bridge_edge: 0.08,
            temple_edge: 0.07,
        }
    }
}

/// A ratio counts as a signal above `signal`, and as a strong signal above `strong`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThreshold {
    pub signal: f32,
    pub strong: f32,
}

impl SignalThreshold {
    pub const fn new(signal: f32, strong: f32) -> Self {
        Self { signal, strong }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalPolicy {
    pub score_floor: f32,
    pub min_signals: u32,
    /// Smooth lens surface: smooth ratio and bright ratio both above these.
    pub smooth_bright: [f32; 2],
    /// Dark frame rims: dark-edge ratio and edge ratio both above these.
    pub dark_frames: [f32; 2],
    pub very_strong_reflection: f32,
    pub very_strong_bridge_reflection: f32,
    /// Bridge bright ratio and bridge edge ratio both above these.
    pub very_strong_bridge_pair: [f32; 2],
    pub very_strong_temple_edge: f32,
    pub reflection: SignalThreshold,
    pub bright: SignalThreshold,
    pub edge: SignalThreshold,
    pub sharp_edge: SignalThreshold,
    pub bridge_reflection: SignalThreshold,
    pub bridge_bright: SignalThreshold,
    pub bridge_edge: SignalThreshold,
    pub temple_edge: SignalThreshold,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            score_floor: 0.07,
            min_signals: 2,
            smooth_bright: [0.32, 0.16],
            dark_frames: [0.10, 0.12],
            very_strong_reflection: 0.20,
            very_strong_bridge_reflection: 0.32,
            very_strong_bridge_pair: [0.35, 0.20],
            very_strong_temple_edge: 0.33,
            reflection: SignalThreshold::new(0.12, 0.18),
            bright: SignalThreshold::new(0.10, 0.15),
            edge: SignalThreshold::new(0.12, 0.17),
            sharp_edge: SignalThreshold::new(0.05, 0.08),
            bridge_reflection: SignalThreshold::new(0.22, 0.30),
            bridge_bright: SignalThreshold::new(0.27, 0.35),
            bridge_edge: SignalThreshold::new(0.16, 0.22),
            temple_edge: SignalThreshold::new(0.25, 0.32),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub glasses_window: usize,
    /// History depth at which the strict weighted threshold applies.
    pub full_depth: usize,
    pub full_threshold: f32,
    /// History depth at which the looser weighted threshold applies;
    /// below it the smoother falls back to a majority vote.
    pub partial_depth: usize,
    pub partial_threshold: f32,
    /// Weight of the oldest sample; the newest gets `weight_base + weight_span`.
    pub weight_base: f32,
    pub weight_span: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            glasses_window: 10,
            full_depth: 10,
            full_threshold: 0.40,
            partial_depth: 5,
            partial_threshold: 0.35,
            weight_base: 0.5,
            weight_span: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Consecutive all-pass frames required before the countdown starts.
    pub streak_length: usize,
    pub countdown_from: u8,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            streak_length: 2,
            countdown_from: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub detection_interval_ms: u64,
    pub countdown_interval_ms: u64,
    /// Pause after the countdown reaches zero so the final digit renders.
    pub capture_delay_ms: u64,
    pub jpeg_quality: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 100,
            countdown_interval_ms: 1000,
            capture_delay_ms: 100,
            jpeg_quality: 95,
        }
    }
}
