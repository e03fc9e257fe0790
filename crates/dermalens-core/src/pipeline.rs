//! Per-frame orchestration: measurements → eyewear → smoothing → readiness.

use crate::config::CaptureConfig;
use crate::eyewear::{EyewearPolicy, HeuristicEyewearPolicy};
use crate::frame::RgbaView;
use crate::geometry;
use crate::readiness::{Directive, Phase, ReadinessMachine};
use crate::smoother::GlassesSmoother;
use crate::types::{DistanceHint, FaceBox, LandmarkSet, LightingHint, ValidationSnapshot};
use serde::Serialize;

/// Everything observable after one detection tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub snapshot: ValidationSnapshot,
    pub face_box: Option<FaceBox>,
    /// Mean face luminance; holds the last measured value while no face is present.
    pub brightness: f32,
    pub lighting: Option<LightingHint>,
    pub distance: Option<DistanceHint>,
    pub glasses_ratio: f32,
    pub glasses_depth: usize,
    pub stability_progress: f32,
    pub countdown: Option<u8>,
    pub phase: Phase,
    pub directive: Directive,
    /// Frame size differs from the resolution the thresholds were tuned for.
    pub resolution_mismatch: bool,
}

/// All per-session decision state. One instance per camera session.
pub struct FramePipeline {
    config: CaptureConfig,
    policy: Box<dyn EyewearPolicy + Send>,
    glasses: GlassesSmoother,
    readiness: ReadinessMachine,
    last_brightness: f32,
    mismatch_warned: bool,
}

impl FramePipeline {
    pub fn new(config: CaptureConfig) -> Self {
        let policy = HeuristicEyewearPolicy::new(config.eyewear.clone());
        Self::with_policy(config, Box::new(policy))
    }

    pub fn with_policy(config: CaptureConfig, policy: Box<dyn EyewearPolicy + Send>) -> Self {
        Self {
            glasses: GlassesSmoother::new(config.smoothing.clone()),
            readiness: ReadinessMachine::new(&config.readiness),
            policy,
            config,
            last_brightness: 0.0,
            mismatch_warned: false,
        }
    }

    /// Process one frame. `None` landmarks means no face (or a failed detector).
    pub fn process(&mut self, frame: RgbaView<'_>, landmarks: Option<&LandmarkSet>) -> TickReport {
        let resolution_mismatch = self.check_resolution(frame.width(), frame.height());

        let Some(landmarks) = landmarks else {
            self.glasses.clear();
            let snapshot = ValidationSnapshot::no_face();
            let directive = self.readiness.observe(snapshot);
            return TickReport {
                snapshot,
                face_box: None,
                brightness: self.last_brightness,
                lighting: None,
                distance: None,
                glasses_ratio: 0.0,
                glasses_depth: 0,
                stability_progress: self.readiness.progress(),
                countdown: self.readiness.countdown(),
                phase: self.readiness.phase(),
                directive,
                resolution_mismatch,
            };
        };

        let m = geometry::measure(landmarks, frame, &self.config);
        self.last_brightness = m.brightness;

        let glasses = self.policy.detect(frame, landmarks);
        let verdict = self.glasses.push(glasses);

        let snapshot = ValidationSnapshot {
            face_detected: true,
            centered: m.centered,
            lighting: m.lighting.is_good(),
            distance: m.distance.is_good(),
            looking_straight: m.looking_straight,
            no_glasses: verdict.no_glasses,
        };
        let directive = self.readiness.observe(snapshot);

        tracing::trace!(
            brightness = m.brightness,
            face_width = m.face_box.width,
            glasses,
            glasses_ratio = verdict.weighted_ratio,
            all_passed = snapshot.all_passed(),
            "frame processed"
        );

        TickReport {
            snapshot,
            face_box: Some(m.face_box),
            brightness: m.brightness,
            lighting: Some(m.lighting),
            distance: Some(m.distance),
            glasses_ratio: verdict.weighted_ratio,
            glasses_depth: verdict.depth,
            stability_progress: self.readiness.progress(),
            countdown: self.readiness.countdown(),
            phase: self.readiness.phase(),
            directive,
            resolution_mismatch,
        }
    }

    /// Countdown timer fired.
    pub fn tick_countdown(&mut self) -> Directive {
        self.readiness.tick()
    }

    /// Capture delay elapsed; `true` exactly once per pipeline.
    pub fn fire_capture(&mut self) -> bool {
        self.readiness.fire_capture()
    }

    pub fn readiness(&self) -> &ReadinessMachine {
        &self.readiness
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn check_resolution(&mut self, width: u32, height: u32) -> bool {
        let [cw, ch] = self.config.calibrated_resolution;
        let mismatch = width != cw || height != ch;
        if mismatch && !self.mismatch_warned {
            self.mismatch_warned = true;
            tracing::warn!(
                width,
                height,
                calibrated_width = cw,
                calibrated_height = ch,
                "frame resolution differs from calibration; distance and lighting thresholds may not apply"
            );
        }
        mismatch
    }
}
