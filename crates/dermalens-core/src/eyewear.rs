//! Heuristic eyewear detection from pixel statistics around the eyes.
//!
//! No model: the eye boxes (grown to cover frame rims), a square over the
//! nose bridge and two squares over the temples are scanned for
//! reflectivity, brightness and edge density. The resulting ratios feed a
//! weighted score and a signal count; a frame is flagged only when the
//! score clears a floor AND the evidence is either broad (several signals)
//! or overwhelming (one very strong cue).
//!
//! The verdict is per frame; temporal stability lives in [`crate::smoother`].

use crate::config::{EyewearThresholds, EyewearWeights, ScanThresholds, SignalPolicy, SignalThreshold};
use crate::frame::RgbaView;
use crate::landmarks::*;
use crate::types::{Landmark, LandmarkSet};
use serde::Serialize;

/// Decides whether eyewear is visible in one frame.
pub trait EyewearPolicy {
    fn detect(&mut self, frame: RgbaView<'_>, landmarks: &LandmarkSet) -> bool;
}

/// Half-open pixel rectangle [x0, x1) × [y0, y1); may extend past the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl PixelRect {
    fn square(cx: i64, cy: i64, half: i64) -> Self {
        Self {
            x0: cx.saturating_sub(half),
            y0: cy.saturating_sub(half),
            x1: cx.saturating_add(half),
            y1: cy.saturating_add(half),
        }
    }
}

/// Scan regions for one frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EyewearRegions {
    pub eyes: [PixelRect; 2],
    pub bridge: PixelRect,
    pub temples: [PixelRect; 2],
}

impl EyewearRegions {
    pub fn locate(landmarks: &LandmarkSet, width: u32, height: u32, scan: &ScanThresholds) -> Self {
        // Far-off landmarks are pinned one frame beyond each edge.
        let pin = |v: f32, extent: u32| {
            let extent = extent as i64;
            (v * extent as f32).floor().clamp(-extent as f32, (2 * extent) as f32) as i64
        };
        let px = |p: Landmark| (pin(p.x, width), pin(p.y, height));

        let eye = |left: usize, right: usize, top: usize, bottom: usize| {
            let (lx, _) = px(landmarks.get(left));
            let (rx, _) = px(landmarks.get(right));
            let (_, ty) = px(landmarks.get(top));
            let (_, by) = px(landmarks.get(bottom));

            let expand_x = ((rx - lx).abs() as f32 * scan.eye_expand_x).floor() as i64;
            let expand_y = ((by - ty).abs() as f32 * scan.eye_expand_y).floor() as i64;

            PixelRect {
                x0: (lx.min(rx) - expand_x).max(0),
                x1: (lx.max(rx) + expand_x).min(width as i64),
                y0: (ty.min(by) - expand_y).max(0),
                y1: (ty.max(by) + expand_y).min(height as i64),
            }
        };

        let (bx, by) = px(landmarks.get(NOSE_BRIDGE));
        let (ltx, lty) = px(landmarks.get(LEFT_TEMPLE));
        let (rtx, rty) = px(landmarks.get(RIGHT_TEMPLE));

        Self {
            eyes: [
                eye(LEFT_EYE_OUTER, LEFT_EYE_INNER, LEFT_EYE_TOP, LEFT_EYE_BOTTOM),
                eye(RIGHT_EYE_INNER, RIGHT_EYE_OUTER, RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM),
            ],
            bridge: PixelRect::square(bx, by, scan.bridge_half_size),
            temples: [
                PixelRect::square(ltx, lty, scan.temple_half_size),
                PixelRect::square(rtx, rty, scan.temple_half_size),
            ],
        }
    }
}

/// Frame-level pixel ratios, each in [0, 1] except `texture_variance`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EyewearRatios {
    pub reflection: f32,
    pub bright: f32,
    pub medium_bright: f32,
    pub edge: f32,
    pub sharp_edge: f32,
    pub dark_edge: f32,
    pub smooth: f32,
    /// Mean RGB spread per eye-region pixel.
    pub texture_variance: f32,
    pub bridge_reflection: f32,
    pub bridge_bright: f32,
    pub bridge_edge: f32,
    pub temple_edge: f32,
}

#[derive(Default)]
struct EyeCounts {
    pixels: u32,
    reflective: u32,
    bright: u32,
    medium_bright: u32,
    edge: u32,
    sharp_edge: u32,
    dark_edge: u32,
    smooth: u32,
    variance: u64,
}

#[derive(Default)]
struct BridgeCounts {
    pixels: u32,
    reflective: u32,
    bright: u32,
    edge: u32,
}

/// |r−g| + |g−b| + |b−r|: near zero for grey/white (lens glare), large for skin.
#[inline]
fn channel_spread([r, g, b]: [u8; 3]) -> u32 {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    ((r - g).abs() + (g - b).abs() + (b - r).abs()) as u32
}

fn ratio(count: u32, total: u32) -> f32 {
    if total > 0 {
        count as f32 / total as f32
    } else {
        0.0
    }
}

fn scan_eye(frame: RgbaView<'_>, rect: &PixelRect, scan: &ScanThresholds, c: &mut EyeCounts) {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            if !frame.contains(x, y) {
                continue;
            }
            let (x, y) = (x as usize, y as usize);
            let rgb = frame.rgb(x, y);
            let lum = frame.luminance(x, y);
            let spread = channel_spread(rgb);

            c.pixels += 1;
            c.variance += spread as u64;
            if lum > scan.reflective_min_luminance && spread < scan.reflective_max_variance {
                c.reflective += 1;
            }
            if lum > scan.bright_min_luminance {
                c.bright += 1;
            }
            if lum > scan.medium_bright_range[0] && lum < scan.medium_bright_range[1] {
                c.medium_bright += 1;
            }
            if spread < scan.smooth_max_variance {
                c.smooth += 1;
            }

            if x + 1 < w && y + 1 < h {
                let edge = (lum - frame.luminance(x + 1, y))
                    .abs()
                    .max((lum - frame.luminance(x, y + 1)).abs())
                    .max((lum - frame.luminance(x + 1, y + 1)).abs());
                if edge > scan.edge_min {
                    c.edge += 1;
                }
                if edge > scan.sharp_edge_min {
                    c.sharp_edge += 1;
                }
                if edge > scan.dark_edge_min && lum < scan.dark_edge_max_luminance {
                    c.dark_edge += 1;
                }
            }
        }
    }
}

fn scan_bridge(frame: RgbaView<'_>, rect: &PixelRect, scan: &ScanThresholds) -> BridgeCounts {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let mut c = BridgeCounts::default();
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            if !frame.contains(x, y) {
                continue;
            }
            let (x, y) = (x as usize, y as usize);
            let lum = frame.luminance(x, y);

            c.pixels += 1;
            if lum > scan.reflective_min_luminance
                && channel_spread(frame.rgb(x, y)) < scan.reflective_max_variance
            {
                c.reflective += 1;
            }
            if lum > scan.bright_min_luminance {
                c.bright += 1;
            }
            if x + 1 < w && y + 1 < h && (lum - frame.luminance(x + 1, y)).abs() > scan.bridge_edge_min {
                c.edge += 1;
            }
        }
    }
    c
}

/// Horizontal edge hits and sampled pixels over one temple square.
fn scan_temple(frame: RgbaView<'_>, rect: &PixelRect, scan: &ScanThresholds) -> (u32, u32) {
    let w = frame.width() as i64;
    let (mut edges, mut pixels) = (0u32, 0u32);
    for y in (rect.y0..rect.y1).step_by(scan.temple_stride.max(1)) {
        for x in (rect.x0..rect.x1).step_by(scan.temple_stride.max(1)) {
            if !frame.contains(x, y) || x + 1 >= w {
                continue;
            }
            pixels += 1;
            let (x, y) = (x as usize, y as usize);
            if (frame.luminance(x, y) - frame.luminance(x + 1, y)).abs() > scan.temple_edge_min {
                edges += 1;
            }
        }
    }
    (edges, pixels)
}

/// Scan all regions and reduce the pixel counts to ratios.
pub fn scan(frame: RgbaView<'_>, regions: &EyewearRegions, thresholds: &ScanThresholds) -> EyewearRatios {
    let mut eyes = EyeCounts::default();
    for rect in &regions.eyes {
        scan_eye(frame, rect, thresholds, &mut eyes);
    }
    let bridge = scan_bridge(frame, &regions.bridge, thresholds);
    let (temple_edges, temple_pixels) = regions
        .temples
        .iter()
        .map(|rect| scan_temple(frame, rect, thresholds))
        .fold((0, 0), |(e, p), (de, dp)| (e + de, p + dp));

    EyewearRatios {
        reflection: ratio(eyes.reflective, eyes.pixels),
        bright: ratio(eyes.bright, eyes.pixels),
        medium_bright: ratio(eyes.medium_bright, eyes.pixels),
        edge: ratio(eyes.edge, eyes.pixels),
        sharp_edge: ratio(eyes.sharp_edge, eyes.pixels),
        dark_edge: ratio(eyes.dark_edge, eyes.pixels),
        smooth: ratio(eyes.smooth, eyes.pixels),
        texture_variance: if eyes.pixels > 0 {
            eyes.variance as f32 / eyes.pixels as f32
        } else {
            0.0
        },
        bridge_reflection: ratio(bridge.reflective, bridge.pixels),
        bridge_bright: ratio(bridge.bright, bridge.pixels),
        bridge_edge: ratio(bridge.edge, bridge.pixels),
        temple_edge: ratio(temple_edges, temple_pixels),
    }
}

/// Combined evidence for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EyewearVerdict {
    pub score: f32,
    /// Names of the signals that fired, for diagnostics.
    pub signals: Vec<&'static str>,
    pub strong_signals: u32,
    pub very_strong: bool,
    pub detected: bool,
}

pub fn weighted_score(r: &EyewearRatios, w: &EyewearWeights) -> f32 {
    r.reflection * w.reflection
        + r.bright * w.bright
        + r.edge * w.edge
        + r.sharp_edge * w.sharp_edge
        + r.dark_edge * w.dark_edge
        + r.bridge_reflection * w.bridge_reflection
        + r.bridge_edge * w.bridge_edge
        + r.temple_edge * w.temple_edge
}

pub fn classify(r: &EyewearRatios, weights: &EyewearWeights, policy: &SignalPolicy) -> EyewearVerdict {
    let score = weighted_score(r, weights);

    let mut signals = Vec::new();
    let mut strong_signals = 0u32;
    let tiered: [(&'static str, f32, SignalThreshold); 8] = [
        ("reflection", r.reflection, policy.reflection),
        ("bright", r.bright, policy.bright),
        ("edges", r.edge, policy.edge),
        ("sharp-edges", r.sharp_edge, policy.sharp_edge),
        ("bridge-reflection", r.bridge_reflection, policy.bridge_reflection),
        ("bridge-bright", r.bridge_bright, policy.bridge_bright),
        ("bridge-edges", r.bridge_edge, policy.bridge_edge),
        ("temple", r.temple_edge, policy.temple_edge),
    ];
    for (name, value, threshold) in tiered {
        if value > threshold.signal {
            signals.push(name);
            if value > threshold.strong {
                strong_signals += 1;
            }
        }
    }
    if r.smooth > policy.smooth_bright[0] && r.bright > policy.smooth_bright[1] {
        signals.push("smooth+bright");
    }
    if r.dark_edge > policy.dark_frames[0] && r.edge > policy.dark_frames[1] {
        signals.push("dark-frames");
    }

    let very_strong = r.reflection > policy.very_strong_reflection
        || r.bridge_reflection > policy.very_strong_bridge_reflection
        || (r.bridge_bright > policy.very_strong_bridge_pair[0]
            && r.bridge_edge > policy.very_strong_bridge_pair[1])
        || r.temple_edge > policy.very_strong_temple_edge
        || strong_signals >= 1;

    let detected = score > policy.score_floor
        && (signals.len() as u32 >= policy.min_signals || very_strong);

    EyewearVerdict { score, signals, strong_signals, very_strong, detected }
}

/// The default hand-tuned classifier.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEyewearPolicy {
    thresholds: EyewearThresholds,
}

impl HeuristicEyewearPolicy {
    pub fn new(thresholds: EyewearThresholds) -> Self {
        Self { thresholds }
    }

    /// Full analysis with intermediate ratios, for logging and diagnostics.
    pub fn evaluate(&self, frame: RgbaView<'_>, landmarks: &LandmarkSet) -> (EyewearRatios, EyewearVerdict) {
        let t = &self.thresholds;
        let regions = EyewearRegions::locate(landmarks, frame.width(), frame.height(), &t.scan);
        let ratios = scan(frame, &regions, &t.scan);
        let verdict = classify(&ratios, &t.weights, &t.signals);
        (ratios, verdict)
    }
}

impl EyewearPolicy for HeuristicEyewearPolicy {
    fn detect(&mut self, frame: RgbaView<'_>, landmarks: &LandmarkSet) -> bool {
        let (r, verdict) = self.evaluate(frame, landmarks);
        tracing::debug!(
            reflection = r.reflection,
            bright = r.bright,
            edge = r.edge,
            sharp = r.sharp_edge,
            dark = r.dark_edge,
            smooth = r.smooth,
            bridge = r.bridge_reflection,
            bridge_bright = r.bridge_bright,
            bridge_edge = r.bridge_edge,
            temple = r.temple_edge,
            score = verdict.score,
            signals = ?verdict.signals,
            detected = verdict.detected,
            "eyewear scan"
        );
        verdict.detected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{centered_box, paint_rect, synthetic_face, uniform_frame};

    const W: u32 = 390;
    const H: u32 = 844;
    const SKIN: [u8; 3] = [200, 150, 120];

    fn verdict(r: &EyewearRatios) -> EyewearVerdict {
        classify(r, &EyewearWeights::default(), &SignalPolicy::default())
    }

    fn face() -> LandmarkSet {
        synthetic_face(W, H, centered_box(W, H, 250.0, 320.0))
    }

    #[test]
    fn test_eye_regions_expand_and_clip() {
        let set = face();
        let regions = EyewearRegions::locate(&set, W, H, &ScanThresholds::default());
        for eye in &regions.eyes {
            assert!(eye.x0 >= 0 && eye.y0 >= 0);
            assert!(eye.x1 <= W as i64 && eye.y1 <= H as i64);
            // eye is 50px wide and ~19px tall before expansion
            assert!(eye.x1 - eye.x0 > 120, "eye width {}", eye.x1 - eye.x0);
            assert!(eye.y1 - eye.y0 > 50, "eye height {}", eye.y1 - eye.y0);
        }
        assert_eq!(regions.bridge.x1 - regions.bridge.x0, 80);
        assert_eq!(regions.temples[0].y1 - regions.temples[0].y0, 50);
    }

    #[test]
    fn test_far_out_landmarks_are_pinned_near_the_frame() {
        let mut points = face().points().to_vec();
        points[NOSE_BRIDGE] = Landmark::new(1.0e19, 0.5);
        points[LEFT_EYE_OUTER] = Landmark::new(-1.0e19, 0.4);
        points[RIGHT_TEMPLE] = Landmark::new(0.9, -1.0e19);
        let set = LandmarkSet::new(points).unwrap();

        let regions = EyewearRegions::locate(&set, W, H, &ScanThresholds::default());
        assert_eq!(regions.bridge.x0, 2 * W as i64 - 40);
        assert_eq!(regions.temples[1].y1, -(H as i64) + 25);
        let eye = regions.eyes[0];
        assert_eq!((eye.x0, eye.x1 <= W as i64), (0, true));

        let data = uniform_frame(W, H, SKIN);
        let frame = RgbaView::new(&data, W, H).unwrap();
        let (ratios, _) = HeuristicEyewearPolicy::default().evaluate(frame, &set);
        assert_eq!(ratios.bridge_reflection, 0.0);
        assert_eq!(ratios.temple_edge, 0.0);
    }

    #[test]
    fn test_plain_skin_is_not_eyewear() {
        let data = uniform_frame(W, H, SKIN);
        let frame = RgbaView::new(&data, W, H).unwrap();
        let (ratios, v) = HeuristicEyewearPolicy::default().evaluate(frame, &face());
        assert_eq!(ratios.reflection, 0.0);
        assert_eq!(ratios.edge, 0.0);
        assert!(v.signals.is_empty(), "signals: {:?}", v.signals);
        assert!(!v.detected);
    }

    #[test]
    fn test_lens_glare_is_eyewear() {
        let set = face();
        let mut data = uniform_frame(W, H, SKIN);
        let regions = EyewearRegions::locate(&set, W, H, &ScanThresholds::default());
        for eye in &regions.eyes {
            paint_rect(&mut data, W, H, (eye.x0, eye.y0, eye.x1, eye.y1), [235, 235, 235]);
        }
        let frame = RgbaView::new(&data, W, H).unwrap();
        let (ratios, v) = HeuristicEyewearPolicy::default().evaluate(frame, &set);
        assert!(ratios.reflection > 0.9, "reflection = {}", ratios.reflection);
        assert!(v.very_strong);
        assert!(v.detected);
    }

    #[test]
    fn test_dark_rims_are_eyewear() {
        // Thin dark vertical bars across the eye regions: dense, high-contrast edges.
        let set = face();
        let mut data = uniform_frame(W, H, SKIN);
        let regions = EyewearRegions::locate(&set, W, H, &ScanThresholds::default());
        for eye in &regions.eyes {
            let mut x = eye.x0;
            while x < eye.x1 {
                paint_rect(&mut data, W, H, (x, eye.y0, x + 2, eye.y1), [20, 20, 20]);
                x += 4;
            }
        }
        let frame = RgbaView::new(&data, W, H).unwrap();
        let (ratios, v) = HeuristicEyewearPolicy::default().evaluate(frame, &set);
        assert!(ratios.edge > 0.17, "edge = {}", ratios.edge);
        assert!(ratios.sharp_edge > 0.08, "sharp = {}", ratios.sharp_edge);
        assert!(v.signals.contains(&"dark-frames"), "signals: {:?}", v.signals);
        assert!(v.detected, "verdict: {v:?}");
    }

    #[test]
    fn test_weak_evidence_below_score_floor() {
        // Three weak signals but a score of 0.0685.
        let r = EyewearRatios { reflection: 0.13, bright: 0.11, edge: 0.13, ..Default::default() };
        let v = verdict(&r);
        assert_eq!(v.signals, vec!["reflection", "bright", "edges"]);
        assert_eq!(v.strong_signals, 0);
        assert!(v.score < 0.07, "score = {}", v.score);
        assert!(!v.detected);
    }

    #[test]
    fn test_broad_weak_evidence_detected() {
        let r = EyewearRatios {
            reflection: 0.13,
            bright: 0.11,
            edge: 0.13,
            temple_edge: 0.26,
            ..Default::default()
        };
        let v = verdict(&r);
        assert_eq!(v.signals.len(), 4);
        assert!(!v.very_strong);
        assert!(v.score > 0.07, "score = {}", v.score);
        assert!(v.detected);
    }

    #[test]
    fn test_single_weak_signal_not_enough() {
        // Score clears the floor through sub-threshold ratios, but only one
        // signal fires and none is strong.
        let r = EyewearRatios {
            reflection: 0.15,
            dark_edge: 0.09,
            sharp_edge: 0.04,
            bridge_edge: 0.15,
            bridge_reflection: 0.2,
            ..Default::default()
        };
        let v = verdict(&r);
        assert!(v.score > 0.07, "score = {}", v.score);
        assert_eq!(v.signals, vec!["reflection"]);
        assert!(!v.very_strong);
        assert!(!v.detected);
    }

    #[test]
    fn test_single_strong_signal_detected() {
        let r = EyewearRatios {
            reflection: 0.19,
            sharp_edge: 0.04,
            dark_edge: 0.09,
            bridge_reflection: 0.2,
            ..Default::default()
        };
        let v = verdict(&r);
        assert_eq!(v.signals, vec!["reflection"]);
        assert_eq!(v.strong_signals, 1);
        assert!(v.very_strong);
        assert!(v.detected, "score = {}", v.score);
    }

    #[test]
    fn test_compound_signals() {
        let r = EyewearRatios {
            smooth: 0.4,
            bright: 0.17,
            dark_edge: 0.11,
            edge: 0.13,
            ..Default::default()
        };
        let v = verdict(&r);
        assert!(v.signals.contains(&"smooth+bright"));
        assert!(v.signals.contains(&"dark-frames"));
    }

    #[test]
    fn test_bridge_pair_is_very_strong() {
        let r = EyewearRatios { bridge_bright: 0.36, bridge_edge: 0.21, ..Default::default() };
        assert!(verdict(&r).very_strong);
    }

    #[test]
    fn test_empty_regions_yield_zero_ratios() {
        let data = uniform_frame(4, 4, SKIN);
        let frame = RgbaView::new(&data, 4, 4).unwrap();
        let off = PixelRect { x0: 100, y0: 100, x1: 120, y1: 120 };
        let regions = EyewearRegions { eyes: [off; 2], bridge: off, temples: [off; 2] };
        assert_eq!(scan(frame, &regions, &ScanThresholds::default()), EyewearRatios::default());
    }
}
