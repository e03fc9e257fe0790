//! Geometry and photometry checks derived from one landmark set.
//!
//! All functions are pure: landmarks plus the current frame in, measurements out.

use crate::config::{CaptureConfig, DistanceConfig, LightingConfig, PoseConfig, ViewportConfig};
use crate::frame::RgbaView;
use crate::landmarks::{LEFT_EYE_OUTER, NOSE_TIP, RIGHT_EYE_OUTER};
use crate::types::{DistanceHint, FaceBox, Landmark, LandmarkSet, LightingHint};
use serde::Serialize;

/// Instantaneous per-frame measurements for a detected face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurements {
    pub face_box: FaceBox,
    pub brightness: f32,
    pub centered: bool,
    pub lighting: LightingHint,
    pub distance: DistanceHint,
    /// `None` when the outer eye corners coincide horizontally.
    pub asymmetry: Option<f32>,
    pub looking_straight: bool,
}

/// Run every geometric and photometric check for one frame.
pub fn measure(landmarks: &LandmarkSet, frame: RgbaView<'_>, config: &CaptureConfig) -> Measurements {
    let (w, h) = (frame.width(), frame.height());
    // A validated set always has points, so the box is always present.
    let face_box = face_box(landmarks.points(), w, h).unwrap_or_default();
    let brightness = face_brightness(frame, &face_box, config.lighting.sample_stride);
    let asymmetry = asymmetry_ratio(landmarks);

    Measurements {
        face_box,
        brightness,
        centered: is_centered(&face_box, w, h, &config.viewport),
        lighting: lighting_hint(brightness, &config.lighting),
        distance: distance_hint(face_box.width, &config.distance),
        asymmetry,
        looking_straight: is_facing_forward(asymmetry, &config.pose),
    }
}

/// Axis-aligned extent of the points, scaled to pixels.
///
/// Returns `None` only for an empty slice; coincident points yield a
/// zero-size box.
pub fn face_box(points: &[Landmark], width: u32, height: u32) -> Option<FaceBox> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let (w, h) = (width as f32, height as f32);
    Some(FaceBox {
        center_x: (min_x + max_x) / 2.0 * w,
        center_y: (min_y + max_y) / 2.0 * h,
        width: (max_x - min_x) * w,
        height: (max_y - min_y) * h,
    })
}

/// Whether the box center sits inside the on-screen guide.
///
/// The center is renormalized into the logical viewport so the tolerances
/// are independent of the capture resolution.
pub fn is_centered(face: &FaceBox, width: u32, height: u32, viewport: &ViewportConfig) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let x = face.center_x / width as f32 * viewport.width;
    let y = face.center_y / height as f32 * viewport.height;
    let dx = (x - viewport.width / 2.0).abs();
    let dy = (y - viewport.height / 2.0).abs();
    dx < viewport.max_offset_x && dy < viewport.max_offset_y
}

/// Mean luminance over the face box, sampling every `stride`-th pixel.
///
/// The box is clipped to the frame; an empty region reads as 0.0.
pub fn face_brightness(frame: RgbaView<'_>, face: &FaceBox, stride: usize) -> f32 {
    let x0 = (face.left().floor() as i64).max(0);
    let y0 = (face.top().floor() as i64).max(0);
    let x1 = (face.right().floor() as i64).min(frame.width() as i64);
    let y1 = (face.bottom().floor() as i64).min(frame.height() as i64);
    if x1 <= x0 || y1 <= y0 {
        return 0.0;
    }

    let region_w = (x1 - x0) as usize;
    let region_h = (y1 - y0) as usize;
    let (x0, y0) = (x0 as usize, y0 as usize);

    let mut total = 0.0f64;
    let mut count = 0usize;
    for k in (0..region_w * region_h).step_by(stride.max(1)) {
        total += frame.luminance(x0 + k % region_w, y0 + k / region_w) as f64;
        count += 1;
    }

    if count > 0 {
        (total / count as f64) as f32
    } else {
        0.0
    }
}

pub fn lighting_hint(brightness: f32, config: &LightingConfig) -> LightingHint {
    if brightness <= config.min_brightness {
        LightingHint::TooDark
    } else if brightness >= config.max_brightness {
        LightingHint::TooBright
    } else {
        LightingHint::Good
    }
}

pub fn distance_hint(face_width: f32, config: &DistanceConfig) -> DistanceHint {
    if face_width <= config.min_face_width {
        DistanceHint::MoveCloser
    } else if face_width >= config.max_face_width {
        DistanceHint::MoveBack
    } else {
        DistanceHint::Good
    }
}

/// Horizontal nose offset from the outer-eye midpoint, relative to eye distance.
///
/// A cheap yaw proxy; 0.0 is perfectly frontal.
pub fn asymmetry_ratio(landmarks: &LandmarkSet) -> Option<f32> {
    let left = landmarks.get(LEFT_EYE_OUTER);
    let right = landmarks.get(RIGHT_EYE_OUTER);
    let nose = landmarks.get(NOSE_TIP);

    let eye_distance = (right.x - left.x).abs();
    if eye_distance <= f32::EPSILON {
        return None;
    }
    Some((nose.x - (left.x + right.x) / 2.0).abs() / eye_distance)
}

pub fn is_facing_forward(asymmetry: Option<f32>, config: &PoseConfig) -> bool {
    asymmetry.is_some_and(|ratio| ratio < config.max_asymmetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{centered_box, synthetic_face, synthetic_face_with_nose_shift, uniform_frame};

    const W: u32 = 390;
    const H: u32 = 844;

    fn box_at(x: f32, y: f32) -> FaceBox {
        FaceBox { center_x: x, center_y: y, width: 250.0, height: 320.0 }
    }

    #[test]
    fn test_face_box_from_landmarks() {
        let face = centered_box(W, H, 250.0, 320.0);
        let set = synthetic_face(W, H, face);
        let b = face_box(set.points(), W, H).unwrap();
        assert!((b.center_x - 195.0).abs() < 1e-3, "cx = {}", b.center_x);
        assert!((b.center_y - 422.0).abs() < 1e-3, "cy = {}", b.center_y);
        assert!((b.width - 250.0).abs() < 1e-3, "w = {}", b.width);
        assert!((b.height - 320.0).abs() < 1e-3, "h = {}", b.height);
    }

    #[test]
    fn test_face_box_empty_and_degenerate() {
        assert!(face_box(&[], W, H).is_none());
        let p = Landmark::new(0.5, 0.25);
        let b = face_box(&[p, p, p], 100, 200).unwrap();
        assert_eq!(b.width, 0.0);
        assert_eq!(b.height, 0.0);
        assert_eq!(b.center_x, 50.0);
        assert_eq!(b.center_y, 50.0);
    }

    #[test]
    fn test_centered_within_tolerance() {
        let vp = ViewportConfig::default();
        assert!(is_centered(&box_at(195.0, 422.0), W, H, &vp));
        assert!(is_centered(&box_at(195.0 + 59.0, 422.0 - 99.0), W, H, &vp));
        assert!(is_centered(&box_at(195.0 - 59.0, 422.0 + 99.0), W, H, &vp));
    }

    #[test]
    fn test_centered_flips_beyond_tolerance() {
        let vp = ViewportConfig::default();
        assert!(!is_centered(&box_at(195.0 + 61.0, 422.0), W, H, &vp));
        assert!(!is_centered(&box_at(195.0 - 61.0, 422.0), W, H, &vp));
        assert!(!is_centered(&box_at(195.0, 422.0 + 101.0), W, H, &vp));
        assert!(!is_centered(&box_at(195.0, 422.0 - 101.0), W, H, &vp));
    }

    #[test]
    fn test_centered_renormalizes_other_resolutions() {
        // 780x1688 is the viewport at 2x; a 100px offset is 50 logical units.
        let vp = ViewportConfig::default();
        assert!(is_centered(&box_at(390.0 + 100.0, 844.0), 780, 1688, &vp));
        assert!(!is_centered(&box_at(390.0 + 130.0, 844.0), 780, 1688, &vp));
    }

    #[test]
    fn test_lighting_sweep_boundaries_exclusive() {
        let cfg = LightingConfig::default();
        for v in 0..=255u32 {
            let good = lighting_hint(v as f32, &cfg).is_good();
            assert_eq!(good, v > 60 && v < 220, "brightness {v}");
        }
        assert_eq!(lighting_hint(60.0, &cfg), LightingHint::TooDark);
        assert_eq!(lighting_hint(220.0, &cfg), LightingHint::TooBright);
        assert_eq!(lighting_hint(60.5, &cfg), LightingHint::Good);
    }

    #[test]
    fn test_distance_sweep_boundaries_exclusive() {
        let cfg = DistanceConfig::default();
        for w in 0..=600u32 {
            let good = distance_hint(w as f32, &cfg).is_good();
            assert_eq!(good, w > 150 && w < 450, "width {w}");
        }
        assert_eq!(distance_hint(100.0, &cfg), DistanceHint::MoveCloser);
        assert_eq!(distance_hint(500.0, &cfg), DistanceHint::MoveBack);
    }

    #[test]
    fn test_face_brightness_uniform() {
        let data = uniform_frame(W, H, [90, 120, 150]);
        let frame = RgbaView::new(&data, W, H).unwrap();
        let b = face_brightness(frame, &centered_box(W, H, 200.0, 260.0), 5);
        assert!((b - 120.0).abs() < 1e-3, "brightness = {b}");
    }

    #[test]
    fn test_face_brightness_only_reads_face_region() {
        let mut data = uniform_frame(W, H, [250, 250, 250]);
        let face = centered_box(W, H, 200.0, 260.0);
        crate::test_utils::paint_rect(
            &mut data,
            W,
            H,
            (
                face.left().floor() as i64,
                face.top().floor() as i64,
                face.right().floor() as i64,
                face.bottom().floor() as i64,
            ),
            [40, 40, 40],
        );
        let frame = RgbaView::new(&data, W, H).unwrap();
        let b = face_brightness(frame, &face, 5);
        assert!((b - 40.0).abs() < 1e-3, "brightness = {b}");
    }

    #[test]
    fn test_face_brightness_outside_frame_is_zero() {
        let data = uniform_frame(W, H, [200, 200, 200]);
        let frame = RgbaView::new(&data, W, H).unwrap();
        let off = FaceBox { center_x: -500.0, center_y: 100.0, width: 100.0, height: 100.0 };
        assert_eq!(face_brightness(frame, &off, 5), 0.0);
    }

    #[test]
    fn test_asymmetry_frontal_and_turned() {
        let face = centered_box(W, H, 250.0, 320.0);
        let pose = PoseConfig::default();

        let frontal = asymmetry_ratio(&synthetic_face(W, H, face)).unwrap();
        assert!(frontal < 1e-4, "frontal ratio = {frontal}");
        assert!(is_facing_forward(Some(frontal), &pose));

        let turned = asymmetry_ratio(&synthetic_face_with_nose_shift(W, H, face, 0.2)).unwrap();
        assert!((turned - 0.2).abs() < 1e-3, "turned ratio = {turned}");
        assert!(!is_facing_forward(Some(turned), &pose));

        let slight = asymmetry_ratio(&synthetic_face_with_nose_shift(W, H, face, 0.1)).unwrap();
        assert!(is_facing_forward(Some(slight), &pose));
    }

    #[test]
    fn test_asymmetry_degenerate_eyes_fails_pose() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); crate::FACE_MESH_POINTS]).unwrap();
        assert_eq!(asymmetry_ratio(&set), None);
        assert!(!is_facing_forward(None, &PoseConfig::default()));
    }

    #[test]
    fn test_measure_good_frame() {
        let face = centered_box(W, H, 250.0, 320.0);
        let set = synthetic_face(W, H, face);
        let data = uniform_frame(W, H, [150, 120, 100]);
        let frame = RgbaView::new(&data, W, H).unwrap();
        let m = measure(&set, frame, &CaptureConfig::default());
        assert!(m.centered);
        assert_eq!(m.lighting, LightingHint::Good);
        assert_eq!(m.distance, DistanceHint::Good);
        assert!(m.looking_straight);
        assert!((m.brightness - 123.333).abs() < 1e-2, "brightness = {}", m.brightness);
    }
}
