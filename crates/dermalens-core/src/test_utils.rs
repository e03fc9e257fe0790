//! Shared synthetic fixtures for unit tests: faces and frames.

use crate::landmarks::*;
use crate::types::{FaceBox, Landmark, LandmarkSet, FACE_MESH_POINTS};

const FOREHEAD_TOP: usize = 10;
const CHIN: usize = 152;

/// Landmarks whose extent is exactly `face` (in pixels of a `w`×`h` frame),
/// with eyes, nose and temples in plausible frontal positions.
pub(crate) fn synthetic_face(w: u32, h: u32, face: FaceBox) -> LandmarkSet {
    synthetic_face_with_nose_shift(w, h, face, 0.0)
}

/// Like [`synthetic_face`], with the nose tip moved sideways by
/// `shift` × the outer-eye distance (positive = towards the right eye).
pub(crate) fn synthetic_face_with_nose_shift(
    w: u32,
    h: u32,
    face: FaceBox,
    shift: f32,
) -> LandmarkSet {
    let norm = |x: f32, y: f32| Landmark::new(x / w as f32, y / h as f32);
    let (cx, cy) = (face.center_x, face.center_y);
    let eye_y = face.top() + 0.4 * face.height;
    let eye_half_h = 0.03 * face.height;

    let mut points = vec![norm(cx, cy); FACE_MESH_POINTS];
    points[FOREHEAD_TOP] = norm(face.left(), face.top());
    points[CHIN] = norm(face.right(), face.bottom());

    points[LEFT_EYE_OUTER] = norm(cx - 0.3 * face.width, eye_y);
    points[LEFT_EYE_INNER] = norm(cx - 0.1 * face.width, eye_y);
    points[LEFT_EYE_TOP] = norm(cx - 0.2 * face.width, eye_y - eye_half_h);
    points[LEFT_EYE_BOTTOM] = norm(cx - 0.2 * face.width, eye_y + eye_half_h);
    points[RIGHT_EYE_INNER] = norm(cx + 0.1 * face.width, eye_y);
    points[RIGHT_EYE_OUTER] = norm(cx + 0.3 * face.width, eye_y);
    points[RIGHT_EYE_TOP] = norm(cx + 0.2 * face.width, eye_y - eye_half_h);
    points[RIGHT_EYE_BOTTOM] = norm(cx + 0.2 * face.width, eye_y + eye_half_h);

    let eye_distance = 0.6 * face.width;
    points[NOSE_TIP] = norm(cx + shift * eye_distance, cy + 0.1 * face.height);
    points[NOSE_BRIDGE] = norm(cx, eye_y);
    points[LEFT_TEMPLE] = norm(face.left() + 0.02 * face.width, eye_y);
    points[RIGHT_TEMPLE] = norm(face.right() - 0.02 * face.width, eye_y);

    LandmarkSet::new(points).expect("synthetic face has 468 finite points")
}

/// Face box centered in the frame.
pub(crate) fn centered_box(w: u32, h: u32, width: f32, height: f32) -> FaceBox {
    FaceBox {
        center_x: w as f32 / 2.0,
        center_y: h as f32 / 2.0,
        width,
        height,
    }
}

/// Opaque RGBA frame of a single color.
pub(crate) fn uniform_frame(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
    let mut data = Vec::with_capacity(w as usize * h as usize * 4);
    for _ in 0..(w * h) {
        data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    data
}

/// Fill the half-open pixel rectangle [x0, x1) × [y0, y1), clipped to the frame.
pub(crate) fn paint_rect(
    data: &mut [u8],
    w: u32,
    h: u32,
    (x0, y0, x1, y1): (i64, i64, i64, i64),
    rgb: [u8; 3],
) {
    for y in y0.max(0)..y1.min(h as i64) {
        for x in x0.max(0)..x1.min(w as i64) {
            let i = (y as usize * w as usize + x as usize) * 4;
            data[i..i + 3].copy_from_slice(&rgb);
        }
    }
}
