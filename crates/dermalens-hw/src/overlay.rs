//! Face-guide mesh drawn over the preview and baked into captures.
//!
//! The mesh is authored in a 220×275 unit box centered on the origin and is
//! scaled to the detected face. It is placed in preview orientation, i.e.
//! horizontally mirrored relative to the raw camera frame.

use dermalens_core::FaceBox;
use image::{Rgba, RgbaImage};
use imageproc::drawing;

const MESH_WIDTH: f32 = 220.0;
const MESH_HEIGHT: f32 = 275.0;
const MESH_MARGIN: f32 = 1.1;
const CURVE_SEGMENTS: usize = 12;

type Pt = [f32; 2];

enum Stroke {
    Line(Pt, Pt),
    /// Quadratic Bézier: start, control, end.
    Quad(Pt, Pt, Pt),
    /// Center, radii.
    Ellipse(Pt, f32, f32),
}

struct Path {
    stroke: Stroke,
    bold: bool,
}

const fn line(a: Pt, b: Pt, bold: bool) -> Path {
    Path { stroke: Stroke::Line(a, b), bold }
}

const fn quad(a: Pt, c: Pt, b: Pt, bold: bool) -> Path {
    Path { stroke: Stroke::Quad(a, c, b), bold }
}

const fn ellipse(c: Pt, rx: f32, ry: f32, bold: bool) -> Path {
    Path { stroke: Stroke::Ellipse(c, rx, ry), bold }
}

/// Left half of the mesh plus the midline; the right half is mirrored.
const HALF_MESH: &[Path] = &[
    // outline: forehead corner down to the chin
    line([-90.0, -95.0], [-100.0, -65.0], true),
    line([-100.0, -65.0], [-105.0, -30.0], true),
    quad([-105.0, -30.0], [-90.0, -10.0], [-90.0, 15.0], true),
    quad([-90.0, 15.0], [-75.0, 35.0], [-65.0, 55.0], true),
    line([-65.0, 55.0], [-60.0, 80.0], true),
    quad([-60.0, 80.0], [-50.0, 100.0], [-40.0, 115.0], true),
    quad([-40.0, 115.0], [-30.0, 130.0], [-18.0, 140.0], true),
    // temple
    line([-105.0, -30.0], [-110.0, 10.0], false),
    line([-110.0, 10.0], [-105.0, 50.0], false),
    // brow
    quad([-85.0, -60.0], [-40.0, -70.0], [0.0, -70.0], false),
    quad([-82.0, -52.0], [-60.0, -55.0], [-50.0, -48.0], false),
    // eye
    ellipse([-65.0, -30.0], 20.0, 14.0, true),
    ellipse([-65.0, -30.0], 15.0, 10.0, false),
    quad([-48.0, -35.0], [-40.0, -38.0], [-32.0, -35.0], false),
    line([-85.0, -30.0], [-48.0, -30.0], false),
    line([-65.0, -44.0], [-65.0, -16.0], false),
    // nose wing and cheek
    line([0.0, 45.0], [-12.0, 48.0], false),
    quad([-40.0, 25.0], [-45.0, 40.0], [-50.0, 55.0], false),
    quad([-50.0, 55.0], [-35.0, 60.0], [-28.0, 70.0], false),
    // lips
    quad([-60.0, 80.0], [-45.0, 85.0], [-35.0, 88.0], true),
    quad([-35.0, 88.0], [-20.0, 93.0], [0.0, 95.0], true),
    quad([-28.0, 72.0], [-18.0, 75.0], [-8.0, 76.0], false),
    quad([-28.0, 84.0], [-18.0, 82.0], [-8.0, 82.0], false),
    // cross bars
    line([-50.0, -10.0], [-30.0, -10.0], false),
    line([-55.0, 30.0], [-35.0, 30.0], false),
    // midline pieces
    line([0.0, -120.0], [0.0, 155.0], true),
    quad([-90.0, -95.0], [0.0, -120.0], [90.0, -95.0], false),
    quad([-20.0, 45.0], [-10.0, 50.0], [0.0, 52.0], false),
    ellipse([0.0, 78.0], 32.0, 15.0, false),
    quad([-18.0, 140.0], [0.0, 148.0], [18.0, 140.0], true),
];

/// Horizontal rungs, symmetric about the midline (half-width, y).
const RUNGS: &[(f32, f32)] = &[
    (90.0, -95.0),
    (100.0, -65.0),
    (105.0, -30.0),
    (110.0, 10.0),
    (105.0, 50.0),
    (60.0, 80.0),
    (40.0, 115.0),
    (15.0, -5.0),
    (18.0, 10.0),
    (20.0, 25.0),
    (10.0, 115.0),
    (12.0, 130.0),
];

/// Left-side and midline keypoints; left-side ones are mirrored.
const KEYPOINTS: &[Pt] = &[
    [0.0, -120.0], [-90.0, -95.0], [-100.0, -65.0], [-105.0, -30.0], [-110.0, 10.0],
    [-105.0, 50.0], [-65.0, -30.0], [-85.0, -30.0], [-48.0, -30.0], [-82.0, -52.0],
    [-50.0, -48.0], [0.0, -10.0], [0.0, 10.0], [0.0, 25.0], [0.0, 45.0], [0.0, 52.0],
    [-20.0, 45.0], [-12.0, 48.0], [-90.0, 15.0], [-65.0, 55.0], [-60.0, 80.0],
    [-50.0, 55.0], [-40.0, 25.0], [-35.0, 88.0], [-28.0, 70.0], [-28.0, 84.0],
    [0.0, 78.0], [0.0, 95.0], [0.0, 120.0], [-40.0, 115.0], [-18.0, 140.0],
    [0.0, 148.0], [-30.0, 130.0], [0.0, -70.0],
];

/// Mesh color for the current readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideStyle {
    /// Every check passes.
    Ready,
    Adjusting,
}

impl GuideStyle {
    pub fn from_ready(all_passed: bool) -> Self {
        if all_passed {
            Self::Ready
        } else {
            Self::Adjusting
        }
    }

    pub fn color(self) -> Rgba<u8> {
        match self {
            Self::Ready => Rgba([242, 140, 42, 220]),
            Self::Adjusting => Rgba([255, 255, 255, 220]),
        }
    }
}

struct Placement {
    cx: f32,
    cy: f32,
    scale: f32,
}

impl Placement {
    fn map(&self, [x, y]: Pt) -> (f32, f32) {
        (self.cx + x * self.scale, self.cy + y * self.scale)
    }
}

/// Render the guide for `face` (raw-frame coordinates) onto a transparent
/// canvas the size of the frame, in preview orientation.
pub fn render_guide(width: u32, height: u32, face: &FaceBox, style: GuideStyle) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    let scale = (face.width / MESH_WIDTH).min(face.height / MESH_HEIGHT) * MESH_MARGIN;
    if !(scale.is_finite() && scale > 0.0) {
        return canvas;
    }
    let at = Placement {
        cx: width as f32 - face.center_x,
        cy: face.center_y,
        scale,
    };
    let color = style.color();

    for path in HALF_MESH {
        draw_path(&mut canvas, &at, &path.stroke, path.bold, color);
        if let Some(mirrored) = mirror(&path.stroke) {
            draw_path(&mut canvas, &at, &mirrored, path.bold, color);
        }
    }
    for &(half, y) in RUNGS {
        draw_path(&mut canvas, &at, &Stroke::Line([-half, y], [half, y]), false, color);
    }

    let radius = (2.5 * scale).round().max(1.0) as i32;
    for &[x, y] in KEYPOINTS {
        for p in [[x, y], [-x, y]] {
            let (px, py) = at.map(p);
            drawing::draw_filled_circle_mut(&mut canvas, (px.round() as i32, py.round() as i32), radius, color);
            if x == 0.0 {
                break;
            }
        }
    }

    canvas
}

/// Mirror image about the midline, or `None` for strokes that sit on it.
fn mirror(stroke: &Stroke) -> Option<Stroke> {
    let flip = |[x, y]: Pt| [-x, y];
    match *stroke {
        Stroke::Line(a, b) if a[0] == 0.0 && b[0] == 0.0 => None,
        Stroke::Line(a, b) => Some(Stroke::Line(flip(a), flip(b))),
        Stroke::Quad(a, _, b) if a[0] == -b[0] => None,
        Stroke::Quad(a, c, b) => Some(Stroke::Quad(flip(a), flip(c), flip(b))),
        Stroke::Ellipse(c, _, _) if c[0] == 0.0 => None,
        Stroke::Ellipse(c, rx, ry) => Some(Stroke::Ellipse(flip(c), rx, ry)),
    }
}

fn draw_path(canvas: &mut RgbaImage, at: &Placement, stroke: &Stroke, bold: bool, color: Rgba<u8>) {
    let offsets: &[(f32, f32)] = if bold {
        &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]
    } else {
        &[(0.0, 0.0)]
    };

    match *stroke {
        Stroke::Line(a, b) => {
            let (a, b) = (at.map(a), at.map(b));
            for &(dx, dy) in offsets {
                drawing::draw_line_segment_mut(canvas, (a.0 + dx, a.1 + dy), (b.0 + dx, b.1 + dy), color);
            }
        }
        Stroke::Quad(a, c, b) => {
            let mut prev = at.map(a);
            for i in 1..=CURVE_SEGMENTS {
                let t = i as f32 / CURVE_SEGMENTS as f32;
                let u = 1.0 - t;
                let p = [
                    u * u * a[0] + 2.0 * u * t * c[0] + t * t * b[0],
                    u * u * a[1] + 2.0 * u * t * c[1] + t * t * b[1],
                ];
                let next = at.map(p);
                for &(dx, dy) in offsets {
                    drawing::draw_line_segment_mut(
                        canvas,
                        (prev.0 + dx, prev.1 + dy),
                        (next.0 + dx, next.1 + dy),
                        color,
                    );
                }
                prev = next;
            }
        }
        Stroke::Ellipse(c, rx, ry) => {
            let (cx, cy) = at.map(c);
            let (rx, ry) = ((rx * at.scale).round() as i32, (ry * at.scale).round() as i32);
            if rx <= 0 || ry <= 0 {
                return;
            }
            for &(dx, dy) in offsets {
                drawing::draw_hollow_ellipse_mut(
                    canvas,
                    ((cx + dx).round() as i32, (cy + dy).round() as i32),
                    rx,
                    ry,
                    color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(cx: f32, cy: f32) -> FaceBox {
        FaceBox { center_x: cx, center_y: cy, width: 220.0, height: 275.0 }
    }

    fn drawn(img: &RgbaImage, x: u32, y: u32) -> bool {
        img.get_pixel(x, y)[3] > 0
    }

    #[test]
    fn test_midline_drawn_at_face_center() {
        let img = render_guide(390, 844, &face(195.0, 422.0), GuideStyle::Adjusting);
        assert_eq!(img.dimensions(), (390, 844));
        assert_eq!(*img.get_pixel(195, 450), GuideStyle::Adjusting.color());
        // outside the mesh
        assert!(!drawn(&img, 10, 10));
        assert!(!drawn(&img, 195, 800));
    }

    #[test]
    fn test_ready_style_is_orange() {
        let img = render_guide(390, 844, &face(195.0, 422.0), GuideStyle::Ready);
        assert_eq!(*img.get_pixel(195, 450), Rgba([242, 140, 42, 220]));
    }

    #[test]
    fn test_guide_is_mirrored_into_preview_orientation() {
        // Face on the left of the raw frame shows up on the right of the preview.
        let img = render_guide(390, 844, &face(100.0, 422.0), GuideStyle::Adjusting);
        assert!(drawn(&img, 290, 450));
        assert!(!drawn(&img, 100, 450));
    }

    #[test]
    fn test_degenerate_face_draws_nothing() {
        let img = render_guide(50, 50, &FaceBox::default(), GuideStyle::Ready);
        assert!(img.pixels().all(|p| p[3] == 0));
    }
}
