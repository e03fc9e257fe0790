use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points in one face-mesh landmark set.
pub const FACE_MESH_POINTS: usize = 468;

/// One facial keypoint, normalized to the frame: x and y in [0, 1].
///
/// Detectors may report points slightly outside the unit square when the
/// face is partially out of frame; those are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks, got {actual}")]
    WrongCardinality { expected: usize, actual: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// A validated face-mesh landmark set for one face in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Validate cardinality and coordinates.
    pub fn new(points: Vec<Landmark>) -> Result<Self, LandmarkError> {
        if points.len() != FACE_MESH_POINTS {
            return Err(LandmarkError::WrongCardinality {
                expected: FACE_MESH_POINTS,
                actual: points.len(),
            });
        }
        if let Some(index) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(LandmarkError::NonFinite { index });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Point at an anatomical index (see [`crate::landmarks`]).
    ///
    /// Indices at or past [`FACE_MESH_POINTS`] return the origin.
    pub fn get(&self, index: usize) -> Landmark {
        self.points.get(index).copied().unwrap_or_default()
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// Axis-aligned face rectangle in frame pixels, described by its center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceBox {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl FaceBox {
    pub fn left(&self) -> f32 {
        self.center_x - self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center_y - self.height / 2.0
    }

    pub fn right(&self) -> f32 {
        self.center_x + self.width / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.center_y + self.height / 2.0
    }
}

/// The six readiness flags for the current frame.
///
/// `no_glasses` is the temporally smoothed verdict; the others are
/// instantaneous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub face_detected: bool,
    pub centered: bool,
    pub lighting: bool,
    pub distance: bool,
    pub looking_straight: bool,
    pub no_glasses: bool,
}

impl ValidationSnapshot {
    /// Snapshot for a frame without a usable face.
    pub const fn no_face() -> Self {
        Self {
            face_detected: false,
            centered: false,
            lighting: false,
            distance: false,
            looking_straight: false,
            no_glasses: true,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.face_detected
            && self.centered
            && self.lighting
            && self.distance
            && self.looking_straight
            && self.no_glasses
    }
}

impl Default for ValidationSnapshot {
    fn default() -> Self {
        Self::no_face()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingHint {
    TooDark,
    Good,
    TooBright,
}

impl LightingHint {
    pub fn is_good(self) -> bool {
        self == Self::Good
    }

    /// Guidance shown next to the lighting check.
    pub fn message(self) -> &'static str {
        match self {
            Self::TooDark => "More light needed",
            Self::Good => "Good lighting",
            Self::TooBright => "Too bright",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceHint {
    MoveCloser,
    Good,
    MoveBack,
}

impl DistanceHint {
    pub fn is_good(self) -> bool {
        self == Self::Good
    }

    /// Guidance shown next to the distance check.
    pub fn message(self) -> &'static str {
        match self {
            Self::MoveCloser => "Move closer",
            Self::Good => "Perfect distance",
            Self::MoveBack => "Move back",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_set_rejects_wrong_cardinality() {
        let err = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); 10]).unwrap_err();
        assert_eq!(
            err,
            LandmarkError::WrongCardinality { expected: FACE_MESH_POINTS, actual: 10 }
        );
    }

    #[test]
    fn test_landmark_set_rejects_non_finite() {
        let mut points = vec![Landmark::new(0.5, 0.5); FACE_MESH_POINTS];
        points[42].y = f32::NAN;
        assert_eq!(
            LandmarkSet::new(points).unwrap_err(),
            LandmarkError::NonFinite { index: 42 }
        );
    }

    #[test]
    fn test_landmark_set_deserializes_mediapipe_points() {
        // Extra fields such as `z` are ignored.
        let json = format!(
            "[{}]",
            vec![r#"{"x":0.25,"y":0.75,"z":-0.01}"#; FACE_MESH_POINTS].join(",")
        );
        let set: LandmarkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set.points().len(), FACE_MESH_POINTS);
        assert_eq!(set.get(0), Landmark::new(0.25, 0.75));
    }

    #[test]
    fn test_landmark_set_deserialize_validates() {
        let result: Result<LandmarkSet, _> = serde_json::from_str(r#"[{"x":0.1,"y":0.2}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_face_snapshot_defaults_glasses_clear() {
        let s = ValidationSnapshot::no_face();
        assert!(!s.face_detected);
        assert!(s.no_glasses);
        assert!(!s.all_passed());
    }

    #[test]
    fn test_all_passed_requires_every_flag() {
        let all = ValidationSnapshot {
            face_detected: true,
            centered: true,
            lighting: true,
            distance: true,
            looking_straight: true,
            no_glasses: true,
        };
        assert!(all.all_passed());
        assert!(!ValidationSnapshot { looking_straight: false, ..all }.all_passed());
        assert!(!ValidationSnapshot { no_glasses: false, ..all }.all_passed());
    }

    #[test]
    fn test_face_box_edges() {
        let b = FaceBox { center_x: 100.0, center_y: 200.0, width: 50.0, height: 80.0 };
        assert_eq!(b.left(), 75.0);
        assert_eq!(b.right(), 125.0);
        assert_eq!(b.top(), 160.0);
        assert_eq!(b.bottom(), 240.0);
    }
}
