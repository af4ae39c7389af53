//! Aspect ratio metrics derived from landmark regions

use crate::landmarks::{LandmarkSet, Point2};
use crate::GeometryError;
use serde::{Deserialize, Serialize};

const EYE_POINTS: usize = 6;
const MOUTH_POINTS: usize = 19;

/// Eye aspect ratio over the 6 eye points p1..p6:
/// `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.
///
/// p1/p4 are the horizontal corners, the other pairs span the eyelids.
/// A degenerate eye (zero corner-to-corner span) yields 0.0.
pub fn eye_aspect_ratio(eye: &[Point2]) -> Result<f64, GeometryError> {
    if eye.len() != EYE_POINTS {
        return Err(GeometryError::InvalidLandmarkCount {
            expected: EYE_POINTS,
            actual: eye.len(),
        });
    }

    let horizontal = eye[0].distance(&eye[3]);
    if horizontal < f64::EPSILON {
        return Ok(0.0);
    }

    let vertical_a = eye[1].distance(&eye[5]);
    let vertical_b = eye[2].distance(&eye[4]);
    Ok((vertical_a + vertical_b) / (2.0 * horizontal))
}

/// Mouth opening ratio over the 19 mouth points:
/// `(|m3-m11| + |m5-m9|) / (2 * |m1-m7|)` (1-based within the slice).
///
/// The vertical pairs span the lips, the horizontal pair the mouth corners.
pub fn mouth_aspect_ratio(mouth: &[Point2]) -> Result<f64, GeometryError> {
    if mouth.len() != MOUTH_POINTS {
        return Err(GeometryError::InvalidLandmarkCount {
            expected: MOUTH_POINTS,
            actual: mouth.len(),
        });
    }

    let horizontal = mouth[0].distance(&mouth[6]);
    if horizontal < f64::EPSILON {
        return Ok(0.0);
    }

    let vertical_a = mouth[2].distance(&mouth[10]);
    let vertical_b = mouth[4].distance(&mouth[8]);
    Ok((vertical_a + vertical_b) / (2.0 * horizontal))
}

/// Per-frame scalar metrics for one face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceMetrics {
    /// Mean eye aspect ratio across both eyes
    pub ear: f64,
    /// Mouth opening ratio
    pub mar: f64,
}

impl FaceMetrics {
    /// Derive metrics from a validated landmark set.
    ///
    /// Cardinality is guaranteed by `LandmarkSet`, so the region slices
    /// always have the expected sizes.
    pub fn from_landmarks(landmarks: &LandmarkSet) -> Self {
        let left = eye_aspect_ratio(landmarks.left_eye()).unwrap_or(0.0);
        let right = eye_aspect_ratio(landmarks.right_eye()).unwrap_or(0.0);
        let mar = mouth_aspect_ratio(landmarks.mouth()).unwrap_or(0.0);

        Self {
            ear: (left + right) / 2.0,
            mar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_eye() -> Vec<Point2> {
        // Corners 8 apart, lids 2 apart: EAR = (2 + 2) / (2 * 8) = 0.25
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(6.0, 1.0),
            Point2::new(8.0, 0.0),
            Point2::new(6.0, -1.0),
            Point2::new(2.0, -1.0),
        ]
    }

    #[test]
    fn test_ear_formula() {
        let ear = eye_aspect_ratio(&open_eye()).unwrap();
        assert!((ear - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ear_closed_eye_is_low() {
        let mut eye = open_eye();
        for p in &mut eye[1..3] {
            p.y = 0.1;
        }
        for p in &mut eye[4..6] {
            p.y = -0.1;
        }
        let ear = eye_aspect_ratio(&eye).unwrap();
        assert!(ear < 0.05);
    }

    #[test]
    fn test_ear_wrong_count() {
        let err = eye_aspect_ratio(&[Point2::default(); 5]).unwrap_err();
        assert_eq!(
            err,
            GeometryError::InvalidLandmarkCount {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_ear_degenerate_span() {
        let eye = vec![Point2::new(1.0, 1.0); 6];
        assert_eq!(eye_aspect_ratio(&eye).unwrap(), 0.0);
    }

    #[test]
    fn test_mar_formula() {
        let mut mouth = vec![Point2::default(); 19];
        mouth[0] = Point2::new(0.0, 0.0);
        mouth[6] = Point2::new(10.0, 0.0);
        mouth[2] = Point2::new(3.0, 4.0);
        mouth[10] = Point2::new(3.0, -4.0);
        mouth[4] = Point2::new(7.0, 3.0);
        mouth[8] = Point2::new(7.0, -3.0);

        // (8 + 6) / (2 * 10) = 0.7
        let mar = mouth_aspect_ratio(&mouth).unwrap();
        assert!((mar - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_mar_wrong_count() {
        let err = mouth_aspect_ratio(&[Point2::default(); 20]).unwrap_err();
        assert_eq!(
            err,
            GeometryError::InvalidLandmarkCount {
                expected: 19,
                actual: 20
            }
        );
    }

    #[test]
    fn test_face_metrics_from_landmarks() {
        let mut points = vec![Point2::default(); 68];
        let eye = open_eye();
        points[36..42].copy_from_slice(&eye);
        points[42..48].copy_from_slice(&eye);

        points[49] = Point2::new(0.0, 0.0);
        points[55] = Point2::new(10.0, 0.0);
        points[51] = Point2::new(3.0, 4.0);
        points[59] = Point2::new(3.0, -4.0);
        points[53] = Point2::new(7.0, 3.0);
        points[57] = Point2::new(7.0, -3.0);

        let set = LandmarkSet::new(points).unwrap();
        let metrics = FaceMetrics::from_landmarks(&set);
        assert!((metrics.ear - 0.25).abs() < 1e-9);
        assert!((metrics.mar - 0.7).abs() < 1e-9);
    }
}
