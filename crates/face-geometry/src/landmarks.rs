//! 68-point landmark set and anatomical index ranges

use crate::GeometryError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of points in a full landmark set (dlib 68-point convention)
pub const LANDMARK_COUNT: usize = 68;

/// Right eye corner-to-corner points (subject's right, image left)
pub const RIGHT_EYE: Range<usize> = 36..42;

/// Left eye corner-to-corner points
pub const LEFT_EYE: Range<usize> = 42..48;

/// Mouth region points used for the opening ratio
pub const MOUTH: Range<usize> = 49..68;

/// A 2D landmark point in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Ordered set of 68 facial landmarks for one detected face.
///
/// Indices carry fixed anatomical meaning; region accessors slice by the
/// ranges above. Owned per frame and discarded once metrics are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Point2>,
}

impl LandmarkSet {
    /// Build a landmark set, validating cardinality
    pub fn new(points: Vec<Point2>) -> Result<Self, GeometryError> {
        if points.len() != LANDMARK_COUNT {
            return Err(GeometryError::InvalidLandmarkCount {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Build from interleaved (x, y) coordinate pairs
    pub fn from_xy(coords: &[(f64, f64)]) -> Result<Self, GeometryError> {
        Self::new(coords.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Point2 {
        self.points[index]
    }

    /// Right eye points (6)
    pub fn right_eye(&self) -> &[Point2] {
        &self.points[RIGHT_EYE]
    }

    /// Left eye points (6)
    pub fn left_eye(&self) -> &[Point2] {
        &self.points[LEFT_EYE]
    }

    /// Mouth points (19)
    pub fn mouth(&self) -> &[Point2] {
        &self.points[MOUTH]
    }
}
