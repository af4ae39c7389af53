//! Facial Landmark Geometry
//!
//! Pure geometry over 68-point facial landmark sets:
//! - Fixed anatomical index ranges (eyes, mouth)
//! - Eye aspect ratio (EAR) - low value indicates a closed eye
//! - Mouth aspect ratio (MAR) - high value indicates an open mouth/yawn

pub mod landmarks;
pub mod metrics;

pub use landmarks::{LandmarkSet, Point2, LANDMARK_COUNT};
pub use metrics::{eye_aspect_ratio, mouth_aspect_ratio, FaceMetrics};

use thiserror::Error;

/// Geometry error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Metric called with the wrong number of landmark points
    #[error("Expected {expected} landmark points, got {actual}")]
    InvalidLandmarkCount { expected: usize, actual: usize },
}
