//! Face and Landmark Detection
//!
//! Seam between the monitoring pipeline and the vision model: given a
//! decoded frame, return zero or more faces, each with a 68-point landmark
//! set. Zero faces is a normal result, never an error.
//!
//! When a model path is configured an ONNX session runs the detection;
//! otherwise a deterministic synthetic face is returned so the rest of the
//! pipeline can be exercised without model weights.

use capture::VideoFrame;
use face_geometry::{LandmarkSet, Point2, LANDMARK_COUNT};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Detector error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the 68-landmark ONNX model; mock detection when absent
    pub model_path: Option<String>,
    /// Square model input size in pixels
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 192,
        }
    }
}

/// Face bounding box in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One detected face
#[derive(Debug, Clone)]
pub struct Face {
    pub bbox: FaceBox,
    pub landmarks: LandmarkSet,
}

/// Face + landmark detector
pub struct LandmarkDetector {
    session: Option<Session>,
    input_size: u32,
}

impl LandmarkDetector {
    pub fn new(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let session = match &config.model_path {
            Some(path) => {
                info!("Loading landmark model from {}", path);
                let session = Session::builder()
                    .map_err(|e| DetectorError::ModelLoad(e.to_string()))?
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .map_err(|e| DetectorError::ModelLoad(e.to_string()))?
                    .commit_from_file(path)
                    .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;
                Some(session)
            }
            None => {
                warn!("No landmark model path configured. Using mock detection.");
                None
            }
        };

        Ok(Self {
            session,
            input_size: config.input_size,
        })
    }

    /// Detect faces with landmarks in a frame
    pub fn detect(&self, frame: &VideoFrame) -> Result<Vec<Face>, DetectorError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(DetectorError::ImageProcessing("empty frame".into()));
        }

        match &self.session {
            Some(session) => self.detect_with_model(session, frame),
            None => Ok(vec![synthetic_face(frame)]),
        }
    }

    fn detect_with_model(
        &self,
        session: &Session,
        frame: &VideoFrame,
    ) -> Result<Vec<Face>, DetectorError> {
        let size = self.input_size;
        let resized = frame.resize(size, size);

        // 1x3xHxW tensor, normalized to -1..1
        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for y in 0..size {
            for x in 0..size {
                let pixel = resized
                    .get_pixel(x, y)
                    .ok_or_else(|| DetectorError::ImageProcessing("pixel out of bounds".into()))?;
                for (c, channel) in pixel.iter().enumerate() {
                    input[[0, c, y as usize, x as usize]] = (*channel as f32 / 127.5) - 1.0;
                }
            }
        }

        let outputs = session
            .run(ort::inputs![input].map_err(|e| DetectorError::Inference(e.to_string()))?)
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| DetectorError::Inference("model produced no outputs".into()))?;
        let tensor = value
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        // 136 floats: 68 (x, y) pairs normalized to the model input square
        let coords: Vec<f32> = tensor.iter().copied().collect();
        if coords.len() < LANDMARK_COUNT * 2 {
            return Err(DetectorError::Inference(format!(
                "expected {} landmark coordinates, got {}",
                LANDMARK_COUNT * 2,
                coords.len()
            )));
        }

        let points: Vec<(f64, f64)> = coords[..LANDMARK_COUNT * 2]
            .chunks(2)
            .map(|pair| {
                (
                    pair[0] as f64 * frame.width as f64,
                    pair[1] as f64 * frame.height as f64,
                )
            })
            .collect();

        let landmarks = LandmarkSet::from_xy(&points)
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let bbox = bbox_from_landmarks(&landmarks);

        debug!(sequence = frame.sequence, "model detected face");
        Ok(vec![Face { bbox, landmarks }])
    }
}

fn bbox_from_landmarks(landmarks: &LandmarkSet) -> FaceBox {
    let points = landmarks.points();
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    FaceBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// Deterministic neutral face: eyes open (EAR ~0.3), mouth closed
/// (MAR ~0.3), centered in the frame.
fn synthetic_face(frame: &VideoFrame) -> Face {
    let w = frame.width as f64;
    let h = frame.height as f64;
    let mut points = vec![Point2::default(); LANDMARK_COUNT];

    // Jaw line and remaining points sit on a face oval
    let (cx, cy) = (0.5 * w, 0.45 * h);
    for (i, point) in points.iter_mut().enumerate() {
        let angle = (i as f64 / LANDMARK_COUNT as f64) * std::f64::consts::TAU;
        *point = Point2::new(cx + 0.18 * w * angle.cos(), cy + 0.22 * h * angle.sin());
    }

    write_eye(&mut points[36..42], 0.40 * w, 0.40 * h, 0.08 * w);
    write_eye(&mut points[42..48], 0.60 * w, 0.40 * h, 0.08 * w);
    write_mouth(&mut points[49..68], 0.50 * w, 0.62 * h, 0.14 * w);

    let landmarks = LandmarkSet::new(points).expect("synthetic face has 68 points");
    let bbox = FaceBox {
        x: 0.3 * w,
        y: 0.2 * h,
        width: 0.4 * w,
        height: 0.5 * h,
    };
    Face { bbox, landmarks }
}

/// Six eye points around (cx, cy) with corner span `span`; lid offsets are
/// scaled to the span so the resulting EAR is ~0.3 at any frame size
fn write_eye(eye: &mut [Point2], cx: f64, cy: f64, span: f64) {
    let lid = 0.15 * span;
    eye[0] = Point2::new(cx - span / 2.0, cy);
    eye[1] = Point2::new(cx - span / 6.0, cy - lid);
    eye[2] = Point2::new(cx + span / 6.0, cy - lid);
    eye[3] = Point2::new(cx + span / 2.0, cy);
    eye[4] = Point2::new(cx + span / 6.0, cy + lid);
    eye[5] = Point2::new(cx - span / 6.0, cy + lid);
}

/// Nineteen mouth points: corners at `span` apart, lips nearly together
fn write_mouth(mouth: &mut [Point2], cx: f64, cy: f64, span: f64) {
    let lip = 0.15 * span;
    for (i, point) in mouth.iter_mut().enumerate() {
        let angle = (i as f64 / 19.0) * std::f64::consts::TAU;
        *point = Point2::new(cx + (span / 2.0) * angle.cos(), cy + lip * angle.sin());
    }
    mouth[0] = Point2::new(cx - span / 2.0, cy);
    mouth[6] = Point2::new(cx + span / 2.0, cy);
    mouth[2] = Point2::new(cx - span / 6.0, cy - lip);
    mouth[4] = Point2::new(cx + span / 6.0, cy - lip);
    mouth[8] = Point2::new(cx + span / 6.0, cy + lip);
    mouth[10] = Point2::new(cx - span / 6.0, cy + lip);
}
