//! Drowsiness detection route

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use capture::VideoFrame;
use drowsiness_core::{MetricSample, SignalKind};
use face_geometry::FaceMetrics;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::SharedState;

/// Request errors for the detect endpoint
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Missing image part in multipart body")]
    MissingImage,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(String),
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Response for one detection + fusion cycle.
///
/// `alert_triggered` is the stable contract; the remaining fields are
/// diagnostic.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub alert_triggered: bool,
    pub eyes_closed: bool,
    pub mouth_open: bool,
    pub face_detected: bool,
    pub session_id: String,
}

/// Run one detection + fusion cycle over an uploaded image.
///
/// The session id comes from the `session` multipart field, then the
/// `x-session-id` header; otherwise the server assigns one and echoes it
/// so the client can keep its debounce state across requests.
pub async fn detect_drowsiness(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, DetectError> {
    let mut image_bytes = None;
    let mut session_field = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DetectError::Multipart(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") | Some("image") => {
                image_bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| DetectError::Multipart(e.to_string()))?,
                );
            }
            Some("session") => {
                session_field = field.text().await.ok();
            }
            _ => {}
        }
    }

    let bytes = image_bytes.ok_or(DetectError::MissingImage)?;
    let session_id = session_field
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-session-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| DetectError::InvalidImage(e.to_string()))?
        .to_rgb8();

    let now = Instant::now();
    let mut state = state.write().await;

    let frame = VideoFrame::from_rgb_image(decoded, 0, 0)
        .resize(state.frame_width, state.frame_height);

    // Detector failure degrades to "no alert this frame"
    let faces = match state.detector.detect(&frame) {
        Ok(faces) => faces,
        Err(e) => {
            warn!(session = session_id.as_str(), "detection failed: {e}");
            Vec::new()
        }
    };

    let engine = state.sessions.engine_for(&session_id, now);
    let analysis = match faces.first() {
        Some(face) => {
            let metrics = FaceMetrics::from_landmarks(&face.landmarks);
            let samples = [
                MetricSample::new(SignalKind::EyesClosed, metrics.ear, now),
                MetricSample::new(SignalKind::MouthOpen, metrics.mar, now),
            ];
            engine.process_frame(&samples, now)
        }
        None => engine.observe_absent(now),
    };

    debug!(
        session = session_id.as_str(),
        face = analysis.face_detected,
        alert = analysis.combined_alert,
        "detect cycle"
    );

    Ok(Json(DetectResponse {
        alert_triggered: analysis.combined_alert,
        eyes_closed: analysis.active(SignalKind::EyesClosed),
        mouth_open: analysis.active(SignalKind::MouthOpen),
        face_detected: analysis.face_detected,
        session_id,
    }))
}
