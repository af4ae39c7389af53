//! Drowsiness Monitor
//!
//! Drives the frame-by-frame detection loop and the interactive
//! calibration procedure over the capture, detector, core, and audio
//! crates. The loops are synchronous and run on a blocking worker; a
//! shared atomic flag flipped by Ctrl-C stops them between frames.

pub mod settings;

pub use settings::Settings;

use alert_audio::AlarmScheduler;
use capture::{CaptureError, FrameSource};
use drowsiness_core::{
    CalibrationError, CalibrationEstimator, CalibrationOutcome, FusionEngine, MetricSample,
    SignalKind,
};
use face_geometry::FaceMetrics;
use landmark_detector::LandmarkDetector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Operator interrupted an in-flight calibration window
    #[error("Calibration interrupted")]
    Interrupted,
}

/// Outcome of a finished detection session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub alerts: u64,
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Frame-by-frame detection session: acquire, detect, fuse, alert.
///
/// Runs until the stream ends, the device fails, or `shutdown` is set.
/// Decode failures skip the frame; detector failures degrade to a
/// no-observation frame; `DeviceUnavailable` propagates as fatal.
pub fn run_detection_loop(
    source: &mut dyn FrameSource,
    detector: &LandmarkDetector,
    engine: &mut FusionEngine,
    alarm: &AlarmScheduler,
    frame_size: (u32, u32),
    shutdown: &AtomicBool,
) -> Result<LoopSummary, MonitorError> {
    let mut summary = LoopSummary::default();

    while !shutdown.load(Ordering::Acquire) {
        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(CaptureError::StreamEnded) => {
                info!("Frame stream ended");
                break;
            }
            Err(e @ CaptureError::DeviceUnavailable(_)) => return Err(e.into()),
            Err(CaptureError::Decode(e)) => {
                warn!("Skipping undecodable frame: {e}");
                continue;
            }
        };

        summary.frames += 1;
        let frame = frame.resize(frame_size.0, frame_size.1);
        let now = Instant::now();

        let analysis = match detector.detect(&frame) {
            Ok(faces) if !faces.is_empty() => {
                let metrics = FaceMetrics::from_landmarks(&faces[0].landmarks);
                debug!(
                    sequence = frame.sequence,
                    faces = faces.len(),
                    ear = metrics.ear,
                    mar = metrics.mar,
                    "face(s) found"
                );
                let samples = [
                    MetricSample::new(SignalKind::EyesClosed, metrics.ear, now),
                    MetricSample::new(SignalKind::MouthOpen, metrics.mar, now),
                ];
                engine.process_frame(&samples, now)
            }
            Ok(_) => engine.observe_absent(now),
            Err(e) => {
                warn!(sequence = frame.sequence, "detection failed, skipping frame: {e}");
                engine.observe_absent(now)
            }
        };

        if analysis.combined_alert {
            summary.alerts += 1;
            alarm.trigger();
        }
    }

    info!(
        frames = summary.frames,
        alerts = summary.alerts,
        "detection session finished"
    );
    Ok(summary)
}

/// One timed calibration window: collect metrics until the deadline,
/// then fold the window's mean into the estimator.
///
/// No-face and failed frames contribute nothing. Returns
/// `InsufficientSamples` for retry, `Interrupted` when `shutdown` is set
/// mid-window.
pub fn run_calibration_window(
    estimator: &mut CalibrationEstimator,
    source: &mut dyn FrameSource,
    detector: &LandmarkDetector,
    frame_size: (u32, u32),
    window: Duration,
    shutdown: &AtomicBool,
) -> Result<(), MonitorError> {
    let phase = estimator.begin_phase()?;
    let deadline = Instant::now() + window;

    while Instant::now() < deadline {
        if shutdown.load(Ordering::Acquire) {
            estimator.cancel_phase();
            return Err(MonitorError::Interrupted);
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(CaptureError::Decode(e)) => {
                warn!("Skipping undecodable frame: {e}");
                continue;
            }
            Err(e) => {
                estimator.cancel_phase();
                return Err(e.into());
            }
        };

        let frame = frame.resize(frame_size.0, frame_size.1);
        match detector.detect(&frame) {
            Ok(faces) if !faces.is_empty() => {
                let metrics = FaceMetrics::from_landmarks(&faces[0].landmarks);
                estimator.record(metrics)?;
            }
            Ok(_) => debug!(phase = %phase, "no face in calibration frame"),
            Err(e) => warn!("detection failed during calibration: {e}"),
        }
    }

    let averages = estimator.finish_phase()?;
    info!(
        phase = %phase,
        ear = averages.ear,
        mar = averages.mar,
        samples = averages.sample_count,
        "calibration window complete"
    );
    Ok(())
}

/// Render calibrated cutoffs as a config-file fragment
pub fn render_toml_fragment(outcome: &CalibrationOutcome) -> String {
    format!(
        "[detection.eyes]\ncutoff = {:.4}\n\n[detection.mouth]\ncutoff = {:.4}\n",
        outcome.eye_cutoff, outcome.mouth_cutoff
    )
}
