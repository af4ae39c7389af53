//! Subject-specific threshold calibration
//!
//! Drives three observation windows (eyes open / eyes closed / mouth open),
//! averages the metric samples collected in each, and derives per-subject
//! cutoffs as the midpoint between the open and closed extremes.
//!
//! The estimator is a sans-IO state machine; the timed, interactive driver
//! (prompts, window deadlines, cancellation) lives in the monitor binary.

use crate::config::DetectionConfig;
use face_geometry::FaceMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Calibration error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// No usable samples were collected in a window (e.g. no face visible
    /// the whole time); the window must be retried
    #[error("No usable samples collected during the '{0}' window")]
    InsufficientSamples(CalibrationPhase),

    /// `record`/`finish_phase` called with no window open
    #[error("No calibration window is open")]
    NoOpenWindow,

    /// `begin_phase` called while a window is still open
    #[error("A calibration window is already open")]
    WindowAlreadyOpen,

    /// Thresholds requested before all phases completed
    #[error("Calibration is incomplete: {completed} of {required} phases done")]
    Incomplete { completed: usize, required: usize },

    /// `begin_phase` called after the last phase finished
    #[error("All calibration phases are already complete")]
    AlreadyComplete,
}

/// The fixed observation sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPhase {
    EyesOpenMouthClosed,
    EyesClosedMouthClosed,
    EyesOpenMouthOpen,
}

impl CalibrationPhase {
    pub const ALL: [CalibrationPhase; 3] = [
        CalibrationPhase::EyesOpenMouthClosed,
        CalibrationPhase::EyesClosedMouthClosed,
        CalibrationPhase::EyesOpenMouthOpen,
    ];

    /// Operator instruction shown before the window starts
    pub fn prompt(&self) -> &'static str {
        match self {
            CalibrationPhase::EyesOpenMouthClosed => {
                "Keep your eyes open and mouth closed"
            }
            CalibrationPhase::EyesClosedMouthClosed => {
                "Keep your eyes closed and mouth closed"
            }
            CalibrationPhase::EyesOpenMouthOpen => {
                "Keep your eyes open and mouth open"
            }
        }
    }
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationPhase::EyesOpenMouthClosed => write!(f, "eyes open, mouth closed"),
            CalibrationPhase::EyesClosedMouthClosed => write!(f, "eyes closed, mouth closed"),
            CalibrationPhase::EyesOpenMouthOpen => write!(f, "eyes open, mouth open"),
        }
    }
}

/// Mean metrics over one completed window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseAverages {
    pub ear: f64,
    pub mar: f64,
    pub sample_count: usize,
}

/// Derived subject-specific cutoffs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub eye_cutoff: f64,
    pub mouth_cutoff: f64,
}

impl CalibrationOutcome {
    /// Apply the calibrated cutoffs to a base config, keeping its hold
    /// durations and comparison policy
    pub fn apply_to(&self, base: &DetectionConfig) -> DetectionConfig {
        base.with_cutoffs(self.eye_cutoff, self.mouth_cutoff)
    }
}

/// Transient per-window sample accumulator
#[derive(Debug, Default)]
struct CalibrationWindow {
    ear_sum: f64,
    mar_sum: f64,
    count: usize,
}

/// Drives the fixed phase sequence and derives thresholds once all three
/// windows have completed.
#[derive(Debug, Default)]
pub struct CalibrationEstimator {
    completed: Vec<(CalibrationPhase, PhaseAverages)>,
    current: Option<(CalibrationPhase, CalibrationWindow)>,
}

impl CalibrationEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next phase to run, if any
    pub fn next_phase(&self) -> Option<CalibrationPhase> {
        CalibrationPhase::ALL.get(self.completed.len()).copied()
    }

    /// Whether all phases have completed
    pub fn is_complete(&self) -> bool {
        self.completed.len() == CalibrationPhase::ALL.len()
    }

    /// Open the next observation window
    pub fn begin_phase(&mut self) -> Result<CalibrationPhase, CalibrationError> {
        if self.current.is_some() {
            return Err(CalibrationError::WindowAlreadyOpen);
        }
        let phase = self.next_phase().ok_or(CalibrationError::AlreadyComplete)?;
        info!(phase = %phase, "calibration window opened");
        self.current = Some((phase, CalibrationWindow::default()));
        Ok(phase)
    }

    /// Record one frame's metrics into the open window.
    ///
    /// Frames where no face was detected contribute nothing; the caller
    /// simply does not record them.
    pub fn record(&mut self, metrics: FaceMetrics) -> Result<(), CalibrationError> {
        let (_, window) = self.current.as_mut().ok_or(CalibrationError::NoOpenWindow)?;
        window.ear_sum += metrics.ear;
        window.mar_sum += metrics.mar;
        window.count += 1;
        Ok(())
    }

    /// Close the open window and fold its mean into the completed set
    pub fn finish_phase(&mut self) -> Result<PhaseAverages, CalibrationError> {
        let (phase, window) = self.current.take().ok_or(CalibrationError::NoOpenWindow)?;

        if window.count == 0 {
            // Leave the phase unfinished so the operator can retry it
            return Err(CalibrationError::InsufficientSamples(phase));
        }

        let averages = PhaseAverages {
            ear: window.ear_sum / window.count as f64,
            mar: window.mar_sum / window.count as f64,
            sample_count: window.count,
        };
        debug!(
            phase = %phase,
            ear = averages.ear,
            mar = averages.mar,
            samples = averages.sample_count,
            "calibration window closed"
        );
        self.completed.push((phase, averages));
        Ok(averages)
    }

    /// Discard the open window (subject interrupted); the phase can be
    /// started again
    pub fn cancel_phase(&mut self) {
        if let Some((phase, _)) = self.current.take() {
            info!(phase = %phase, "calibration window cancelled");
        }
    }

    /// Derive the cutoffs once all phases completed: each cutoff is the
    /// midpoint between the open and closed means for the subject
    pub fn thresholds(&self) -> Result<CalibrationOutcome, CalibrationError> {
        if !self.is_complete() {
            return Err(CalibrationError::Incomplete {
                completed: self.completed.len(),
                required: CalibrationPhase::ALL.len(),
            });
        }

        let mean = |phase: CalibrationPhase| {
            self.completed
                .iter()
                .find(|(p, _)| *p == phase)
                .map(|(_, avg)| *avg)
                .expect("completed set covers all phases")
        };

        let open = mean(CalibrationPhase::EyesOpenMouthClosed);
        let closed = mean(CalibrationPhase::EyesClosedMouthClosed);
        let yawning = mean(CalibrationPhase::EyesOpenMouthOpen);

        let outcome = CalibrationOutcome {
            eye_cutoff: (open.ear + closed.ear) / 2.0,
            mouth_cutoff: (yawning.mar + open.mar) / 2.0,
        };
        info!(
            eye_cutoff = outcome.eye_cutoff,
            mouth_cutoff = outcome.mouth_cutoff,
            "calibration thresholds derived"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(ear: f64, mar: f64) -> FaceMetrics {
        FaceMetrics { ear, mar }
    }

    fn run_phase(estimator: &mut CalibrationEstimator, samples: &[(f64, f64)]) {
        estimator.begin_phase().unwrap();
        for &(ear, mar) in samples {
            estimator.record(metrics(ear, mar)).unwrap();
        }
        estimator.finish_phase().unwrap();
    }

    #[test]
    fn test_midpoint_thresholds() {
        let mut estimator = CalibrationEstimator::new();

        // Eyes open: EAR 0.30, mouth closed: MAR 0.30
        run_phase(&mut estimator, &[(0.30, 0.30), (0.30, 0.30)]);
        // Eyes closed: EAR 0.10
        run_phase(&mut estimator, &[(0.10, 0.30)]);
        // Mouth open: MAR 0.90
        run_phase(&mut estimator, &[(0.30, 0.90)]);

        let outcome = estimator.thresholds().unwrap();
        assert!((outcome.eye_cutoff - 0.20).abs() < 1e-9);
        assert!((outcome.mouth_cutoff - 0.60).abs() < 1e-9);
    }

    #[test]
    fn test_window_averages_samples() {
        let mut estimator = CalibrationEstimator::new();
        estimator.begin_phase().unwrap();
        estimator.record(metrics(0.20, 0.40)).unwrap();
        estimator.record(metrics(0.40, 0.60)).unwrap();

        let averages = estimator.finish_phase().unwrap();
        assert!((averages.ear - 0.30).abs() < 1e-9);
        assert!((averages.mar - 0.50).abs() < 1e-9);
        assert_eq!(averages.sample_count, 2);
    }

    #[test]
    fn test_empty_window_is_insufficient() {
        let mut estimator = CalibrationEstimator::new();
        let phase = estimator.begin_phase().unwrap();

        let err = estimator.finish_phase().unwrap_err();
        assert_eq!(err, CalibrationError::InsufficientSamples(phase));

        // The phase was not consumed and can be retried
        assert_eq!(estimator.next_phase(), Some(phase));
        estimator.begin_phase().unwrap();
        estimator.record(metrics(0.30, 0.30)).unwrap();
        estimator.finish_phase().unwrap();
        assert_eq!(
            estimator.next_phase(),
            Some(CalibrationPhase::EyesClosedMouthClosed)
        );
    }

    #[test]
    fn test_cancel_discards_window() {
        let mut estimator = CalibrationEstimator::new();
        estimator.begin_phase().unwrap();
        estimator.record(metrics(0.30, 0.30)).unwrap();
        estimator.cancel_phase();

        assert_eq!(
            estimator.finish_phase().unwrap_err(),
            CalibrationError::NoOpenWindow
        );
        // Restart collects from scratch
        estimator.begin_phase().unwrap();
        estimator.record(metrics(0.10, 0.10)).unwrap();
        let averages = estimator.finish_phase().unwrap();
        assert_eq!(averages.sample_count, 1);
    }

    #[test]
    fn test_sequencing_errors() {
        let mut estimator = CalibrationEstimator::new();

        assert_eq!(
            estimator.record(metrics(0.3, 0.3)).unwrap_err(),
            CalibrationError::NoOpenWindow
        );

        estimator.begin_phase().unwrap();
        assert_eq!(
            estimator.begin_phase().unwrap_err(),
            CalibrationError::WindowAlreadyOpen
        );

        assert!(matches!(
            estimator.thresholds().unwrap_err(),
            CalibrationError::Incomplete { completed: 0, required: 3 }
        ));
    }

    #[test]
    fn test_all_phases_then_complete() {
        let mut estimator = CalibrationEstimator::new();
        for _ in 0..3 {
            run_phase(&mut estimator, &[(0.25, 0.50)]);
        }
        assert!(estimator.is_complete());
        assert_eq!(estimator.next_phase(), None);
        assert_eq!(
            estimator.begin_phase().unwrap_err(),
            CalibrationError::AlreadyComplete
        );
    }

    #[test]
    fn test_outcome_applies_to_base_config() {
        let outcome = CalibrationOutcome {
            eye_cutoff: 0.20,
            mouth_cutoff: 0.60,
        };
        let config = outcome.apply_to(&DetectionConfig::default());
        assert_eq!(config.eyes.cutoff, 0.20);
        assert_eq!(config.mouth.cutoff, 0.60);
        assert_eq!(config.eyes.hold, DetectionConfig::default().eyes.hold);
    }
}
