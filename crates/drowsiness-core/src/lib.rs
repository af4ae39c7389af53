//! Drowsiness Detection Core
//!
//! Temporal signal fusion and alert state machine:
//! - Per-signal debounced timers (continuous-activity duration vs. hold time)
//! - Edge-triggered, one-shot alert events per active episode
//! - Multi-signal fusion (any tracked signal alone is sufficient)
//! - Subject-specific threshold calibration
//!
//! The core is deterministic and sans-IO: it consumes metric values plus
//! monotonic timestamps and never blocks or fails on the hot path.

pub mod calibration;
pub mod config;
pub mod debounce;
pub mod fusion;

pub use calibration::{CalibrationError, CalibrationEstimator, CalibrationOutcome, CalibrationPhase};
pub use config::{DetectionConfig, Direction, GapPolicy, SignalRule};
pub use debounce::{AlertEvent, SignalDebouncer};
pub use fusion::{FrameAnalysis, FusionEngine, MetricSample, SignalStatus};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracked drowsiness signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Eye aperture below threshold (prolonged closure)
    EyesClosed,
    /// Mouth aperture above threshold (yawn)
    MouthOpen,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::EyesClosed => write!(f, "eyes_closed"),
            SignalKind::MouthOpen => write!(f, "mouth_open"),
        }
    }
}
