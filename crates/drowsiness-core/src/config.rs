//! Detection configuration

use crate::SignalKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which side of the cutoff counts as active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Active when the value is below the cutoff (eye closure)
    Below,
    /// Active when the value is above the cutoff (mouth opening)
    Above,
}

/// Activation rule for one signal.
///
/// `inclusive` controls whether a value exactly equal to the cutoff counts
/// as active. Immutable after construction; calibration produces a new
/// `DetectionConfig` rather than mutating rules in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRule {
    /// Cutoff the value is compared against
    pub cutoff: f64,
    /// Comparison direction
    pub direction: Direction,
    /// Whether the boundary value itself counts as active
    pub inclusive: bool,
    /// How long the signal must stay active before an alert fires
    #[serde(rename = "hold_secs", with = "duration_secs")]
    pub hold: Duration,
}

/// Seconds-as-float representation for config files
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

impl SignalRule {
    pub fn below(cutoff: f64, hold: Duration) -> Self {
        Self {
            cutoff,
            direction: Direction::Below,
            inclusive: false,
            hold,
        }
    }

    pub fn above(cutoff: f64, hold: Duration) -> Self {
        Self {
            cutoff,
            direction: Direction::Above,
            inclusive: false,
            hold,
        }
    }

    pub fn inclusive(mut self) -> Self {
        self.inclusive = true;
        self
    }

    /// Whether a value falls in this rule's active region
    pub fn is_active(&self, value: f64) -> bool {
        match (self.direction, self.inclusive) {
            (Direction::Below, false) => value < self.cutoff,
            (Direction::Below, true) => value <= self.cutoff,
            (Direction::Above, false) => value > self.cutoff,
            (Direction::Above, true) => value >= self.cutoff,
        }
    }
}

/// What a frame without an observation does to a running episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// A missed frame resets the episode; there is no positive evidence
    /// to sustain it
    #[default]
    ResetEpisode,
    /// Episodes freeze across the gap and resume on the next observation
    HoldEpisode,
}

/// Detection configuration for the standard eye + mouth signal pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Eye closure rule (active below cutoff)
    pub eyes: SignalRule,
    /// Mouth opening rule (active above cutoff)
    pub mouth: SignalRule,
    /// Missed-observation handling
    pub gap_policy: GapPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            eyes: SignalRule::below(0.18, Duration::from_secs(3)),
            mouth: SignalRule::above(0.65, Duration::from_secs(1)),
            gap_policy: GapPolicy::default(),
        }
    }
}

impl DetectionConfig {
    /// Create strict config (fires earlier)
    pub fn strict() -> Self {
        Self {
            eyes: SignalRule::below(0.20, Duration::from_secs(2)),
            mouth: SignalRule::above(0.60, Duration::from_secs(1)),
            ..Default::default()
        }
    }

    /// Create lenient config (tolerates longer closures)
    pub fn lenient() -> Self {
        Self {
            eyes: SignalRule::below(0.16, Duration::from_secs(4)),
            mouth: SignalRule::above(0.79, Duration::from_secs(2)),
            ..Default::default()
        }
    }

    /// Tracked signals in processing order
    pub fn signals(&self) -> Vec<(SignalKind, SignalRule)> {
        vec![
            (SignalKind::EyesClosed, self.eyes),
            (SignalKind::MouthOpen, self.mouth),
        ]
    }

    /// Derive a new config with calibrated cutoffs, keeping hold durations
    /// and comparison policy
    pub fn with_cutoffs(&self, eye_cutoff: f64, mouth_cutoff: f64) -> Self {
        Self {
            eyes: SignalRule {
                cutoff: eye_cutoff,
                ..self.eyes
            },
            mouth: SignalRule {
                cutoff: mouth_cutoff,
                ..self.mouth
            },
            gap_policy: self.gap_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_boundary() {
        let below = SignalRule::below(0.20, Duration::from_secs(3));
        assert!(below.is_active(0.19));
        assert!(!below.is_active(0.20));

        let above = SignalRule::above(0.65, Duration::from_secs(1));
        assert!(above.is_active(0.66));
        assert!(!above.is_active(0.65));
    }

    #[test]
    fn test_inclusive_boundary() {
        let below = SignalRule::below(0.20, Duration::from_secs(3)).inclusive();
        assert!(below.is_active(0.20));
        assert!(!below.is_active(0.21));

        let above = SignalRule::above(0.65, Duration::from_secs(1)).inclusive();
        assert!(above.is_active(0.65));
        assert!(!above.is_active(0.64));
    }

    #[test]
    fn test_calibrated_cutoffs_keep_holds() {
        let base = DetectionConfig::default();
        let derived = base.with_cutoffs(0.22, 0.71);

        assert_eq!(derived.eyes.cutoff, 0.22);
        assert_eq!(derived.mouth.cutoff, 0.71);
        assert_eq!(derived.eyes.hold, base.eyes.hold);
        assert_eq!(derived.mouth.hold, base.mouth.hold);
    }
}
