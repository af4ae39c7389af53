//! Multi-signal alert fusion

use crate::config::{DetectionConfig, GapPolicy, SignalRule};
use crate::debounce::{AlertEvent, SignalDebouncer};
use crate::SignalKind;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// One metric observation for one signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub signal: SignalKind,
    pub value: f64,
    pub at: Instant,
}

impl MetricSample {
    pub fn new(signal: SignalKind, value: f64, at: Instant) -> Self {
        Self { signal, value, at }
    }
}

/// Per-signal view of a processed frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStatus {
    pub signal: SignalKind,
    /// Observed metric value, if the frame carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Whether the value fell in the active region
    pub active: bool,
    /// Whether the alert fired on this frame
    pub fired: bool,
    /// Time spent in the current episode (milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_ms: Option<u64>,
}

/// Fusion result for one frame, consumed by the overlay renderer, the
/// audio trigger, and the HTTP response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Whether the frame carried any observation
    pub face_detected: bool,
    /// Logical OR of the per-signal fire flags for this frame
    pub combined_alert: bool,
    /// Per-signal detail
    pub signals: Vec<SignalStatus>,
}

impl FrameAnalysis {
    /// Whether a given signal fired on this frame
    pub fn fired(&self, signal: SignalKind) -> bool {
        self.signals
            .iter()
            .any(|s| s.signal == signal && s.fired)
    }

    /// Whether a given signal is currently in its active region
    pub fn active(&self, signal: SignalKind) -> bool {
        self.signals
            .iter()
            .any(|s| s.signal == signal && s.active)
    }

    /// Observed value for a given signal, if any
    pub fn value(&self, signal: SignalKind) -> Option<f64> {
        self.signals
            .iter()
            .find(|s| s.signal == signal)
            .and_then(|s| s.value)
    }
}

/// Owns one debouncer per tracked signal and folds their per-frame fire
/// flags into a combined decision.
///
/// Fusion policy: any signal alone is sufficient. Per-signal events are
/// always reported individually alongside the combined flag.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    debouncers: Vec<SignalDebouncer>,
    gap_policy: GapPolicy,
}

impl FusionEngine {
    pub fn new(config: &DetectionConfig) -> Self {
        Self::with_signals(config.signals(), config.gap_policy)
    }

    /// Build an engine over an arbitrary signal set (zero, one, or many)
    pub fn with_signals(
        signals: impl IntoIterator<Item = (SignalKind, SignalRule)>,
        gap_policy: GapPolicy,
    ) -> Self {
        let debouncers = signals
            .into_iter()
            .map(|(signal, rule)| SignalDebouncer::new(signal, rule))
            .collect();
        Self {
            debouncers,
            gap_policy,
        }
    }

    /// Feed one frame's samples through the debouncers.
    ///
    /// A tracked signal with no sample in `samples` is handled per the gap
    /// policy, as if the whole frame had carried no observation for it.
    pub fn process_frame(&mut self, samples: &[MetricSample], now: Instant) -> FrameAnalysis {
        let mut statuses = Vec::with_capacity(self.debouncers.len());
        let mut events: Vec<AlertEvent> = Vec::new();

        for i in 0..self.debouncers.len() {
            let sample = samples
                .iter()
                .find(|s| s.signal == self.debouncers[i].signal())
                .copied();

            let status = match sample {
                Some(sample) => {
                    let debouncer = &mut self.debouncers[i];
                    let event = debouncer.observe(sample.value, sample.at);
                    let fired = event.is_some();
                    if let Some(event) = event {
                        events.push(event);
                    }
                    SignalStatus {
                        signal: debouncer.signal(),
                        value: Some(sample.value),
                        active: debouncer.in_episode(),
                        fired,
                        episode_ms: debouncer.elapsed(sample.at).map(|d| d.as_millis() as u64),
                    }
                }
                None => self.gap_status(i, now),
            };
            statuses.push(status);
        }

        let combined_alert = !events.is_empty();
        if combined_alert {
            info!(
                signals = ?events.iter().map(|e| e.signal).collect::<Vec<_>>(),
                "drowsiness alert"
            );
        }

        FrameAnalysis {
            face_detected: !samples.is_empty(),
            combined_alert,
            signals: statuses,
        }
    }

    /// Process a frame with no observation at all (no face detected).
    ///
    /// Never an alert; running episodes are reset or held per the gap
    /// policy.
    pub fn observe_absent(&mut self, now: Instant) -> FrameAnalysis {
        let statuses = (0..self.debouncers.len())
            .map(|i| self.gap_status(i, now))
            .collect();

        FrameAnalysis {
            face_detected: false,
            combined_alert: false,
            signals: statuses,
        }
    }

    /// Reset all debounce state (new subject, new session)
    pub fn reset(&mut self) {
        for debouncer in &mut self.debouncers {
            debouncer.reset();
        }
    }

    /// Signals tracked by this engine
    pub fn tracked_signals(&self) -> Vec<SignalKind> {
        self.debouncers.iter().map(|d| d.signal()).collect()
    }

    fn gap_status(&mut self, index: usize, now: Instant) -> SignalStatus {
        let debouncer = &mut self.debouncers[index];
        let signal = debouncer.signal();

        match self.gap_policy {
            GapPolicy::ResetEpisode => {
                if debouncer.in_episode() {
                    debug!(signal = %signal, "observation gap, resetting episode");
                }
                debouncer.reset();
                SignalStatus {
                    signal,
                    value: None,
                    active: false,
                    fired: false,
                    episode_ms: None,
                }
            }
            GapPolicy::HoldEpisode => SignalStatus {
                signal,
                value: None,
                active: false,
                fired: false,
                episode_ms: debouncer.elapsed(now).map(|d| d.as_millis() as u64),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(origin: Instant, secs: f64) -> Instant {
        origin + Duration::from_secs_f64(secs)
    }

    fn samples(ear: f64, mar: f64, now: Instant) -> Vec<MetricSample> {
        vec![
            MetricSample::new(SignalKind::EyesClosed, ear, now),
            MetricSample::new(SignalKind::MouthOpen, mar, now),
        ]
    }

    #[test]
    fn test_combined_is_or_of_fire_flags() {
        let origin = Instant::now();
        let mut engine = FusionEngine::new(&DetectionConfig::default());

        // Mouth open long enough, eyes fine
        engine.process_frame(&samples(0.30, 0.80, at(origin, 0.0)), at(origin, 0.0));
        let result = engine.process_frame(&samples(0.30, 0.80, at(origin, 1.0)), at(origin, 1.0));

        assert!(result.combined_alert);
        assert!(result.fired(SignalKind::MouthOpen));
        assert!(!result.fired(SignalKind::EyesClosed));
    }

    #[test]
    fn test_both_signals_fire_independently_same_frame() {
        let origin = Instant::now();
        let config = DetectionConfig {
            eyes: SignalRule::below(0.20, Duration::from_secs(1)),
            mouth: SignalRule::above(0.65, Duration::from_secs(1)),
            gap_policy: GapPolicy::default(),
        };
        let mut engine = FusionEngine::new(&config);

        engine.process_frame(&samples(0.10, 0.80, at(origin, 0.0)), at(origin, 0.0));
        let result = engine.process_frame(&samples(0.10, 0.80, at(origin, 1.5)), at(origin, 1.5));

        assert!(result.combined_alert);
        assert!(result.fired(SignalKind::EyesClosed));
        assert!(result.fired(SignalKind::MouthOpen));
    }

    #[test]
    fn test_quiet_frame_no_alert() {
        let origin = Instant::now();
        let mut engine = FusionEngine::new(&DetectionConfig::default());

        let result = engine.process_frame(&samples(0.30, 0.40, at(origin, 0.0)), at(origin, 0.0));
        assert!(!result.combined_alert);
        assert!(result.face_detected);
        assert!(result.signals.iter().all(|s| !s.fired && !s.active));
    }

    #[test]
    fn test_no_face_resets_episodes() {
        let origin = Instant::now();
        let mut engine = FusionEngine::new(&DetectionConfig::default());

        // Build up 2s of eye closure, then lose the face
        engine.process_frame(&samples(0.10, 0.40, at(origin, 0.0)), at(origin, 0.0));
        engine.process_frame(&samples(0.10, 0.40, at(origin, 2.0)), at(origin, 2.0));

        let gap = engine.observe_absent(at(origin, 2.5));
        assert!(!gap.combined_alert);
        assert!(!gap.face_detected);
        assert!(gap.signals.iter().all(|s| !s.fired && !s.active));

        // The closure run starts over: 3.1s from the gap is not enough
        // counted from t=3.0
        engine.process_frame(&samples(0.10, 0.40, at(origin, 3.0)), at(origin, 3.0));
        let result = engine.process_frame(&samples(0.10, 0.40, at(origin, 5.0)), at(origin, 5.0));
        assert!(!result.combined_alert);

        let result = engine.process_frame(&samples(0.10, 0.40, at(origin, 6.0)), at(origin, 6.0));
        assert!(result.combined_alert);
    }

    #[test]
    fn test_hold_policy_survives_gap() {
        let origin = Instant::now();
        let config = DetectionConfig {
            gap_policy: GapPolicy::HoldEpisode,
            ..DetectionConfig::default()
        };
        let mut engine = FusionEngine::new(&config);

        engine.process_frame(&samples(0.10, 0.40, at(origin, 0.0)), at(origin, 0.0));
        engine.observe_absent(at(origin, 1.0));

        // Episode survived the gap; 3s after its start the alert fires
        let result = engine.process_frame(&samples(0.10, 0.40, at(origin, 3.0)), at(origin, 3.0));
        assert!(result.combined_alert);
    }

    #[test]
    fn test_missing_single_signal_sample_uses_gap_policy() {
        let origin = Instant::now();
        let mut engine = FusionEngine::new(&DetectionConfig::default());

        engine.process_frame(&samples(0.10, 0.40, at(origin, 0.0)), at(origin, 0.0));

        // Frame with only a mouth sample: the eye episode resets
        let only_mouth = vec![MetricSample::new(
            SignalKind::MouthOpen,
            0.40,
            at(origin, 1.0),
        )];
        engine.process_frame(&only_mouth, at(origin, 1.0));

        engine.process_frame(&samples(0.10, 0.40, at(origin, 2.0)), at(origin, 2.0));
        let result = engine.process_frame(&samples(0.10, 0.40, at(origin, 4.0)), at(origin, 4.0));
        assert!(!result.combined_alert, "episode should have restarted at t=2");
    }

    #[test]
    fn test_empty_signal_set() {
        let origin = Instant::now();
        let mut engine = FusionEngine::with_signals([], GapPolicy::default());

        let result = engine.process_frame(&[], at(origin, 0.0));
        assert!(!result.combined_alert);
        assert!(result.signals.is_empty());
    }

    #[test]
    fn test_reset_clears_all_state() {
        let origin = Instant::now();
        let mut engine = FusionEngine::new(&DetectionConfig::default());

        engine.process_frame(&samples(0.10, 0.80, at(origin, 0.0)), at(origin, 0.0));
        engine.reset();

        // Post-reset, nothing is close to firing
        let result = engine.process_frame(&samples(0.10, 0.80, at(origin, 0.5)), at(origin, 0.5));
        assert!(!result.combined_alert);
    }
}
