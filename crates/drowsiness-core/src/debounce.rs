//! Per-signal debounce state machine

use crate::config::SignalRule;
use crate::SignalKind;
use std::time::{Duration, Instant};
use tracing::debug;

/// Edge-triggered alert, emitted at most once per continuous active episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertEvent {
    pub signal: SignalKind,
    pub fired_at: Instant,
}

/// Mutable debounce state, owned exclusively by one debouncer
#[derive(Debug, Clone, Copy, Default)]
struct DebounceState {
    episode_start: Option<Instant>,
    alert_fired: bool,
}

/// Tracks continuous-activity duration for one signal and fires a single
/// alert once the activity has persisted for the configured hold time.
///
/// Deterministic state transition over an always-available input; there is
/// no failure path and no re-fire until the signal first drops inactive.
#[derive(Debug, Clone)]
pub struct SignalDebouncer {
    signal: SignalKind,
    rule: SignalRule,
    state: DebounceState,
}

impl SignalDebouncer {
    pub fn new(signal: SignalKind, rule: SignalRule) -> Self {
        Self {
            signal,
            rule,
            state: DebounceState::default(),
        }
    }

    /// Feed one sample. Returns the alert event on the first frame where
    /// the episode's elapsed time reaches the hold duration.
    pub fn observe(&mut self, value: f64, now: Instant) -> Option<AlertEvent> {
        if !self.rule.is_active(value) {
            self.reset();
            return None;
        }

        let Some(start) = self.state.episode_start else {
            // Episode just started, not yet long enough
            self.state.episode_start = Some(now);
            return None;
        };

        if now.duration_since(start) >= self.rule.hold && !self.state.alert_fired {
            self.state.alert_fired = true;
            debug!(signal = %self.signal, "debounce hold elapsed, firing alert");
            return Some(AlertEvent {
                signal: self.signal,
                fired_at: now,
            });
        }

        None
    }

    /// Clear the episode, as if the signal had dropped inactive
    pub fn reset(&mut self) {
        self.state = DebounceState::default();
    }

    /// Whether an active episode is currently running
    pub fn in_episode(&self) -> bool {
        self.state.episode_start.is_some()
    }

    /// Time spent in the current episode, if one is running
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.state
            .episode_start
            .map(|start| now.duration_since(start))
    }

    /// Whether the current episode has already alerted
    pub fn has_fired(&self) -> bool {
        self.state.alert_fired
    }

    pub fn signal(&self) -> SignalKind {
        self.signal
    }

    pub fn rule(&self) -> &SignalRule {
        &self.rule
    }
}
