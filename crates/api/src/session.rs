//! Per-session fusion engine ownership
//!
//! Debounce state is never shared across clients: each session id owns its
//! own engine, created on first use and evicted after an idle TTL. The
//! registry itself lives inside the app state lock, so one mutation is in
//! flight at a time.

use drowsiness_core::{DetectionConfig, FusionEngine};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

struct SessionEntry {
    engine: FusionEngine,
    last_seen: Instant,
}

/// Registry of per-session fusion engines
pub struct SessionRegistry {
    sessions: HashMap<String, SessionEntry>,
    config: DetectionConfig,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(config: DetectionConfig, idle_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
            idle_ttl,
        }
    }

    /// Engine for a session, created on first use. Touches the session's
    /// idle timer and evicts stale sessions along the way.
    pub fn engine_for(&mut self, session_id: &str, now: Instant) -> &mut FusionEngine {
        self.evict_stale(now);

        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session = session_id, "new detection session");
                SessionEntry {
                    engine: FusionEngine::new(&self.config),
                    last_seen: now,
                }
            });
        entry.last_seen = now;
        &mut entry.engine
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_stale(&mut self, now: Instant) {
        let ttl = self.idle_ttl;
        self.sessions.retain(|id, entry| {
            let keep = now.duration_since(entry.last_seen) < ttl;
            if !keep {
                debug!(session = id.as_str(), "evicting idle session");
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drowsiness_core::{MetricSample, SignalKind};

    fn registry(ttl_secs: u64) -> SessionRegistry {
        SessionRegistry::new(DetectionConfig::default(), Duration::from_secs(ttl_secs))
    }

    fn closed_eyes(at: Instant) -> Vec<MetricSample> {
        vec![
            MetricSample::new(SignalKind::EyesClosed, 0.10, at),
            MetricSample::new(SignalKind::MouthOpen, 0.40, at),
        ]
    }

    #[test]
    fn test_sessions_are_isolated() {
        let origin = Instant::now();
        let mut registry = registry(300);

        // Session A accumulates 3s of closure and fires
        registry
            .engine_for("a", origin)
            .process_frame(&closed_eyes(origin), origin);
        let later = origin + Duration::from_secs(3);
        let a = registry
            .engine_for("a", later)
            .process_frame(&closed_eyes(later), later);
        assert!(a.combined_alert);

        // Session B starts fresh and must not inherit A's episode
        let b = registry
            .engine_for("b", later)
            .process_frame(&closed_eyes(later), later);
        assert!(!b.combined_alert);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_idle_sessions_are_evicted() {
        let origin = Instant::now();
        let mut registry = registry(10);

        registry.engine_for("a", origin);
        registry.engine_for("b", origin + Duration::from_secs(9));

        // Touching the registry at t=15 drops "a" (idle 15s) but not "b"
        registry.engine_for("c", origin + Duration::from_secs(15));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_eviction_resets_debounce_state() {
        let origin = Instant::now();
        let mut registry = registry(10);

        registry
            .engine_for("a", origin)
            .process_frame(&closed_eyes(origin), origin);

        // After eviction the same id gets a fresh engine: a sample 20s
        // later does not complete the old episode
        let later = origin + Duration::from_secs(20);
        let result = registry
            .engine_for("a", later)
            .process_frame(&closed_eyes(later), later);
        assert!(!result.combined_alert);
    }
}
