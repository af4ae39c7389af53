//! Alarm Playback Scheduling
//!
//! The alert sound itself is an external collaborator behind the
//! `AlarmPlayer` trait. The scheduler makes triggering non-blocking for the
//! detection loop and enforces the overlap policy: a trigger that arrives
//! while a sound is still playing is dropped, never queued.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Playback error types
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Playback failed: {0}")]
    Failed(String),
}

/// Blocking alarm playback; runs to completion of the sound.
///
/// Implementations are called on a blocking worker thread, never on the
/// detection loop.
pub trait AlarmPlayer: Send + Sync + 'static {
    fn play(&self) -> Result<(), PlaybackError>;
}

/// Rings the terminal bell. The stand-in player for environments without
/// an audio device wired up.
#[derive(Debug, Default)]
pub struct TerminalBellPlayer;

impl AlarmPlayer for TerminalBellPlayer {
    fn play(&self) -> Result<(), PlaybackError> {
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| PlaybackError::Failed(e.to_string()))
    }
}

/// Schedules alarm playback off the hot path.
///
/// - `trigger` returns immediately; playback runs on `spawn_blocking`
/// - a trigger while playback is in flight is dropped (overlap policy)
/// - playback failure is logged and never propagates to the caller
/// - after `shutdown`, triggers are no-ops; an in-flight sound is
///   abandoned rather than waited for
#[derive(Clone)]
pub struct AlarmScheduler {
    player: Arc<dyn AlarmPlayer>,
    playing: Arc<AtomicBool>,
    shut_down: Arc<AtomicBool>,
}

impl AlarmScheduler {
    pub fn new(player: Arc<dyn AlarmPlayer>) -> Self {
        Self {
            player,
            playing: Arc::new(AtomicBool::new(false)),
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request the alarm sound. Must be called from within a tokio runtime.
    pub fn trigger(&self) {
        if self.shut_down.load(Ordering::Acquire) {
            return;
        }
        if self.playing.swap(true, Ordering::AcqRel) {
            debug!("alarm already playing, dropping trigger");
            return;
        }

        let player = Arc::clone(&self.player);
        let playing = Arc::clone(&self.playing);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = player.play() {
                warn!("alarm playback failed: {e}");
            }
            playing.store(false, Ordering::Release);
        });
    }

    /// Whether a sound is currently playing
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Stop accepting triggers. Any in-flight playback is abandoned to the
    /// worker thread instead of being waited for.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            info!("alarm scheduler shut down");
        }
    }
}
