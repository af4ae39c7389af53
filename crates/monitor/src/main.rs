//! Drowsiness Monitor - Main Entry Point

use alert_audio::{AlarmScheduler, TerminalBellPlayer};
use capture::ImageDirSource;
use drowsiness_core::FusionEngine;
use landmark_detector::LandmarkDetector;
use monitor::{init_logging, run_detection_loop, Settings};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // Optional config file path as the only argument
    let config_file = std::env::args().nth(1);
    let settings = Settings::load(config_file.as_deref())?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let mut source = ImageDirSource::new(Path::new(&settings.source.frames_dir), settings.source.fps)?;
    let detector = LandmarkDetector::new(&settings.detector)?;
    let mut engine = FusionEngine::new(&settings.detection);
    let alarm = AlarmScheduler::new(Arc::new(TerminalBellPlayer));

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received");
            shutdown.store(true, Ordering::Release);
        });
    }

    let frame_size = (settings.frame.width, settings.frame.height);
    let loop_alarm = alarm.clone();
    let loop_shutdown = Arc::clone(&shutdown);
    let summary = tokio::task::spawn_blocking(move || {
        run_detection_loop(
            &mut source,
            &detector,
            &mut engine,
            &loop_alarm,
            frame_size,
            &loop_shutdown,
        )
    })
    .await??;

    alarm.shutdown();
    info!(
        "Session done: {} frames processed, {} alerts",
        summary.frames, summary.alerts
    );

    Ok(())
}
