//! Interactive threshold calibration
//!
//! Runs the fixed window sequence against the configured frame source and
//! prints the calibrated cutoffs as a config-file fragment. Ctrl-C cancels
//! an in-flight window and aborts.

use capture::ImageDirSource;
use drowsiness_core::CalibrationEstimator;
use landmark_detector::LandmarkDetector;
use monitor::{
    init_logging, render_toml_fragment, run_calibration_window, MonitorError, Settings,
};
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config_file = std::env::args().nth(1);
    let settings = Settings::load(config_file.as_deref())?;

    info!("=== Threshold Calibration v{} ===", env!("CARGO_PKG_VERSION"));

    let mut source = ImageDirSource::new(Path::new(&settings.source.frames_dir), settings.source.fps)?;
    let detector = LandmarkDetector::new(&settings.detector)?;
    let window = Duration::from_secs(settings.calibration.window_secs);
    let frame_size = (settings.frame.width, settings.frame.height);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            shutdown.store(true, Ordering::Release);
        });
    }

    let loop_shutdown = Arc::clone(&shutdown);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut estimator = CalibrationEstimator::new();

        while !estimator.is_complete() {
            let phase = estimator.next_phase().expect("incomplete estimator has a phase");
            println!();
            println!("[CALIBRATION] {}", phase.prompt());
            println!(
                "Press Enter to start the {}s window...",
                window.as_secs()
            );
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).ok();

            if loop_shutdown.load(Ordering::Acquire) {
                return Err(MonitorError::Interrupted);
            }

            match run_calibration_window(
                &mut estimator,
                &mut source,
                &detector,
                frame_size,
                window,
                &loop_shutdown,
            ) {
                Ok(()) => {}
                Err(MonitorError::Calibration(e)) => {
                    // Empty window: surface it and rerun the same phase
                    warn!("{e}; retrying this window");
                }
                Err(e) => return Err(e),
            }
        }

        estimator.thresholds().map_err(MonitorError::from)
    })
    .await??;

    println!();
    println!("Calibrated thresholds (paste into your config file):");
    println!();
    print!("{}", render_toml_fragment(&outcome));

    Ok(())
}
