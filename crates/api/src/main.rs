//! Drowsiness Detection Server - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Optional config file path as the only argument
    let config_file = std::env::args().nth(1);
    let settings = Settings::load(config_file.as_deref())?;

    info!("=== Drowsiness Detection Server v{} ===", env!("CARGO_PKG_VERSION"));
    run_server(settings).await?;

    Ok(())
}
