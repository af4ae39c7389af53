//! Drowsiness Detection API Server
//!
//! Wraps one detection + fusion cycle per request behind
//! `POST /detect_drowsiness`. Debounce state is owned per client session
//! (see `session`), never shared module-level state, so concurrent
//! clients cannot race each other's timers.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod rate_limit;
mod routes;
pub mod session;
pub mod settings;

pub use settings::Settings;

use landmark_detector::{DetectorError, LandmarkDetector};
use session::SessionRegistry;

/// Application state shared across handlers
pub struct AppState {
    /// Per-session fusion engines
    pub sessions: SessionRegistry,
    /// Face + landmark detector
    pub detector: LandmarkDetector,
    /// Analysis frame width
    pub frame_width: u32,
    /// Analysis frame height
    pub frame_height: u32,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

/// Handler state: one mutation in flight at a time via the write lock
pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    /// Create application state from settings
    pub fn new(settings: &Settings) -> Result<Self, DetectorError> {
        Ok(Self {
            sessions: SessionRegistry::new(
                settings.detection.clone(),
                Duration::from_secs(settings.session.idle_ttl_secs),
            ),
            detector: LandmarkDetector::new(&settings.detector)?,
            frame_width: settings.frame.width,
            frame_height: settings.frame.height,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}

/// Create the application router
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let detect = Router::new()
        .route("/detect_drowsiness", post(routes::detect::detect_drowsiness))
        .layer(GovernorLayer {
            config: rate_limit::detect_governor(&settings.rate_limit),
        });

    Router::new()
        .merge(detect)
        .route("/api/v1/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.len(),
    })
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server until a shutdown signal arrives
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(RwLock::new(AppState::new(&settings)?));
    let app = create_router(state, &settings);

    info!("Starting detection server on {}", settings.server.listen_addr);

    let listener = tokio::net::TcpListener::bind(&settings.server.listen_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_router_builds_from_default_settings() {
        let settings = Settings::default();
        let state = Arc::new(RwLock::new(AppState::new(&settings).unwrap()));
        let _router = create_router(state.clone(), &settings);

        let health = state.read().await;
        assert!(health.sessions.is_empty());
    }
}
