//! Per-IP rate limiting for the detection endpoint
//!
//! Each `POST /detect_drowsiness` call runs a full decode + detect +
//! fusion cycle, so the route is guarded with GCRA rate limiting keyed by
//! peer IP. Browser clients stream frames at a few per second; the
//! defaults leave headroom for that while capping runaway callers.

use crate::settings::RateLimitSettings;
use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config keyed by peer IP, with X-RateLimit-* response headers
pub type DetectGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Build the governor config for the detect route.
///
/// Requires the service to be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the peer IP is
/// available to the key extractor.
pub fn detect_governor(settings: &RateLimitSettings) -> Arc<DetectGovernorConfig> {
    Arc::new(
        GovernorConfigBuilder::default()
            .per_second(settings.per_second)
            .burst_size(settings.burst_size)
            .use_headers()
            .finish()
            .expect("non-zero rate limit settings"),
    )
}
