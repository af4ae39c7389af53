//! Server settings
//!
//! Layered configuration: `config/default.toml`, an optional explicit
//! file, then `DROWSY_*` environment variables. Every knob the endpoint
//! needs is externally supplied; nothing is hard-coded at call sites.

use drowsiness_core::DetectionConfig;
use landmark_detector::DetectorConfig;
use serde::Deserialize;

/// Top-level server settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub detection: DetectionConfig,
    pub frame: FrameSettings,
    pub detector: DetectorConfig,
    pub session: SessionSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Analysis frame dimensions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 576,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Idle seconds after which a session's debounce state is evicted
    pub idle_ttl_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { idle_ttl_secs: 300 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Seconds per replenished request
    pub per_second: u64,
    /// Requests that may burst immediately
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 30,
        }
    }
}

impl Settings {
    /// Load layered settings: bundled defaults, optional file, environment
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file));
        }

        builder
            .add_source(config::Environment::with_prefix("DROWSY").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_core_config() {
        let settings = Settings::default();
        assert_eq!(settings.detection, DetectionConfig::default());
        assert_eq!(settings.frame.width, 1024);
        assert_eq!(settings.frame.height, 576);
        assert!(settings.detector.model_path.is_none());
    }

    #[test]
    fn test_detection_config_accepts_partial_file() {
        let json = serde_json::json!({
            "detection": {
                "eyes": {
                    "cutoff": 0.22,
                    "direction": "below",
                    "inclusive": true,
                    "hold_secs": 2.5
                }
            }
        });
        let settings: Settings = serde_json::from_value(json).unwrap();

        assert_eq!(settings.detection.eyes.cutoff, 0.22);
        assert!(settings.detection.eyes.inclusive);
        assert_eq!(
            settings.detection.eyes.hold,
            std::time::Duration::from_secs_f64(2.5)
        );
        // Unspecified sections keep their defaults
        assert_eq!(settings.detection.mouth, DetectionConfig::default().mouth);
        assert_eq!(settings.session.idle_ttl_secs, 300);
    }
}
