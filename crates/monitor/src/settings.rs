//! Monitor settings

use drowsiness_core::DetectionConfig;
use landmark_detector::DetectorConfig;
use serde::Deserialize;

/// Top-level monitor settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub frame: FrameSettings,
    pub detection: DetectionConfig,
    pub detector: DetectorConfig,
    pub calibration: CalibrationSettings,
}

/// Where frames come from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Directory of still frames for offline runs
    pub frames_dir: String,
    /// Frame rate the timestamps are synthesized at
    pub fps: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            frames_dir: "frames".to_string(),
            fps: 30,
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
pub struct CalibrationSettings {
    /// Length of each observation window in seconds
    pub window_secs: u64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self { window_secs: 10 }
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
