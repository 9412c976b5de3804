// src/config/mod.rs
//! Layered configuration for the finger timer

pub mod constants;
pub mod loader;
pub mod validator;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};
pub use validator::{FieldConstraint, SchemaValidator, ValidationError};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete device configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub system: SystemSettings,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
}

/// What the control loop does each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Timer,
    DataCollection,
}

/// Which classifier produces the raw per-cycle decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Brightness/edge heuristic confirmed by consecutive matches
    Heuristic,
    /// Feature vector + inference service confirmed by majority vote
    Model,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemSettings {
    #[serde(default = "defaults::mode")]
    pub mode: OperatingMode,

    #[serde(default = "defaults::loop_interval_ms")]
    pub loop_interval_ms: u64,

    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

/// Capture timing for polled cameras
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    #[serde(default = "defaults::capture_timeout_ms")]
    pub capture_timeout_ms: u64,

    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "defaults::capture_retries")]
    pub capture_retries: u32,
}

/// How frame bytes are turned into samples and pixels
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SamplingConfig {
    #[serde(default = "defaults::header_skip_bytes")]
    pub header_skip_bytes: usize,

    #[serde(default = "defaults::sample_stride")]
    pub sample_stride: usize,

    #[serde(default = "defaults::scan_window")]
    pub scan_window: usize,

    #[serde(default = "defaults::max_samples")]
    pub max_samples: usize,

    #[serde(default = "defaults::pixel_budget")]
    pub pixel_budget: usize,

    #[serde(default = "defaults::min_usable_pixels")]
    pub min_usable_pixels: usize,

    #[serde(default = "defaults::feature_count")]
    pub feature_count: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DetectionConfig {
    #[serde(default = "defaults::decision_source")]
    pub source: DecisionSource,

    #[serde(default = "defaults::detection_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "defaults::confirmation_required")]
    pub confirmation_required: u32,

    #[serde(default = "defaults::smoothing_window")]
    pub smoothing_window: usize,

    #[serde(default = "defaults::confidence_threshold")]
    pub confidence_threshold: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

/// Dwell times and side-effect pacing for the timer state machine
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimerConfig {
    #[serde(default = "defaults::setting_dwell_ms")]
    pub setting_dwell_ms: u64,

    #[serde(default = "defaults::finished_dwell_ms")]
    pub finished_dwell_ms: u64,

    #[serde(default = "defaults::alarm_interval_ms")]
    pub alarm_interval_ms: u64,

    #[serde(default = "defaults::ready_message_interval_ms")]
    pub ready_message_interval_ms: u64,

    #[serde(default = "defaults::setting_refresh_ms")]
    pub setting_refresh_ms: u64,

    #[serde(default = "defaults::minutes_per_finger")]
    pub minutes_per_finger: u32,

    /// Show the pending duration for `setting_dwell_ms` before starting
    #[serde(default)]
    pub stage_before_start: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CollectionConfig {
    #[serde(default = "defaults::samples_per_count")]
    pub samples_per_count: u32,

    #[serde(default = "defaults::collection_delay_ms")]
    pub delay_ms: u64,

    #[serde(default)]
    pub auto_mode: bool,
}

/// Default value providers using constants
mod defaults {
    use super::{DecisionSource, OperatingMode};
    use crate::config::constants::*;

    pub fn mode() -> OperatingMode { OperatingMode::Timer }
    pub fn loop_interval_ms() -> u64 { system::DEFAULT_LOOP_INTERVAL_MS }
    pub fn log_level() -> String { system::DEFAULT_LOG_LEVEL.to_string() }

    pub fn capture_timeout_ms() -> u64 { camera::DEFAULT_CAPTURE_TIMEOUT_MS }
    pub fn poll_interval_ms() -> u64 { camera::DEFAULT_POLL_INTERVAL_MS }
    pub fn capture_retries() -> u32 { camera::DEFAULT_CAPTURE_RETRIES }

    pub fn header_skip_bytes() -> usize { camera::HEADER_SKIP_BYTES }
    pub fn sample_stride() -> usize { camera::SAMPLE_STRIDE }
    pub fn scan_window() -> usize { camera::SAMPLE_SCAN_WINDOW }
    pub fn max_samples() -> usize { camera::MAX_SAMPLES }
    pub fn pixel_budget() -> usize { features::PIXEL_BUDGET }
    pub fn min_usable_pixels() -> usize { features::MIN_USABLE_PIXELS }
    pub fn feature_count() -> usize { features::DEFAULT_FEATURE_COUNT }

    pub fn decision_source() -> DecisionSource { DecisionSource::Heuristic }
    pub fn detection_interval_ms() -> u64 { detection::DEFAULT_DETECTION_INTERVAL_MS }
    pub fn confirmation_required() -> u32 { detection::CONFIRMATION_REQUIRED }
    pub fn smoothing_window() -> usize { detection::SMOOTHING_WINDOW }
    pub fn confidence_threshold() -> f32 { detection::DEFAULT_CONFIDENCE_THRESHOLD }

    pub fn setting_dwell_ms() -> u64 { timer::SETTING_DWELL_MS }
    pub fn finished_dwell_ms() -> u64 { timer::FINISHED_DWELL_MS }
    pub fn alarm_interval_ms() -> u64 { timer::ALARM_INTERVAL_MS }
    pub fn ready_message_interval_ms() -> u64 { timer::READY_MESSAGE_INTERVAL_MS }
    pub fn setting_refresh_ms() -> u64 { timer::SETTING_REFRESH_MS }
    pub fn minutes_per_finger() -> u32 { timer::DEFAULT_MINUTES_PER_FINGER }

    pub fn samples_per_count() -> u32 { collection::DEFAULT_SAMPLES_PER_COUNT }
    pub fn collection_delay_ms() -> u64 { collection::DEFAULT_DELAY_MS }
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            mode: defaults::mode(),
            loop_interval_ms: defaults::loop_interval_ms(),
            log_level: defaults::log_level(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            capture_timeout_ms: defaults::capture_timeout_ms(),
            poll_interval_ms: defaults::poll_interval_ms(),
            capture_retries: defaults::capture_retries(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            header_skip_bytes: defaults::header_skip_bytes(),
            sample_stride: defaults::sample_stride(),
            scan_window: defaults::scan_window(),
            max_samples: defaults::max_samples(),
            pixel_budget: defaults::pixel_budget(),
            min_usable_pixels: defaults::min_usable_pixels(),
            feature_count: defaults::feature_count(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            source: defaults::decision_source(),
            interval_ms: defaults::detection_interval_ms(),
            confirmation_required: defaults::confirmation_required(),
            smoothing_window: defaults::smoothing_window(),
            confidence_threshold: defaults::confidence_threshold(),
            model_path: None,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            setting_dwell_ms: defaults::setting_dwell_ms(),
            finished_dwell_ms: defaults::finished_dwell_ms(),
            alarm_interval_ms: defaults::alarm_interval_ms(),
            ready_message_interval_ms: defaults::ready_message_interval_ms(),
            setting_refresh_ms: defaults::setting_refresh_ms(),
            minutes_per_finger: defaults::minutes_per_finger(),
            stage_before_start: false,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            samples_per_count: defaults::samples_per_count(),
            delay_ms: defaults::collection_delay_ms(),
            auto_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_device_constants() {
        let config = SystemConfig::default();
        assert_eq!(config.system.mode, OperatingMode::Timer);
        assert_eq!(config.sampling.header_skip_bytes, 200);
        assert_eq!(config.sampling.feature_count, 20);
        assert_eq!(config.detection.source, DecisionSource::Heuristic);
        assert_eq!(config.detection.confirmation_required, 3);
        assert_eq!(config.detection.smoothing_window, 5);
        assert_eq!(config.timer.setting_dwell_ms, 2000);
        assert_eq!(config.timer.finished_dwell_ms, 10_000);
        assert!(!config.timer.stage_before_start);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
[detection]
source = "model"
confidence_threshold = 0.75
"#,
        )
        .unwrap();

        assert_eq!(config.detection.source, DecisionSource::Model);
        assert_eq!(config.detection.confidence_threshold, 0.75);
        assert_eq!(config.detection.interval_ms, 1000);
        assert_eq!(config.timer, TimerConfig::default());
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&OperatingMode::DataCollection).unwrap();
        assert_eq!(json, "\"data_collection\"");
        let back: OperatingMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OperatingMode::DataCollection);
    }
}
