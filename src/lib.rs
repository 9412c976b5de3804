//! Finger-Timer: camera-driven finger counting core for a gesture-set countdown timer
//!
//! A hand held in front of the camera shows one to five fingers; once the
//! count is stable the device starts a countdown of that many minutes and
//! sounds an alarm when it expires. The crate provides:
//!
//! - Hardware abstraction for the capture bus, inference runtime, display and buzzer
//! - Defensive frame sampling that tolerates corrupted FIFO lengths
//! - Two decision sources: a sample-statistics heuristic and a feature model
//! - Temporal confirmation (consecutive match or majority vote)
//! - The timer state machine and a single-owner device context
//! - Labelled training-data collection
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use finger_timer::config::SystemConfig;
//! use finger_timer::hal::simulator::{SimulatorConfig, SyntheticCamera};
//! use finger_timer::hal::{LogAudio, LogDisplay};
//! use finger_timer::logic::DeviceContext;
//! use finger_timer::utils::MonotonicTimeProvider;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut camera = SyntheticCamera::new(SimulatorConfig::default());
//!     camera.set_finger_count(3);
//!
//!     let mut device = DeviceContext::from_config(
//!         SystemConfig::default(),
//!         Box::new(camera),
//!         Box::new(LogDisplay),
//!         Box::new(LogAudio),
//!         Arc::new(MonotonicTimeProvider::new()),
//!     )?;
//!     device.startup();
//!
//!     loop {
//!         device.tick();
//!         std::thread::sleep(std::time::Duration::from_millis(100));
//!     }
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod collection;
pub mod config;
pub mod error;
pub mod hal;
pub mod logic;
pub mod ml;
pub mod processing;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{FingerTimerError, FingerTimerResult};

pub use hal::{AudioSink, DisplayCommand, DisplaySink, Frame, FrameSource, HalError, InferenceService};

pub use logic::{DeviceContext, TimerState, TimerStateMachine};

pub use processing::{DetectionPipeline, FeatureVector};

pub use utils::time::TimeProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Camera-driven finger counting core for a gesture-set countdown timer".to_string(),
        features: enabled_features(),
    }
}

fn enabled_features() -> Vec<String> {
    let mut features = vec!["heuristic detection".to_string(), "linear model inference".to_string()];
    if cfg!(feature = "embedded") {
        features.push("ArduCAM SPI capture".to_string());
    }
    if cfg!(feature = "onnx") {
        features.push("ONNX Runtime inference".to_string());
    }
    features
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Capabilities compiled into this build
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(info.features.len() >= 2);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "finger-timer");
    }
}
