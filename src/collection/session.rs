// src/collection/session.rs
//! Labelled training-sample collection state

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::constants::collection::{CSV_PRECISION, MAX_LABEL};
use crate::config::CollectionConfig;
use crate::error::{ErrorBuilder, FingerTimerResult};
use crate::processing::features::FeatureVector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Label written with every row
    pub fingers: u8,
    pub samples_per_count: u32,
    /// Advance through every label on a fixed delay instead of on request
    pub auto_mode: bool,
    pub delay_ms: u64,
}

impl CollectionSettings {
    pub fn from_config(config: &CollectionConfig) -> Self {
        Self {
            fingers: 0,
            samples_per_count: config.samples_per_count,
            auto_mode: config.auto_mode,
            delay_ms: config.delay_ms,
        }
    }
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self::from_config(&CollectionConfig::default())
    }
}

/// Partial settings change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub fingers: Option<u8>,
    pub samples_per_count: Option<u32>,
    pub auto_mode: Option<bool>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatus {
    pub is_collecting: bool,
    pub current_fingers: u8,
    pub current_sample: u32,
    pub total_samples: u32,
    pub samples_per_count: u32,
    pub auto_mode: bool,
    pub delay_ms: u64,
}

impl CollectionStatus {
    pub fn to_json(&self) -> FingerTimerResult<String> {
        serde_json::to_string(self)
            .map_err(|e| ErrorBuilder::new("collection", "status_json").invalid_data("status", &e.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionSession {
    settings: CollectionSettings,
    collecting: bool,
    trigger_pending: bool,
    current_sample: u32,
    total_samples: u32,
    last_collection_at: Option<u64>,
    data: String,
}

impl CollectionSession {
    pub fn new(settings: CollectionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn current_fingers(&self) -> u8 {
        self.settings.fingers
    }

    pub fn total_samples(&self) -> u32 {
        self.total_samples
    }

    /// Begin a fresh session; previous rows are discarded
    pub fn start(&mut self) {
        self.collecting = true;
        self.trigger_pending = true;
        self.current_sample = 0;
        self.total_samples = 0;
        self.last_collection_at = None;
        self.data.clear();
        info!(fingers = self.settings.fingers, auto = self.settings.auto_mode, "collection started");
    }

    pub fn stop(&mut self) {
        self.collecting = false;
        self.trigger_pending = false;
        info!(total = self.total_samples, "collection stopped");
    }

    /// Request one sample in manual mode
    pub fn trigger(&mut self) {
        self.trigger_pending = true;
    }

    pub fn apply(&mut self, update: SettingsUpdate) -> FingerTimerResult<()> {
        if let Some(fingers) = update.fingers {
            if fingers > MAX_LABEL {
                return Err(ErrorBuilder::new("collection", "apply")
                    .invalid_data("fingers", &format!("{} is above {}", fingers, MAX_LABEL)));
            }
        }
        if update.samples_per_count == Some(0) {
            return Err(ErrorBuilder::new("collection", "apply").invalid_data("samples_per_count", "must be at least 1"));
        }

        if let Some(fingers) = update.fingers {
            self.settings.fingers = fingers;
        }
        if let Some(samples) = update.samples_per_count {
            self.settings.samples_per_count = samples;
        }
        if let Some(auto_mode) = update.auto_mode {
            self.settings.auto_mode = auto_mode;
        }
        if let Some(delay_ms) = update.delay_ms {
            self.settings.delay_ms = delay_ms;
        }
        info!(settings = ?self.settings, "collection settings updated");
        Ok(())
    }

    /// Whether the control loop should take a sample at `now`
    pub fn should_trigger(&self, now: u64) -> bool {
        if !self.collecting {
            return false;
        }
        if self.settings.auto_mode {
            self.last_collection_at
                .map_or(true, |last| now.saturating_sub(last) > self.settings.delay_ms)
        } else {
            self.trigger_pending
        }
    }

    /// Append `label,f0,...,fN` with two-decimal features
    pub fn add_row(&mut self, label: u8, features: &FeatureVector) {
        let _ = write!(self.data, "{}", label);
        for value in features.as_slice() {
            let _ = write!(self.data, ",{:.*}", CSV_PRECISION, value);
        }
        self.data.push('\n');
        self.total_samples += 1;
    }

    /// Book-keeping after a row was added
    ///
    /// In auto mode the label advances after `samples_per_count` samples and
    /// the session stops once every label up to five has been collected.
    pub fn on_sample_collected(&mut self, now: u64) {
        self.trigger_pending = false;
        self.last_collection_at = Some(now);
        self.current_sample += 1;

        if self.settings.auto_mode && self.current_sample >= self.settings.samples_per_count {
            self.current_sample = 0;
            if self.settings.fingers >= MAX_LABEL {
                self.collecting = false;
                info!(total = self.total_samples, "auto collection finished for every label");
            } else {
                self.settings.fingers += 1;
                info!(fingers = self.settings.fingers, "auto collection advanced");
            }
        }
    }

    /// Collected CSV rows, one per line
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn clear_data(&mut self) {
        self.data.clear();
        self.total_samples = 0;
    }

    pub fn status(&self) -> CollectionStatus {
        CollectionStatus {
            is_collecting: self.collecting,
            current_fingers: self.settings.fingers,
            current_sample: self.current_sample,
            total_samples: self.total_samples,
            samples_per_count: self.settings.samples_per_count,
            auto_mode: self.settings.auto_mode,
            delay_ms: self.settings.delay_ms,
        }
    }
}
