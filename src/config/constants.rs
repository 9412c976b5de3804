// src/config/constants.rs
//! System-wide configuration constants

/// Frame capture and sampling constants
pub mod camera {
    /// Upper bound of the capture FIFO, in bytes
    pub const MAX_FIFO_SIZE: u32 = 0x5FFFF;
    /// Any declared length above this is treated as a hardware misreport
    pub const MAX_PLAUSIBLE_FRAME_LENGTH: u32 = 100_000;
    /// Substitute length for a 160x120 JPEG when the declared one is unusable
    pub const FALLBACK_FRAME_LENGTH: usize = 8192;
    /// Largest number of frame bytes the core will ever read
    pub const MAX_FRAME_BYTES: usize = MAX_PLAUSIBLE_FRAME_LENGTH as usize;

    /// JPEG header region skipped before sampling
    pub const HEADER_SKIP_BYTES: usize = 200;
    pub const SAMPLE_STRIDE: usize = 30;
    /// Body bytes scanned by the heuristic sampler
    pub const SAMPLE_SCAN_WINDOW: usize = 3000;
    pub const MAX_SAMPLES: usize = 100;

    pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 500;
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;
    pub const DEFAULT_CAPTURE_RETRIES: u32 = 1;
    pub const MAX_CAPTURE_RETRIES: u32 = 10;
}

/// Heuristic classifier thresholds
pub mod heuristic {
    pub const MIN_SAMPLES: usize = 10;
    pub const DARK_LEVEL: u8 = 80;
    pub const BRIGHT_LEVEL: u8 = 180;
    pub const TRANSITION_DELTA: u8 = 40;

    pub const MIN_TRANSITION_RATIO: f32 = 0.1;
    pub const MIN_HAND_BRIGHTNESS: u8 = 30;
    pub const MAX_HAND_BRIGHTNESS: u8 = 220;

    pub const HIGH_COMPLEXITY_TRANSITIONS: f32 = 0.4;
    pub const HIGH_COMPLEXITY_TONE_RATIO: f32 = 0.2;
    pub const FIVE_FINGER_TRANSITIONS: f32 = 0.6;
    pub const FOUR_FINGER_TRANSITIONS: f32 = 0.5;
    pub const THREE_FINGER_TRANSITIONS: f32 = 0.45;

    pub const MEDIUM_COMPLEXITY_TRANSITIONS: f32 = 0.2;
    pub const MEDIUM_COMPLEXITY_TONE_RATIO: f32 = 0.15;
    pub const MEDIUM_TWO_FINGER_TRANSITIONS: f32 = 0.3;

    pub const LOW_COMPLEXITY_TRANSITIONS: f32 = 0.15;
}

/// Feature extraction constants
pub mod features {
    pub const DEFAULT_FEATURE_COUNT: usize = 20;
    pub const PIXEL_BUDGET: usize = 400;
    pub const MIN_USABLE_PIXELS: usize = 100;
    pub const EDGE_DELTA: u8 = 30;
    pub const NEUTRAL_VALUE: f32 = 128.0;
    pub const FEATURE_MIN: f32 = 0.0;
    pub const FEATURE_MAX: f32 = 255.0;
}

/// Classification and confirmation constants
pub mod detection {
    pub const LABEL_COUNT: usize = 6;
    pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
    pub const SMOOTHING_WINDOW: usize = 5;
    /// Samples required before the majority vote replaces the latest decision
    pub const MIN_VOTING_SAMPLES: usize = 3;
    pub const CONFIRMATION_REQUIRED: u32 = 3;
    pub const MIN_FINGERS: u8 = 1;
    pub const MAX_FINGERS: u8 = 5;
    pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 1000;
}

/// Timer state machine constants
pub mod timer {
    pub const MILLIS_PER_MINUTE: u64 = 60_000;
    pub const MILLIS_PER_SECOND: u64 = 1_000;
    pub const SETTING_DWELL_MS: u64 = 2000;
    pub const FINISHED_DWELL_MS: u64 = 10_000;
    pub const ALARM_INTERVAL_MS: u64 = 2000;
    pub const READY_MESSAGE_INTERVAL_MS: u64 = 5000;
    pub const SETTING_REFRESH_MS: u64 = 500;
    pub const DEFAULT_MINUTES_PER_FINGER: u32 = 1;
    pub const MAX_MINUTES_PER_FINGER: u32 = 10;
}

/// Buzzer patterns, as (count, duration_ms, interval_ms)
pub mod audio {
    pub const READY_BEEP_MS: u32 = 200;
    pub const SETUP_FAILED_PATTERN: (u32, u32, u32) = (3, 200, 100);
    pub const TIMER_SET_PATTERN: (u32, u32, u32) = (2, 150, 100);
    pub const TIMER_START_PATTERN: (u32, u32, u32) = (2, 100, 100);
    pub const COLLECT_BEEP_MS: u32 = 100;
    pub const COLLECT_OK_PATTERN: (u32, u32, u32) = (2, 50, 50);
    pub const COLLECT_FAILED_PATTERN: (u32, u32, u32) = (3, 100, 100);
}

/// Data collection constants
pub mod collection {
    pub const DEFAULT_SAMPLES_PER_COUNT: u32 = 20;
    pub const DEFAULT_DELAY_MS: u64 = 3000;
    pub const MAX_LABEL: u8 = 5;
    pub const CSV_PRECISION: usize = 2;
    pub const COMMAND_QUEUE_SIZE: usize = 64;
}

/// Control loop constants
pub mod system {
    pub const DEFAULT_LOOP_INTERVAL_MS: u64 = 100;
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

/// Configuration file paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/finger-timer/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/finger-timer";
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    pub const LOCAL_CONFIG_FILE: &str = "finger-timer.toml";
    pub const ENV_PREFIX: &str = "FTIMER_";
    /// Separates section and field in environment override names
    pub const ENV_SEPARATOR: &str = "__";
}
