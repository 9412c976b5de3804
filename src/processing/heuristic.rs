// src/processing/heuristic.rs
//! Sample-statistics finger count heuristic

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::constants::heuristic::*;

/// Brightness and edge statistics of one sample run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    pub sample_count: usize,
    /// Integer mean, truncated toward zero
    pub avg_brightness: u8,
    pub dark_ratio: f32,
    pub bright_ratio: f32,
    /// Adjacent pairs differing by more than the transition delta, over the sample count
    pub transition_ratio: f32,
}

impl ImageStats {
    pub fn from_samples(samples: &[u8]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                sample_count: 0,
                avg_brightness: 0,
                dark_ratio: 0.0,
                bright_ratio: 0.0,
                transition_ratio: 0.0,
            };
        }

        let sum: u32 = samples.iter().map(|&s| s as u32).sum();
        let dark = samples.iter().filter(|&&s| s < DARK_LEVEL).count();
        let bright = samples.iter().filter(|&&s| s > BRIGHT_LEVEL).count();
        let transitions = samples
            .windows(2)
            .filter(|pair| pair[0].abs_diff(pair[1]) > TRANSITION_DELTA)
            .count();
        let mean = sum / n as u32;

        Self {
            sample_count: n,
            avg_brightness: u8::try_from(mean).unwrap_or(u8::MAX),
            dark_ratio: dark as f32 / n as f32,
            bright_ratio: bright as f32 / n as f32,
            transition_ratio: transitions as f32 / n as f32,
        }
    }
}

/// Why the heuristic produced its count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Detected,
    /// Fewer samples than the classifier can judge
    TooFewSamples,
    /// No edges: nothing in front of the lens
    TooUniform,
    /// Too dark or too bright to be a hand
    ImplausibleBrightness,
    /// Some variation, but below every decision row
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicOutcome {
    /// `0` unless `verdict` is `Detected`
    pub count: u8,
    pub verdict: Verdict,
    /// `None` when there were too few samples to compute statistics
    pub stats: Option<ImageStats>,
}

impl HeuristicOutcome {
    pub fn is_detected(&self) -> bool {
        self.verdict == Verdict::Detected
    }
}

/// Stateless finger count classifier over a brightness sample run
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, samples: &[u8]) -> HeuristicOutcome {
        if samples.len() < MIN_SAMPLES {
            return HeuristicOutcome {
                count: 0,
                verdict: Verdict::TooFewSamples,
                stats: None,
            };
        }

        let stats = ImageStats::from_samples(samples);
        let (count, verdict) = decide(&stats);

        debug!(
            samples = stats.sample_count,
            avg = stats.avg_brightness,
            dark = stats.dark_ratio,
            bright = stats.bright_ratio,
            transitions = stats.transition_ratio,
            count,
            ?verdict,
            "heuristic classification"
        );

        HeuristicOutcome {
            count,
            verdict,
            stats: Some(stats),
        }
    }
}

fn decide(stats: &ImageStats) -> (u8, Verdict) {
    let t = stats.transition_ratio;

    if t < MIN_TRANSITION_RATIO {
        return (0, Verdict::TooUniform);
    }
    if stats.avg_brightness < MIN_HAND_BRIGHTNESS || stats.avg_brightness > MAX_HAND_BRIGHTNESS {
        return (0, Verdict::ImplausibleBrightness);
    }

    let count = if t > HIGH_COMPLEXITY_TRANSITIONS
        && stats.dark_ratio > HIGH_COMPLEXITY_TONE_RATIO
        && stats.bright_ratio > HIGH_COMPLEXITY_TONE_RATIO
    {
        if t > FIVE_FINGER_TRANSITIONS {
            5
        } else if t > FOUR_FINGER_TRANSITIONS {
            4
        } else if t > THREE_FINGER_TRANSITIONS {
            3
        } else {
            2
        }
    } else if t > MEDIUM_COMPLEXITY_TRANSITIONS
        && (stats.dark_ratio > MEDIUM_COMPLEXITY_TONE_RATIO || stats.bright_ratio > MEDIUM_COMPLEXITY_TONE_RATIO)
    {
        if t > MEDIUM_TWO_FINGER_TRANSITIONS { 2 } else { 1 }
    } else if t > LOW_COMPLEXITY_TRANSITIONS {
        1
    } else {
        0
    };

    if count == 0 {
        (0, Verdict::NoMatch)
    } else {
        (count, Verdict::Detected)
    }
}
