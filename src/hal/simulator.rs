// src/hal/simulator.rs
//! Simulated camera and inference collaborators
//!
//! `SyntheticCamera` renders frames whose byte statistics the heuristic
//! classifier maps back to a chosen finger count. The scripted sources replay
//! fixed sequences, failures included, for deterministic tests.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::constants::{camera, detection};
use crate::hal::camera::{CaptureBus, CaptureError};
use crate::hal::{Frame, FrameSource, HalError, InferenceService};
use crate::processing::features::FeatureVector;

const DARK_LEVEL: u8 = 40;
const BRIGHT_LEVEL: u8 = 210;
const BACKGROUND_LEVEL: u8 = 120;

/// Synthetic camera configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    pub seed: u64,
    pub frame_length: usize,
    /// Maximum per-byte deviation from the rendered level
    pub noise_amplitude: u8,
    /// Chance that a frame reports a garbage FIFO length
    pub corrupt_length_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            frame_length: 6000,
            noise_amplitude: 8,
            corrupt_length_probability: 0.0,
        }
    }
}

/// Camera that renders a hand showing a configurable number of fingers
pub struct SyntheticCamera {
    config: SimulatorConfig,
    rng: StdRng,
    finger_count: u8,
    script: VecDeque<u8>,
    frames_rendered: u64,
}

impl SyntheticCamera {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            finger_count: 0,
            script: VecDeque::new(),
            frames_rendered: 0,
        }
    }

    /// Finger counts to show on successive frames; the last one persists
    pub fn with_script(mut self, counts: impl IntoIterator<Item = u8>) -> Self {
        self.script = counts.into_iter().collect();
        self
    }

    pub fn set_finger_count(&mut self, fingers: u8) {
        self.finger_count = fingers.min(detection::MAX_FINGERS);
        self.script.clear();
    }

    pub fn finger_count(&self) -> u8 {
        self.finger_count
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render the next frame
    pub fn render(&mut self) -> Frame {
        if let Some(next) = self.script.pop_front() {
            self.finger_count = next.min(detection::MAX_FINGERS);
        }

        let len = self.config.frame_length.max(camera::HEADER_SKIP_BYTES + 1);
        let mut bytes = vec![0u8; len];
        let noise = self.config.noise_amplitude;

        // Header bytes are irrelevant to both sampling paths
        for byte in bytes.iter_mut().take(camera::HEADER_SKIP_BYTES) {
            *byte = self.rng.gen();
        }

        let body = &mut bytes[camera::HEADER_SKIP_BYTES..];
        let ratio = transition_ratio(self.finger_count);
        let mut bright = false;

        for (block, chunk) in body.chunks_mut(camera::SAMPLE_STRIDE).enumerate() {
            if block > 0 && toggles(block - 1, ratio) {
                bright = !bright;
            }

            for byte in chunk.iter_mut() {
                let jitter = if noise == 0 { 0 } else { self.rng.gen_range(0..=noise) };
                *byte = match (ratio, bright) {
                    (None, _) => BACKGROUND_LEVEL.saturating_add(jitter / 2),
                    (Some(_), false) => DARK_LEVEL.saturating_add(jitter),
                    (Some(_), true) => BRIGHT_LEVEL.saturating_sub(jitter),
                };
            }
        }

        let declared = if self.config.corrupt_length_probability > 0.0
            && self.rng.gen_bool(self.config.corrupt_length_probability.min(1.0))
        {
            if self.rng.gen_bool(0.5) { 0 } else { camera::MAX_FIFO_SIZE + 1 }
        } else {
            len as u32
        };

        self.frames_rendered += 1;
        trace!(fingers = self.finger_count, declared, "synthetic frame rendered");
        Frame::new(bytes, declared)
    }
}

/// Target edge rate per sample for `fingers`; floor(99 * ratio) edges over a 100-sample run
fn transition_ratio(fingers: u8) -> Option<f64> {
    match fingers {
        0 => None,
        1 => Some(0.25),
        2 => Some(0.35),
        3 => Some(0.475),
        4 => Some(0.55),
        _ => Some(0.8),
    }
}

/// Bresenham-style spacing: exactly floor(n * ratio) toggles in the first n pairs
fn toggles(pair: usize, ratio: Option<f64>) -> bool {
    match ratio {
        Some(r) => ((pair + 1) as f64 * r).floor() > (pair as f64 * r).floor(),
        None => false,
    }
}

impl FrameSource for SyntheticCamera {
    fn capture(&mut self) -> Result<Frame, HalError> {
        Ok(self.render())
    }
}

/// [`CaptureBus`] backed by a [`SyntheticCamera`]
///
/// The done flag rises after `latency_polls` polls, so a [`PolledCamera`]
/// exercises its full wait path against it.
///
/// [`PolledCamera`]: crate::hal::PolledCamera
pub struct SimulatedBus {
    camera: SyntheticCamera,
    latency_polls: u32,
    polls: u32,
    pending: Option<Frame>,
}

impl SimulatedBus {
    pub fn new(camera: SyntheticCamera, latency_polls: u32) -> Self {
        Self {
            camera,
            latency_polls,
            polls: 0,
            pending: None,
        }
    }

    pub fn camera_mut(&mut self) -> &mut SyntheticCamera {
        &mut self.camera
    }
}

impl CaptureBus for SimulatedBus {
    fn begin_capture(&mut self) -> Result<(), CaptureError> {
        self.polls = 0;
        self.pending = Some(self.camera.render());
        Ok(())
    }

    fn capture_done(&mut self) -> Result<bool, CaptureError> {
        self.polls += 1;
        Ok(self.pending.is_some() && self.polls > self.latency_polls)
    }

    fn fifo_length(&mut self) -> Result<u32, CaptureError> {
        self.pending
            .as_ref()
            .map(Frame::declared_length)
            .ok_or_else(|| CaptureError::Transfer("no capture pending".to_string()))
    }

    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), CaptureError> {
        let frame = self
            .pending
            .take()
            .ok_or_else(|| CaptureError::Transfer("no capture pending".to_string()))?;

        // Reads past the captured bytes return the FIFO's idle pattern
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = frame.bytes.get(i).copied().unwrap_or(0);
        }
        Ok(())
    }
}

/// Replays a fixed sequence of capture results
#[derive(Debug, Default)]
pub struct ScriptedFrameSource {
    script: VecDeque<Result<Frame, HalError>>,
    captures: usize,
}

impl ScriptedFrameSource {
    pub fn new(script: impl IntoIterator<Item = Result<Frame, HalError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            captures: 0,
        }
    }

    pub fn push(&mut self, result: Result<Frame, HalError>) {
        self.script.push_back(result);
    }

    pub fn captures(&self) -> usize {
        self.captures
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl FrameSource for ScriptedFrameSource {
    fn capture(&mut self) -> Result<Frame, HalError> {
        self.captures += 1;
        self.script.pop_front().unwrap_or(Err(HalError::SourceExhausted))
    }
}

/// Replays fixed score vectors and records every feature vector it receives
#[derive(Debug)]
pub struct ScriptedInference {
    label_count: usize,
    script: VecDeque<Result<Vec<f32>, HalError>>,
    received: Vec<FeatureVector>,
}

impl ScriptedInference {
    pub fn new(label_count: usize, script: impl IntoIterator<Item = Result<Vec<f32>, HalError>>) -> Self {
        Self {
            label_count,
            script: script.into_iter().collect(),
            received: Vec::new(),
        }
    }

    /// Scores putting `confidence` on `label` and spreading the rest evenly
    pub fn scores_for(label_count: usize, label: usize, confidence: f32) -> Vec<f32> {
        let rest = if label_count > 1 {
            (1.0 - confidence) / (label_count - 1) as f32
        } else {
            0.0
        };
        (0..label_count)
            .map(|i| if i == label { confidence } else { rest })
            .collect()
    }

    pub fn push(&mut self, result: Result<Vec<f32>, HalError>) {
        self.script.push_back(result);
    }

    pub fn received(&self) -> &[FeatureVector] {
        &self.received
    }
}

impl InferenceService for ScriptedInference {
    fn label_count(&self) -> usize {
        self.label_count
    }

    fn classify(&mut self, features: &FeatureVector) -> Result<Vec<f32>, HalError> {
        self.received.push(features.clone());
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(HalError::InferenceFailed("script exhausted".to_string())))
    }
}
