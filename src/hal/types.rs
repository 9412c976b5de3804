// src/hal/types.rs
//! Core types exchanged with device collaborators

use serde::{Deserialize, Serialize};

/// One captured camera frame
///
/// `declared_length` is whatever the capture hardware reported. It is not
/// trusted: PSRAM-backed boards regularly report `0` or values far beyond the
/// FIFO size. Consumers must route it through
/// [`sanitize_frame_length`](crate::acquisition::sanitize_frame_length).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub declared_length: u32,
}

impl Frame {
    pub fn new(bytes: Vec<u8>, declared_length: u32) -> Self {
        Self { bytes, declared_length }
    }

    /// Frame whose declared length matches its byte count
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let declared_length = bytes.len().min(u32::MAX as usize) as u32;
        Self { bytes, declared_length }
    }

    pub fn declared_length(&self) -> u32 {
        self.declared_length
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What the display is asked to render
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    /// Two-line text message
    Message { title: String, body: String },
    /// Live (unconfirmed) finger count
    FingerCount(u8),
    /// Timer about to start
    TimerPreview { minutes: u32, seconds: u32 },
    /// Running countdown
    Countdown { total_secs: u64, remaining_secs: u64 },
    /// Timer expired
    Finished,
    /// Classifier status line
    ModelStatus { status: String, confidence: f32 },
}

impl DisplayCommand {
    pub fn message(title: impl Into<String>, body: impl Into<String>) -> Self {
        DisplayCommand::Message {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// What the buzzer was asked to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEvent {
    Beep { duration_ms: u32 },
    Pattern { count: u32, duration_ms: u32, interval_ms: u32 },
    Alarm,
}
