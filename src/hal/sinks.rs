// src/hal/sinks.rs
//! Display and buzzer sinks that record or log instead of driving hardware

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::hal::{AudioEvent, AudioSink, DisplayCommand, DisplaySink};

/// Display that keeps every command it was asked to show
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    commands: Arc<Mutex<Vec<DisplayCommand>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything shown so far
    pub fn commands(&self) -> Vec<DisplayCommand> {
        self.commands.lock().clone()
    }

    pub fn last(&self) -> Option<DisplayCommand> {
        self.commands.lock().last().cloned()
    }

    /// Number of `Message` commands with the given title
    pub fn count_titled(&self, title: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|cmd| matches!(cmd, DisplayCommand::Message { title: t, .. } if t == title))
            .count()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl DisplaySink for RecordingDisplay {
    fn show(&mut self, command: DisplayCommand) {
        self.commands.lock().push(command);
    }
}

/// Buzzer that records events instead of blocking
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    events: Arc<Mutex<Vec<AudioEvent>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        self.events.lock().clone()
    }

    pub fn alarm_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, AudioEvent::Alarm))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AudioSink for RecordingAudio {
    fn beep(&mut self, duration_ms: u32) {
        self.events.lock().push(AudioEvent::Beep { duration_ms });
    }

    fn beep_pattern(&mut self, count: u32, duration_ms: u32, interval_ms: u32) {
        self.events.lock().push(AudioEvent::Pattern {
            count,
            duration_ms,
            interval_ms,
        });
    }

    fn alarm_pattern(&mut self) {
        self.events.lock().push(AudioEvent::Alarm);
    }
}

/// Display that writes commands to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, command: DisplayCommand) {
        match command {
            DisplayCommand::Message { title, body } => info!(target: "display", %title, %body, "message"),
            DisplayCommand::FingerCount(fingers) => info!(target: "display", fingers, "finger count"),
            DisplayCommand::TimerPreview { minutes, seconds } => {
                info!(target: "display", minutes, seconds, "timer preview")
            }
            DisplayCommand::Countdown { total_secs, remaining_secs } => {
                info!(target: "display", remaining = %format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60), total_secs, "countdown")
            }
            DisplayCommand::Finished => info!(target: "display", "TIME'S UP!"),
            DisplayCommand::ModelStatus { status, confidence } => {
                info!(target: "display", %status, confidence, "model status")
            }
        }
    }
}

/// Buzzer that writes tones to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn beep(&mut self, duration_ms: u32) {
        info!(target: "buzzer", duration_ms, "beep");
    }

    fn beep_pattern(&mut self, count: u32, duration_ms: u32, interval_ms: u32) {
        info!(target: "buzzer", count, duration_ms, interval_ms, "beep pattern");
    }

    fn alarm_pattern(&mut self) {
        info!(target: "buzzer", "alarm");
    }
}
