// src/logic/state_machine.rs
//! Countdown timer states, dwell transitions and their display/buzzer effects

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::constants::audio::{TIMER_SET_PATTERN, TIMER_START_PATTERN};
use crate::config::constants::detection::{MAX_FINGERS, MIN_FINGERS};
use crate::config::constants::timer::{MILLIS_PER_MINUTE, MILLIS_PER_SECOND};
use crate::config::TimerConfig;
use crate::error::{ErrorBuilder, FingerTimerResult, ProcessingStage};
use crate::hal::{AudioSink, DisplayCommand, DisplaySink};
use crate::utils::time::TimeProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Idle, showing the ready banner; detection runs here
    Waiting,
    /// Named for completeness; routes straight back to `Waiting`
    Detecting,
    /// Count accepted, previewing the duration before the countdown starts
    Setting,
    Running,
    /// Countdown expired, alarm sounding until the dwell ends
    Finished,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerState::Waiting => "waiting",
            TimerState::Detecting => "detecting",
            TimerState::Setting => "setting",
            TimerState::Running => "running",
            TimerState::Finished => "finished",
        };
        f.write_str(name)
    }
}

pub(crate) fn ready_banner() -> DisplayCommand {
    DisplayCommand::message("Ready!", "Show fingers to set timer")
}

/// Timer state machine
///
/// All arithmetic is on the injected monotonic clock and uses saturating
/// subtraction, so a clock that appears to step backwards yields zero elapsed
/// time rather than a wrapped value.
pub struct TimerStateMachine {
    config: TimerConfig,
    clock: Arc<dyn TimeProvider>,

    state: TimerState,
    state_entered_at: u64,

    duration_ms: u64,
    timer_started_at: u64,

    detected_fingers: u8,
    confirmation_count: u32,

    last_ready_message: u64,
    last_setting_refresh: Option<u64>,
    last_alarm: u64,
}

impl TimerStateMachine {
    pub fn new(config: TimerConfig, clock: Arc<dyn TimeProvider>) -> Self {
        let now = clock.now_millis();
        Self {
            config,
            clock,
            state: TimerState::Waiting,
            state_entered_at: now,
            duration_ms: 0,
            timer_started_at: now,
            detected_fingers: 0,
            confirmation_count: 0,
            last_ready_message: now,
            last_setting_refresh: None,
            last_alarm: now,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Enter `state` and restart its dwell clock
    ///
    /// Re-entering the current state only restarts the dwell clock; the timer
    /// duration and start time are never touched here.
    pub fn set_state(&mut self, state: TimerState) {
        if state != self.state {
            info!(from = %self.state, to = %state, "timer state change");
        }
        self.state = state;
        self.state_entered_at = self.clock.now_millis();
    }

    pub fn set_timer(&mut self, minutes: u32, seconds: u32) {
        self.duration_ms = minutes as u64 * MILLIS_PER_MINUTE + seconds as u64 * MILLIS_PER_SECOND;
        debug!(minutes, seconds, duration_ms = self.duration_ms, "timer duration set");
    }

    /// Act on a confirmed finger count
    ///
    /// Sets `fingers × minutes_per_finger` minutes, announces it and either
    /// starts the countdown or, with `stage_before_start`, previews it in
    /// `Setting` first.
    pub fn start_timer(
        &mut self,
        fingers: u8,
        display: &mut dyn DisplaySink,
        audio: &mut dyn AudioSink,
    ) -> FingerTimerResult<()> {
        if !(MIN_FINGERS..=MAX_FINGERS).contains(&fingers) {
            return Err(ErrorBuilder::new("timer", "start_timer").processing(
                ProcessingStage::StateMachine,
                &format!("finger count {} is outside {}..={}", fingers, MIN_FINGERS, MAX_FINGERS),
            ));
        }

        let minutes = fingers as u32 * self.config.minutes_per_finger;
        self.detected_fingers = fingers;
        self.set_timer(minutes, 0);

        display.show(DisplayCommand::message("Timer Set!", format!("{} minutes", minutes)));
        let (count, duration, interval) = TIMER_SET_PATTERN;
        audio.beep_pattern(count, duration, interval);

        if self.config.stage_before_start {
            self.last_setting_refresh = None;
            self.set_state(TimerState::Setting);
        } else {
            self.begin_countdown(audio);
        }
        Ok(())
    }

    fn begin_countdown(&mut self, audio: &mut dyn AudioSink) {
        self.set_state(TimerState::Running);
        self.timer_started_at = self.clock.now_millis();
        info!(duration_ms = self.duration_ms, "countdown started");
        let (count, duration, interval) = TIMER_START_PATTERN;
        audio.beep_pattern(count, duration, interval);
    }

    /// Track the latest raw count and how many cycles in a row it repeated
    pub fn record_detection(&mut self, count: u8) {
        if count == self.detected_fingers {
            self.confirmation_count += 1;
        } else {
            self.detected_fingers = count;
            self.confirmation_count = 1;
        }
    }

    pub fn detected_fingers(&self) -> u8 {
        self.detected_fingers
    }

    pub fn confirmation_count(&self) -> u32 {
        self.confirmation_count
    }

    /// Run dwell transitions and periodic output for the current state
    pub fn update(&mut self, display: &mut dyn DisplaySink, audio: &mut dyn AudioSink) {
        let now = self.clock.now_millis();

        match self.state {
            TimerState::Waiting => {
                if now.saturating_sub(self.last_ready_message) >= self.config.ready_message_interval_ms {
                    display.show(ready_banner());
                    self.last_ready_message = now;
                }
            }
            TimerState::Detecting => self.set_state(TimerState::Waiting),
            TimerState::Setting => {
                let refresh_due = self
                    .last_setting_refresh
                    .map_or(true, |last| now.saturating_sub(last) >= self.config.setting_refresh_ms);
                if refresh_due {
                    display.show(DisplayCommand::TimerPreview {
                        minutes: self.detected_fingers as u32 * self.config.minutes_per_finger,
                        seconds: 0,
                    });
                    self.last_setting_refresh = Some(now);
                }
                if self.time_in_state_ms() >= self.config.setting_dwell_ms {
                    self.begin_countdown(audio);
                }
            }
            TimerState::Running => {
                display.show(DisplayCommand::Countdown {
                    total_secs: self.duration_ms / MILLIS_PER_SECOND,
                    remaining_secs: self.remaining_time_secs(),
                });
                if self.is_timer_expired() {
                    self.set_state(TimerState::Finished);
                    info!(duration_ms = self.duration_ms, "timer finished");
                    audio.alarm_pattern();
                    self.last_alarm = now;
                }
            }
            TimerState::Finished => {
                display.show(DisplayCommand::Finished);
                if self.time_in_state_ms() >= self.config.finished_dwell_ms {
                    self.set_state(TimerState::Waiting);
                    display.show(ready_banner());
                    self.last_ready_message = now;
                } else if now.saturating_sub(self.last_alarm) >= self.config.alarm_interval_ms {
                    audio.alarm_pattern();
                    self.last_alarm = now;
                }
            }
        }
    }

    fn elapsed_running_ms(&self) -> u64 {
        self.clock.elapsed_since(self.timer_started_at)
    }

    /// Whole seconds left; `0` outside `Running` or once expired
    pub fn remaining_time_secs(&self) -> u64 {
        if self.state != TimerState::Running {
            return 0;
        }
        self.duration_ms.saturating_sub(self.elapsed_running_ms()) / MILLIS_PER_SECOND
    }

    pub fn is_timer_expired(&self) -> bool {
        self.state == TimerState::Running && self.elapsed_running_ms() >= self.duration_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn time_in_state_ms(&self) -> u64 {
        self.clock.elapsed_since(self.state_entered_at)
    }
}

impl fmt::Debug for TimerStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerStateMachine")
            .field("state", &self.state)
            .field("duration_ms", &self.duration_ms)
            .field("time_in_state_ms", &self.time_in_state_ms())
            .field("detected_fingers", &self.detected_fingers)
            .finish()
    }
}
