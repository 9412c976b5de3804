// tests/timer_scenarios.rs
//! Timer behaviour driven by confirmed finger counts and a mock clock

use std::sync::Arc;

use finger_timer::config::TimerConfig;
use finger_timer::hal::{AudioEvent, RecordingAudio, RecordingDisplay};
use finger_timer::logic::{TimerState, TimerStateMachine};
use finger_timer::processing::{ConfirmationFilter, ConsecutiveMatchFilter};
use finger_timer::utils::MockTimeProvider;
use proptest::prelude::*;

struct Device {
    clock: Arc<MockTimeProvider>,
    filter: ConsecutiveMatchFilter,
    timer: TimerStateMachine,
    display: RecordingDisplay,
    audio: RecordingAudio,
}

impl Device {
    fn new() -> Self {
        let clock = Arc::new(MockTimeProvider::new(1_000));
        Self {
            timer: TimerStateMachine::new(TimerConfig::default(), clock.clone()),
            clock,
            filter: ConsecutiveMatchFilter::new(3),
            display: RecordingDisplay::new(),
            audio: RecordingAudio::new(),
        }
    }

    /// One loop iteration with a raw decision, as the controller runs it
    fn cycle(&mut self, raw: u8) {
        if self.timer.state() == TimerState::Waiting {
            if let Some(fingers) = self.filter.observe(raw) {
                self.timer
                    .start_timer(fingers, &mut self.display, &mut self.audio)
                    .unwrap();
            }
        }
        self.timer.update(&mut self.display, &mut self.audio);
    }

    fn idle(&mut self, millis: u64) {
        self.clock.advance_by(millis);
        self.timer.update(&mut self.display, &mut self.audio);
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn test_one_finger_runs_finishes_and_resets() {
        let mut device = Device::new();

        device.cycle(1);
        device.cycle(1);
        assert_eq!(device.timer.state(), TimerState::Waiting);
        device.cycle(1);
        assert_eq!(device.timer.state(), TimerState::Running);
        assert_eq!(device.timer.duration_ms(), 60_000);

        device.idle(59_999);
        assert_eq!(device.timer.state(), TimerState::Running);
        device.idle(1);
        assert_eq!(device.timer.state(), TimerState::Finished);
        assert!(device.audio.alarm_count() >= 1);

        device.idle(9_999);
        assert_eq!(device.timer.state(), TimerState::Finished);
        device.idle(1);
        assert_eq!(device.timer.state(), TimerState::Waiting);
        assert_eq!(device.display.count_titled("Ready!"), 1);
    }

    #[test]
    fn test_interrupted_streak_does_not_start() {
        let mut device = Device::new();
        for raw in [2, 2, 0, 2, 2] {
            device.cycle(raw);
        }
        assert_eq!(device.timer.state(), TimerState::Waiting);
        device.cycle(2);
        assert_eq!(device.timer.state(), TimerState::Running);
        assert_eq!(device.timer.duration_ms(), 120_000);
    }

    #[test]
    fn test_detections_while_running_are_ignored() {
        let mut device = Device::new();
        for _ in 0..3 {
            device.cycle(3);
        }
        let events = device.audio.events().len();
        for _ in 0..10 {
            device.cycle(5);
        }
        assert_eq!(device.timer.duration_ms(), 180_000);
        assert_eq!(device.audio.events().len(), events);
    }

    #[test]
    fn test_confirmation_announces_and_starts() {
        let mut device = Device::new();
        for _ in 0..3 {
            device.cycle(4);
        }
        assert_eq!(device.display.count_titled("Timer Set!"), 1);
        assert_eq!(
            &device.audio.events()[..2],
            &[
                AudioEvent::Pattern { count: 2, duration_ms: 150, interval_ms: 100 },
                AudioEvent::Pattern { count: 2, duration_ms: 100, interval_ms: 100 },
            ]
        );
    }
}

mod timer_properties {
    use super::*;

    proptest! {
        #[test]
        fn prop_duration_is_fingers_times_minute(fingers in 1u8..=5) {
            let mut device = Device::new();
            device.timer.start_timer(fingers, &mut device.display, &mut device.audio).unwrap();
            prop_assert_eq!(device.timer.duration_ms(), fingers as u64 * 60_000);
        }

        #[test]
        fn prop_remaining_time_never_increases(
            fingers in 1u8..=5,
            steps in prop::collection::vec(0u64..20_000, 1..60),
        ) {
            let mut device = Device::new();
            device.timer.start_timer(fingers, &mut device.display, &mut device.audio).unwrap();
            let duration = device.timer.duration_ms();

            let mut previous = device.timer.remaining_time_secs();
            let mut elapsed = 0;
            for step in steps {
                device.clock.advance_by(step);
                elapsed += step;
                let remaining = device.timer.remaining_time_secs();
                prop_assert!(remaining <= previous);
                if elapsed >= duration {
                    prop_assert_eq!(remaining, 0);
                    prop_assert!(device.timer.is_timer_expired());
                }
                previous = remaining;
            }
        }

        #[test]
        fn prop_remaining_is_zero_outside_running(advance in 0u64..1_000_000) {
            let device = Device::new();
            device.clock.advance_by(advance);
            prop_assert_eq!(device.timer.remaining_time_secs(), 0);
            prop_assert!(!device.timer.is_timer_expired());
        }
    }
}
