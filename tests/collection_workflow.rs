// tests/collection_workflow.rs
//! Training-data collection driven from a request-handler thread

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use finger_timer::collection::{command_channel, CollectionHandle, SettingsUpdate};
use finger_timer::config::{OperatingMode, SystemConfig};
use finger_timer::hal::simulator::{SimulatorConfig, SyntheticCamera};
use finger_timer::hal::{RecordingAudio, RecordingDisplay};
use finger_timer::logic::DeviceContext;
use finger_timer::utils::MockTimeProvider;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

fn collecting_device() -> (DeviceContext, CollectionHandle, Arc<MockTimeProvider>, RecordingDisplay) {
    let mut config = SystemConfig::default();
    config.system.mode = OperatingMode::DataCollection;

    let mut camera = SyntheticCamera::new(SimulatorConfig::default());
    camera.set_finger_count(2);

    let clock = Arc::new(MockTimeProvider::new(0));
    let display = RecordingDisplay::new();
    let (handle, commands) = command_channel();
    let device = DeviceContext::from_config(
        config,
        Box::new(camera),
        Box::new(display.clone()),
        Box::new(RecordingAudio::new()),
        clock.clone(),
    )
    .unwrap()
    .with_collection(commands);

    (device, handle, clock, display)
}

mod manual_mode {
    use super::*;

    #[test]
    fn test_each_request_collects_one_row() {
        let (mut device, handle, _, display) = collecting_device();
        handle
            .update_settings(SettingsUpdate {
                fingers: Some(2),
                ..SettingsUpdate::default()
            })
            .unwrap();
        handle.start().unwrap();

        device.tick();
        device.tick();
        assert_eq!(device.collection_session().unwrap().total_samples(), 1);

        handle.collect().unwrap();
        device.tick();
        assert_eq!(device.collection_session().unwrap().total_samples(), 2);
        assert_eq!(display.count_titled("Sample 2"), 1);

        let rows: Vec<&str> = device.collection_session().unwrap().data().lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.starts_with("2,")));
    }

    #[test]
    fn test_rejected_settings_leave_session_unchanged() {
        let (mut device, handle, _, _) = collecting_device();
        handle
            .update_settings(SettingsUpdate {
                fingers: Some(9),
                samples_per_count: Some(4),
                ..SettingsUpdate::default()
            })
            .unwrap();
        device.tick();

        let settings = device.collection_session().unwrap().settings().clone();
        assert_eq!(settings.fingers, 0);
        assert_eq!(settings.samples_per_count, 20);
    }

    #[test]
    fn test_stop_and_clear() {
        let (mut device, handle, _, _) = collecting_device();
        handle.start().unwrap();
        device.tick();
        handle.stop().unwrap();
        handle.clear_data().unwrap();
        handle.collect().unwrap();
        device.tick();

        let session = device.collection_session().unwrap();
        assert!(!session.is_collecting());
        assert_eq!(session.total_samples(), 0);
        assert!(session.data().is_empty());
    }
}

mod auto_mode {
    use super::*;

    #[test]
    fn test_collaborator_thread_runs_full_auto_session() {
        let (mut device, handle, clock, _) = collecting_device();

        let collaborator = thread::spawn(move || {
            handle
                .update_settings(SettingsUpdate {
                    fingers: Some(4),
                    samples_per_count: Some(2),
                    auto_mode: Some(true),
                    delay_ms: Some(100),
                })
                .unwrap();
            handle.start().unwrap();

            loop {
                let status = handle.status(REPLY_TIMEOUT).unwrap();
                if !status.is_collecting {
                    let json = status.to_json().unwrap();
                    let csv = handle.export_data(REPLY_TIMEOUT).unwrap();
                    return (status, json, csv);
                }
                thread::sleep(Duration::from_millis(2));
            }
        });

        for _ in 0..10_000 {
            if collaborator.is_finished() {
                break;
            }
            device.tick();
            clock.advance_by(200);
            thread::sleep(Duration::from_millis(1));
        }
        // Answer any request still queued when the worker finished
        device.tick();

        let (status, json, csv) = collaborator.join().unwrap();
        assert_eq!(status.total_samples, 4);
        assert_eq!(status.current_fingers, 5);
        assert!(json.contains("\"isCollecting\":false"));

        let labels: Vec<&str> = csv.lines().map(|row| row.split(',').next().unwrap()).collect();
        assert_eq!(labels, vec!["4", "4", "5", "5"]);
        assert!(csv.lines().all(|row| row.split(',').count() == 21));
    }
}
