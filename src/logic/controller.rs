// src/logic/controller.rs
//! Top-level device context and the cooperative loop iteration

use std::sync::Arc;

use tracing::{info, warn};

use crate::collection::{CollectionSession, CollectionSettings, CommandReceiver};
use crate::config::constants::audio::{
    COLLECT_BEEP_MS, COLLECT_FAILED_PATTERN, COLLECT_OK_PATTERN, READY_BEEP_MS, SETUP_FAILED_PATTERN,
};
use crate::config::constants::detection::{MAX_FINGERS, MIN_FINGERS};
use crate::config::{DecisionSource, OperatingMode, SystemConfig};
use crate::error::FingerTimerResult;
use crate::hal::{AudioSink, DisplayCommand, DisplaySink, FrameSource};
use crate::logic::state_machine::{TimerState, TimerStateMachine};
use crate::ml::{label_name, load_inference_service, Decision};
use crate::processing::features::{Extraction, FeatureExtractor};
use crate::processing::pipeline::{CycleDiagnostics, CycleOutcome, DetectionPipeline};
use crate::utils::time::TimeProvider;

struct CollectionRuntime {
    session: CollectionSession,
    commands: CommandReceiver,
}

/// Everything one device owns, constructed once and driven by `tick`
pub struct DeviceContext {
    config: SystemConfig,
    clock: Arc<dyn TimeProvider>,
    camera: Box<dyn FrameSource>,
    pipeline: DetectionPipeline,
    timer: TimerStateMachine,
    display: Box<dyn DisplaySink>,
    audio: Box<dyn AudioSink>,
    extractor: FeatureExtractor,
    collection: Option<CollectionRuntime>,
    last_detection_at: Option<u64>,
    failed_cycles: u64,
}

impl DeviceContext {
    pub fn new(
        config: SystemConfig,
        camera: Box<dyn FrameSource>,
        pipeline: DetectionPipeline,
        display: Box<dyn DisplaySink>,
        audio: Box<dyn AudioSink>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        let timer = TimerStateMachine::new(config.timer.clone(), clock.clone());
        let extractor = FeatureExtractor::from_config(&config.sampling);
        Self {
            config,
            clock,
            camera,
            pipeline,
            timer,
            display,
            audio,
            extractor,
            collection: None,
            last_detection_at: None,
            failed_cycles: 0,
        }
    }

    /// Build the detection pipeline `detection.source` asks for
    pub fn from_config(
        config: SystemConfig,
        camera: Box<dyn FrameSource>,
        display: Box<dyn DisplaySink>,
        audio: Box<dyn AudioSink>,
        clock: Arc<dyn TimeProvider>,
    ) -> FingerTimerResult<Self> {
        let service = match config.detection.source {
            DecisionSource::Heuristic => None,
            DecisionSource::Model => Some(load_inference_service(&config.detection, config.sampling.feature_count)?),
        };
        let pipeline = DetectionPipeline::from_config(&config, service)?;
        Ok(Self::new(config, camera, pipeline, display, audio, clock))
    }

    /// Accept collection commands from `commands`
    pub fn with_collection(mut self, commands: CommandReceiver) -> Self {
        let settings = CollectionSettings::from_config(&self.config.collection);
        self.collection = Some(CollectionRuntime {
            session: CollectionSession::new(settings),
            commands,
        });
        self
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn timer(&self) -> &TimerStateMachine {
        &self.timer
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    pub fn collection_session(&self) -> Option<&CollectionSession> {
        self.collection.as_ref().map(|runtime| &runtime.session)
    }

    /// Cycles aborted by a capture or inference failure
    pub fn failed_cycles(&self) -> u64 {
        self.failed_cycles
    }

    /// Check the camera and announce the result
    pub fn startup(&mut self) -> bool {
        let ok = self.camera.is_ready();
        self.startup_report(ok);
        ok
    }

    pub fn startup_report(&mut self, ok: bool) {
        if ok {
            info!(mode = ?self.config.system.mode, source = ?self.pipeline.source(), "device ready");
            self.display.show(DisplayCommand::message("ML Ready!", "Show fingers to set timer"));
            self.audio.beep(READY_BEEP_MS);
        } else {
            warn!("device setup failed");
            self.display.show(DisplayCommand::message("Error!", "Check connections"));
            let (count, duration, interval) = SETUP_FAILED_PATTERN;
            self.audio.beep_pattern(count, duration, interval);
        }
    }

    /// One loop iteration for the configured mode
    ///
    /// Returns the detection outcome when a detection cycle ran.
    pub fn tick(&mut self) -> Option<CycleOutcome> {
        match self.config.system.mode {
            OperatingMode::Timer => self.timer_tick(),
            OperatingMode::DataCollection => {
                self.run_collection_tick();
                None
            }
        }
    }

    fn detection_due(&self, now: u64) -> bool {
        self.last_detection_at
            .map_or(true, |last| now.saturating_sub(last) > self.config.detection.interval_ms)
    }

    fn timer_tick(&mut self) -> Option<CycleOutcome> {
        let now = self.clock.now_millis();
        let mut outcome = None;

        if self.timer.state() == TimerState::Waiting && self.detection_due(now) {
            self.last_detection_at = Some(now);
            match self.pipeline.run_cycle(self.camera.as_mut()) {
                Ok(cycle) => {
                    self.handle_cycle(&cycle);
                    outcome = Some(cycle);
                }
                Err(err) => {
                    self.failed_cycles += 1;
                    warn!(error = %err, transient = err.is_transient(), "detection cycle failed");
                }
            }
        }

        self.timer.update(self.display.as_mut(), self.audio.as_mut());
        outcome
    }

    fn handle_cycle(&mut self, cycle: &CycleOutcome) {
        self.timer.record_detection(cycle.raw);

        if let CycleDiagnostics::Model(decision) = &cycle.diagnostics {
            let status = match decision {
                Decision::Accepted { label, .. } => label_name(*label).unwrap_or("unknown"),
                Decision::NoDecision { .. } => "uncertain",
            };
            self.display.show(DisplayCommand::ModelStatus {
                status: status.to_string(),
                confidence: decision.confidence(),
            });
        }
        if (MIN_FINGERS..=MAX_FINGERS).contains(&cycle.raw) {
            self.display.show(DisplayCommand::FingerCount(cycle.raw));
        }

        if let Some(fingers) = cycle.confirmed {
            if let Err(err) = self.timer.start_timer(fingers, self.display.as_mut(), self.audio.as_mut()) {
                warn!(error = %err, fingers, "confirmed count rejected");
            }
            self.pipeline.reset();
        }
    }

    /// Apply pending collection commands and take a sample if one is due
    ///
    /// Returns whether a sample was attempted.
    pub fn run_collection_tick(&mut self) -> bool {
        let Some(runtime) = self.collection.as_mut() else {
            return false;
        };
        runtime.commands.drain_into(&mut runtime.session);

        let now = self.clock.now_millis();
        if !runtime.session.should_trigger(now) {
            return false;
        }

        let fingers = runtime.session.current_fingers();
        info!(fingers, total = runtime.session.total_samples(), "collecting sample");
        self.display.show(DisplayCommand::message("Collecting...", format!("{} fingers", fingers)));
        self.audio.beep(COLLECT_BEEP_MS);

        let extraction = self.camera.capture().map(|frame| self.extractor.extract(&frame));
        match extraction {
            Ok(Extraction::Complete(features)) => {
                runtime.session.add_row(fingers, &features);
                runtime.session.on_sample_collected(now);
                let title = format!("Sample {}", runtime.session.total_samples());
                self.display.show(DisplayCommand::message(title, "Collected!"));
                let (count, duration, interval) = COLLECT_OK_PATTERN;
                self.audio.beep_pattern(count, duration, interval);
            }
            Ok(Extraction::Insufficient { usable_pixels, .. }) => {
                warn!(usable_pixels, "sample frame too small for features");
                report_collection_failure(self.display.as_mut(), self.audio.as_mut());
            }
            Err(err) => {
                warn!(error = %err, "sample capture failed");
                report_collection_failure(self.display.as_mut(), self.audio.as_mut());
            }
        }
        true
    }
}

fn report_collection_failure(display: &mut dyn DisplaySink, audio: &mut dyn AudioSink) {
    display.show(DisplayCommand::message("Error!", "Feature extraction failed"));
    let (count, duration, interval) = COLLECT_FAILED_PATTERN;
    audio.beep_pattern(count, duration, interval);
}
