// src/processing/pipeline.rs
//! One detection cycle: capture, classify, confirm

use std::fmt;

use tracing::{debug, info};

use crate::acquisition::FrameSampler;
use crate::config::{DecisionSource, SystemConfig};
use crate::error::{ErrorBuilder, FingerTimerResult};
use crate::hal::{FrameSource, InferenceService};
use crate::ml::{Decision, MlClassifier};
use crate::processing::confirmation::{ConfirmationFilter, ConsecutiveMatchFilter, MajorityVoteFilter};
use crate::processing::features::{Extraction, FeatureExtractor};
use crate::processing::heuristic::{HeuristicClassifier, HeuristicOutcome};

/// What produced the raw decision of a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleDiagnostics {
    Heuristic(HeuristicOutcome),
    Model(Decision),
    /// The frame had too few pixels to measure
    FeaturesUnavailable { usable_pixels: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Unfiltered count for this cycle, `0` when nothing was decided
    pub raw: u8,
    /// Set only on the cycle a count became stable
    pub confirmed: Option<u8>,
    pub diagnostics: CycleDiagnostics,
}

enum DecisionEngine {
    Heuristic(HeuristicClassifier),
    Model {
        extractor: FeatureExtractor,
        classifier: MlClassifier<Box<dyn InferenceService>>,
    },
}

/// Detection path of a device: exactly one decision source and its filter
pub struct DetectionPipeline {
    sampler: FrameSampler,
    max_samples: usize,
    engine: DecisionEngine,
    filter: Box<dyn ConfirmationFilter>,
    cycles: u64,
    confirmations: u64,
}

impl DetectionPipeline {
    /// Heuristic classifier with consecutive-match confirmation
    pub fn heuristic(config: &SystemConfig) -> Self {
        Self {
            sampler: FrameSampler::from_config(&config.sampling),
            max_samples: config.sampling.max_samples,
            engine: DecisionEngine::Heuristic(HeuristicClassifier::new()),
            filter: Box::new(ConsecutiveMatchFilter::new(config.detection.confirmation_required)),
            cycles: 0,
            confirmations: 0,
        }
    }

    /// Feature model with majority-vote confirmation
    pub fn model(config: &SystemConfig, service: Box<dyn InferenceService>) -> Self {
        let label_count = service.label_count();
        Self {
            sampler: FrameSampler::from_config(&config.sampling),
            max_samples: config.sampling.max_samples,
            engine: DecisionEngine::Model {
                extractor: FeatureExtractor::from_config(&config.sampling),
                classifier: MlClassifier::new(service, config.detection.confidence_threshold),
            },
            filter: Box::new(MajorityVoteFilter::new(config.detection.smoothing_window, label_count)),
            cycles: 0,
            confirmations: 0,
        }
    }

    /// Pipeline for `detection.source`; the model path needs `service`
    pub fn from_config(config: &SystemConfig, service: Option<Box<dyn InferenceService>>) -> FingerTimerResult<Self> {
        match (config.detection.source, service) {
            (DecisionSource::Heuristic, _) => Ok(Self::heuristic(config)),
            (DecisionSource::Model, Some(service)) => Ok(Self::model(config, service)),
            (DecisionSource::Model, None) => Err(ErrorBuilder::new("pipeline", "from_config")
                .configuration("model decision source selected without an inference service")),
        }
    }

    pub fn source(&self) -> DecisionSource {
        match self.engine {
            DecisionEngine::Heuristic(_) => DecisionSource::Heuristic,
            DecisionEngine::Model { .. } => DecisionSource::Model,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    /// Drop confirmation history, e.g. after the timer started
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Capture one frame and run it through the decision source
    ///
    /// Capture and inference failures abort only this cycle. Low confidence
    /// and unmeasurable frames are not errors and leave the filter untouched.
    pub fn run_cycle(&mut self, source: &mut dyn FrameSource) -> FingerTimerResult<CycleOutcome> {
        let frame = source.capture()?;
        self.cycles += 1;

        let (raw, diagnostics) = match &mut self.engine {
            DecisionEngine::Heuristic(classifier) => {
                let samples = self.sampler.sample(&frame, self.max_samples);
                let outcome = classifier.classify(&samples);
                (Some(outcome.count), CycleDiagnostics::Heuristic(outcome))
            }
            DecisionEngine::Model { extractor, classifier } => match extractor.extract(&frame) {
                Extraction::Complete(features) => {
                    let decision = classifier.classify(&features)?;
                    let raw = decision.is_accepted().then(|| decision.raw_label());
                    (raw, CycleDiagnostics::Model(decision))
                }
                Extraction::Insufficient { usable_pixels, .. } => {
                    (None, CycleDiagnostics::FeaturesUnavailable { usable_pixels })
                }
            },
        };

        let confirmed = match raw {
            Some(raw) => self.filter.observe(raw),
            None => None,
        };

        if let Some(fingers) = confirmed {
            self.confirmations += 1;
            self.filter.reset();
            info!(fingers, cycle = self.cycles, "detection confirmed");
        }
        debug!(cycle = self.cycles, raw = raw.unwrap_or(0), ?confirmed, "detection cycle");

        Ok(CycleOutcome {
            raw: raw.unwrap_or(0),
            confirmed,
            diagnostics,
        })
    }
}

impl fmt::Debug for DetectionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionPipeline")
            .field("source", &self.source())
            .field("sampler", &self.sampler)
            .field("cycles", &self.cycles)
            .field("confirmations", &self.confirmations)
            .finish()
    }
}
