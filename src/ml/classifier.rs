// src/ml/classifier.rs
//! Confidence-gated argmax over inference scores

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::constants::detection::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::error::{ErrorBuilder, FingerTimerResult, ProcessingStage};
use crate::hal::InferenceService;
use crate::processing::features::FeatureVector;

/// Outcome of one classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Accepted { label: u8, confidence: f32 },
    /// Best score was below the acceptance threshold
    NoDecision { best_label: u8, confidence: f32 },
}

impl Decision {
    /// Label fed to confirmation; `0` when nothing was accepted
    pub fn raw_label(&self) -> u8 {
        match self {
            Decision::Accepted { label, .. } => *label,
            Decision::NoDecision { .. } => 0,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Decision::Accepted { confidence, .. } | Decision::NoDecision { confidence, .. } => *confidence,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted { .. })
    }
}

/// Index and value of the highest score, first index on ties
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if score <= top => {}
            _ if score.is_nan() => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

pub struct MlClassifier<S: InferenceService> {
    service: S,
    threshold: f32,
    inferences: u64,
}

impl<S: InferenceService> MlClassifier<S> {
    pub fn new(service: S, threshold: f32) -> Self {
        Self {
            service,
            threshold,
            inferences: 0,
        }
    }

    pub fn with_default_threshold(service: S) -> Self {
        Self::new(service, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn label_count(&self) -> usize {
        self.service.label_count()
    }

    pub fn inferences(&self) -> u64 {
        self.inferences
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    /// One inference call. Service failure is an error; low confidence is not.
    pub fn classify(&mut self, features: &FeatureVector) -> FingerTimerResult<Decision> {
        let scores = self.service.classify(features).map_err(|err| {
            warn!(error = %err, "inference call failed");
            err
        })?;
        self.inferences += 1;

        let expected = self.service.label_count();
        if scores.len() != expected {
            return Err(ErrorBuilder::new("ml_classifier", "classify").mismatch("score vector", expected, scores.len()));
        }

        let (label, confidence) = argmax(&scores)
            .ok_or_else(|| {
                ErrorBuilder::new("ml_classifier", "classify").processing(ProcessingStage::Inference, "no finite scores")
            })?;
        let label = label as u8;

        let decision = if confidence < self.threshold {
            Decision::NoDecision {
                best_label: label,
                confidence,
            }
        } else {
            Decision::Accepted { label, confidence }
        };
        debug!(label, confidence, accepted = decision.is_accepted(), "model decision");
        Ok(decision)
    }
}
