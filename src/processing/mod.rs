// src/processing/mod.rs
//! Finger count detection: classification, features and confirmation

pub(crate) mod components;
pub mod confirmation;
pub mod features;
pub mod heuristic;
pub mod pipeline;

pub use confirmation::{ConfirmationFilter, ConsecutiveMatchFilter, MajorityVoteFilter, SmoothingBuffer};
pub use features::{Extraction, FeatureExtractor, FeatureKind, FeatureSignal, FeatureVector};
pub use heuristic::{HeuristicClassifier, HeuristicOutcome, ImageStats, Verdict};
pub use pipeline::{CycleDiagnostics, CycleOutcome, DetectionPipeline};
