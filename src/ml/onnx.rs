// src/ml/onnx.rs
//! ONNX Runtime inference service

use std::path::Path;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::info;

use crate::error::{ErrorBuilder, FingerTimerResult};
use crate::hal::{HalError, InferenceService};
use crate::ml::FINGER_LABELS;
use crate::processing::features::{FeatureSignal, FeatureVector};

/// Runs a `[1, n]` f32 model and returns its first output as label scores
pub struct OnnxInferenceService {
    session: Session,
    feature_count: usize,
    label_count: usize,
    output_name: String,
}

impl OnnxInferenceService {
    pub fn load(path: &Path, feature_count: usize) -> FingerTimerResult<Self> {
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                ErrorBuilder::new("onnx", "load").configuration(&format!("{}: {}", path.display(), e))
            })?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ErrorBuilder::new("onnx", "load").configuration("model has no outputs"))?;

        info!(path = %path.display(), feature_count, output = %output_name, "ONNX model loaded");
        Ok(Self {
            session,
            feature_count,
            label_count: FINGER_LABELS.len(),
            output_name,
        })
    }
}

impl InferenceService for OnnxInferenceService {
    fn label_count(&self) -> usize {
        self.label_count
    }

    fn classify(&mut self, features: &FeatureVector) -> Result<Vec<f32>, HalError> {
        let mut input = vec![0.0f32; self.feature_count];
        FeatureSignal::new(features).read(0, &mut input);

        let tensor = Tensor::from_array(([1usize, self.feature_count], input))
            .map_err(|e| HalError::InferenceFailed(format!("input tensor: {}", e)))?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| HalError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| HalError::InferenceFailed(format!("missing output {}", self.output_name)))?;
        let (_, scores) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| HalError::InferenceFailed(format!("output tensor: {}", e)))?;

        Ok(scores.to_vec())
    }
}
