// src/ml/linear.rs
//! Softmax-linear finger classifier loadable from TOML or JSON
//!
//! ```toml
//! input_scale = 0.00392
//! bias = [0.0, 0.1, 0.0, 0.0, 0.0, 0.0]
//! weights = [
//!     [0.0, ...],   # one row of feature weights per label
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ErrorBuilder, FingerTimerResult};
use crate::hal::{HalError, InferenceService};
use crate::processing::features::{FeatureSignal, FeatureVector};

fn default_input_scale() -> f32 {
    1.0 / 255.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// Multiplier applied to every feature before the dot product
    #[serde(default = "default_input_scale")]
    pub input_scale: f32,
    /// `weights[label][feature]`
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl LinearModel {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> FingerTimerResult<Self> {
        let model = Self {
            input_scale: default_input_scale(),
            weights,
            bias,
        };
        model.check_shape()?;
        Ok(model)
    }

    pub fn from_toml_str(text: &str) -> FingerTimerResult<Self> {
        let model: Self = toml::from_str(text)
            .map_err(|e| ErrorBuilder::new("linear_model", "from_toml_str").configuration(&e.to_string()))?;
        model.check_shape()?;
        Ok(model)
    }

    pub fn from_json_str(text: &str) -> FingerTimerResult<Self> {
        let model: Self = serde_json::from_str(text)
            .map_err(|e| ErrorBuilder::new("linear_model", "from_json_str").configuration(&e.to_string()))?;
        model.check_shape()?;
        Ok(model)
    }

    /// Load by extension: `.json` is JSON, anything else TOML
    pub fn load(path: &Path) -> FingerTimerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ErrorBuilder::new("linear_model", "load").configuration(&format!("{}: {}", path.display(), e))
        })?;

        let model = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            _ => Self::from_toml_str(&text)?,
        };
        info!(path = %path.display(), labels = model.weights.len(), features = model.feature_count(), "linear model loaded");
        Ok(model)
    }

    pub fn feature_count(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn to_toml_string(&self) -> FingerTimerResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ErrorBuilder::new("linear_model", "to_toml_string").configuration(&e.to_string()))
    }

    fn check_shape(&self) -> FingerTimerResult<()> {
        if self.weights.is_empty() {
            return Err(ErrorBuilder::new("linear_model", "check_shape").invalid_data("weights", "no labels"));
        }
        if self.bias.len() != self.weights.len() {
            return Err(ErrorBuilder::new("linear_model", "check_shape").mismatch("bias", self.weights.len(), self.bias.len()));
        }
        let width = self.feature_count();
        if let Some(row) = self.weights.iter().find(|row| row.len() != width) {
            return Err(ErrorBuilder::new("linear_model", "check_shape").mismatch("weight row", width, row.len()));
        }
        Ok(())
    }

    fn logits(&self, signal: FeatureSignal<'_>) -> Vec<f32> {
        let mut scaled = vec![0.0; self.feature_count()];
        signal.read(0, &mut scaled);
        for value in scaled.iter_mut() {
            *value *= self.input_scale;
        }

        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| row.iter().zip(&scaled).map(|(w, x)| w * x).sum::<f32>() + bias)
            .collect()
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl InferenceService for LinearModel {
    fn label_count(&self) -> usize {
        self.weights.len()
    }

    fn classify(&mut self, features: &FeatureVector) -> Result<Vec<f32>, HalError> {
        if features.len() != self.feature_count() {
            return Err(HalError::InferenceFailed(format!(
                "model expects {} features, got {}",
                self.feature_count(),
                features.len()
            )));
        }
        Ok(softmax(&self.logits(FeatureSignal::new(features))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Two labels over two features: label 1 prefers a bright first feature
    fn tiny_model() -> LinearModel {
        LinearModel::new(vec![vec![0.0, 0.0], vec![4.0, 0.0]], vec![1.0, 0.0]).unwrap()
    }

    #[test]
    fn test_scores_sum_to_one() {
        let mut model = tiny_model();
        let scores = model.classify(&FeatureVector::new(vec![128.0, 0.0])).unwrap();
        assert_eq!(scores.len(), 2);
        assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bright_input_moves_score() {
        let mut model = tiny_model();
        let dark = model.classify(&FeatureVector::new(vec![0.0, 0.0])).unwrap();
        let bright = model.classify(&FeatureVector::new(vec![255.0, 0.0])).unwrap();
        assert!(dark[0] > dark[1]);
        assert!(bright[1] > bright[0]);
    }

    #[test]
    fn test_wrong_feature_count_fails() {
        let mut model = tiny_model();
        assert!(model.classify(&FeatureVector::neutral(3)).is_err());
    }

    #[test]
    fn test_ragged_weights_rejected() {
        assert!(LinearModel::new(vec![vec![0.0, 0.0], vec![1.0]], vec![0.0, 0.0]).is_err());
        assert!(LinearModel::new(vec![vec![0.0]], vec![0.0, 0.0]).is_err());
        assert!(LinearModel::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let model = tiny_model();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(model.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = LinearModel::load(file.path()).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_json_model_uses_default_scale() {
        let model = LinearModel::from_json_str(r#"{"weights": [[1.0], [2.0]], "bias": [0.0, 0.0]}"#).unwrap();
        assert_eq!(model.input_scale, default_input_scale());
        assert_eq!(model.label_count(), 2);
    }
}
