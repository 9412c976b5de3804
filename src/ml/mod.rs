// src/ml/mod.rs
//! Model-based finger classification

pub mod classifier;
pub mod linear;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{argmax, Decision, MlClassifier};
pub use linear::LinearModel;

#[cfg(feature = "onnx")]
pub use onnx::OnnxInferenceService;

use crate::config::DetectionConfig;
use crate::error::{ErrorBuilder, FingerTimerResult};
use crate::hal::InferenceService;

/// Class names in label order
pub const FINGER_LABELS: [&str; 6] = [
    "no_fingers",
    "one_finger",
    "two_fingers",
    "three_fingers",
    "four_fingers",
    "five_fingers",
];

pub fn label_name(label: u8) -> Option<&'static str> {
    FINGER_LABELS.get(label as usize).copied()
}

/// Load the inference service named by `detection.model_path`
///
/// `.onnx` files need the `onnx` feature. Every other extension is read as a
/// [`LinearModel`].
pub fn load_inference_service(config: &DetectionConfig, feature_count: usize) -> FingerTimerResult<Box<dyn InferenceService>> {
    let path = config
        .model_path
        .as_deref()
        .ok_or_else(|| ErrorBuilder::new("ml", "load_inference_service").configuration("detection.model_path is not set"))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        #[cfg(feature = "onnx")]
        Some("onnx") => Ok(Box::new(OnnxInferenceService::load(path, feature_count)?)),
        #[cfg(not(feature = "onnx"))]
        Some("onnx") => Err(ErrorBuilder::new("ml", "load_inference_service")
            .configuration("ONNX models need the `onnx` feature")),
        _ => {
            let model = LinearModel::load(path)?;
            if model.feature_count() != feature_count {
                return Err(ErrorBuilder::new("ml", "load_inference_service").mismatch(
                    "model input width",
                    feature_count,
                    model.feature_count(),
                ));
            }
            Ok(Box::new(model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names() {
        assert_eq!(label_name(0), Some("no_fingers"));
        assert_eq!(label_name(5), Some("five_fingers"));
        assert_eq!(label_name(6), None);
    }

    #[test]
    fn test_missing_model_path_is_configuration_error() {
        let config = DetectionConfig::default();
        assert!(load_inference_service(&config, 20).is_err());
    }

    #[test]
    fn test_linear_model_width_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"weights": [[1.0, 0.0]], "bias": [0.0]}"#).unwrap();

        let config = DetectionConfig {
            model_path: Some(path),
            ..DetectionConfig::default()
        };
        assert!(load_inference_service(&config, 20).is_err());
        assert_eq!(load_inference_service(&config, 2).unwrap().label_count(), 1);
    }
}
