// src/config/validator.rs
//! Schema validation for merged configuration tables

use std::collections::HashMap;

use crate::config::constants::*;

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}': {} (value: {})", self.field, self.message, self.value)
    }
}

impl std::error::Error for ValidationError {}

/// Constraint attached to a dotted field path
#[derive(Debug, Clone)]
pub enum FieldConstraint {
    Range { min: f64, max: f64 },
    IntRange { min: i64, max: i64 },
    OneOf(&'static [&'static str]),
}

/// Validates a `toml::Value` tree before it is turned into a `SystemConfig`
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    constraints: HashMap<&'static str, FieldConstraint>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        use FieldConstraint::*;

        let max_frame = camera::MAX_FRAME_BYTES as i64;
        let entries: [(&'static str, FieldConstraint); 26] = [
            ("system.mode", OneOf(&["timer", "data_collection"])),
            ("system.loop_interval_ms", IntRange { min: 1, max: 10_000 }),
            ("system.log_level", OneOf(&["trace", "debug", "info", "warn", "error"])),
            ("camera.capture_timeout_ms", IntRange { min: 10, max: 60_000 }),
            ("camera.poll_interval_ms", IntRange { min: 1, max: 1_000 }),
            ("camera.capture_retries", IntRange { min: 0, max: camera::MAX_CAPTURE_RETRIES as i64 }),
            ("sampling.header_skip_bytes", IntRange { min: 0, max: 4_096 }),
            ("sampling.sample_stride", IntRange { min: 1, max: 1_000 }),
            ("sampling.scan_window", IntRange { min: 1, max: max_frame }),
            ("sampling.max_samples", IntRange { min: heuristic::MIN_SAMPLES as i64, max: 10_000 }),
            ("sampling.pixel_budget", IntRange { min: 1, max: max_frame }),
            ("sampling.min_usable_pixels", IntRange { min: 0, max: max_frame }),
            ("sampling.feature_count", IntRange { min: 3, max: 256 }),
            ("detection.source", OneOf(&["heuristic", "model"])),
            ("detection.interval_ms", IntRange { min: 1, max: 60_000 }),
            ("detection.confirmation_required", IntRange { min: 1, max: 20 }),
            ("detection.smoothing_window", IntRange { min: detection::MIN_VOTING_SAMPLES as i64, max: 64 }),
            ("detection.confidence_threshold", Range { min: 0.0, max: 1.0 }),
            ("timer.setting_dwell_ms", IntRange { min: 0, max: 60_000 }),
            ("timer.finished_dwell_ms", IntRange { min: 0, max: 600_000 }),
            ("timer.alarm_interval_ms", IntRange { min: 100, max: 60_000 }),
            ("timer.ready_message_interval_ms", IntRange { min: 100, max: 600_000 }),
            ("timer.setting_refresh_ms", IntRange { min: 1, max: 60_000 }),
            ("timer.minutes_per_finger", IntRange { min: 1, max: timer::MAX_MINUTES_PER_FINGER as i64 }),
            ("collection.samples_per_count", IntRange { min: 1, max: 1_000 }),
            ("collection.delay_ms", IntRange { min: 0, max: 60_000 }),
        ];

        Self {
            constraints: entries.into_iter().collect(),
        }
    }

    pub fn validate_field(&self, field_path: &str, value: &toml::Value) -> Result<(), ValidationError> {
        match self.constraints.get(field_path) {
            Some(constraint) => check_constraint(field_path, value, constraint),
            None => Ok(()),
        }
    }

    /// Validate every constrained field in the tree
    pub fn validate_config(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        self.validate_recursive("", config, &mut errors);

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Check relationships between fields
    pub fn validate_dependencies(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let (Some(min_pixels), Some(budget)) = (
            integer_at(config, "sampling.min_usable_pixels"),
            integer_at(config, "sampling.pixel_budget"),
        ) {
            if min_pixels > budget {
                errors.push(ValidationError {
                    field: "sampling.min_usable_pixels".to_string(),
                    message: "must not exceed the pixel budget".to_string(),
                    value: format!("min: {}, budget: {}", min_pixels, budget),
                });
            }
        }

        // The heuristic refuses to classify with fewer than MIN_SAMPLES samples
        if let (Some(window), Some(stride)) = (
            integer_at(config, "sampling.scan_window"),
            integer_at(config, "sampling.sample_stride"),
        ) {
            if stride > 0 && window.div_euclid(stride) < heuristic::MIN_SAMPLES as i64 {
                errors.push(ValidationError {
                    field: "sampling.scan_window".to_string(),
                    message: format!("window must yield at least {} samples", heuristic::MIN_SAMPLES),
                    value: format!("window: {}, stride: {}", window, stride),
                });
            }
        }

        // Every feature region needs at least one pixel
        if let (Some(features), Some(min_pixels)) = (
            integer_at(config, "sampling.feature_count"),
            integer_at(config, "sampling.min_usable_pixels"),
        ) {
            if features > min_pixels {
                errors.push(ValidationError {
                    field: "sampling.feature_count".to_string(),
                    message: "must not exceed the minimum usable pixel count".to_string(),
                    value: format!("features: {}, min pixels: {}", features, min_pixels),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_recursive(&self, prefix: &str, value: &toml::Value, errors: &mut Vec<ValidationError>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    self.validate_recursive(&path, val, errors);
                }
            }
            _ => {
                if let Err(err) = self.validate_field(prefix, value) {
                    errors.push(err);
                }
            }
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_constraint(field: &str, value: &toml::Value, constraint: &FieldConstraint) -> Result<(), ValidationError> {
    let fail = |message: String, shown: String| ValidationError {
        field: field.to_string(),
        message,
        value: shown,
    };

    match constraint {
        FieldConstraint::Range { min, max } => {
            let number = value.as_float().or_else(|| value.as_integer().map(|v| v as f64));
            match number {
                Some(val) if val < *min || val > *max => {
                    Err(fail(format!("must be between {} and {}", min, max), val.to_string()))
                }
                Some(_) => Ok(()),
                None => Err(fail("expected a number".to_string(), value.to_string())),
            }
        }
        FieldConstraint::IntRange { min, max } => match value.as_integer() {
            Some(val) if val < *min || val > *max => {
                Err(fail(format!("must be between {} and {}", min, max), val.to_string()))
            }
            Some(_) => Ok(()),
            None => Err(fail("expected an integer".to_string(), value.to_string())),
        },
        FieldConstraint::OneOf(options) => match value.as_str() {
            Some(val) if options.contains(&val) => Ok(()),
            Some(val) => Err(fail(format!("must be one of: {}", options.join(", ")), val.to_string())),
            None => Err(fail("expected a string".to_string(), value.to_string())),
        },
    }
}

fn integer_at(config: &toml::Value, path: &str) -> Option<i64> {
    let mut current = config;
    for part in path.split('.') {
        current = current.as_table()?.get(part)?;
    }
    current.as_integer()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> toml::Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_valid_threshold() {
        let validator = SchemaValidator::new();
        assert!(validator
            .validate_field("detection.confidence_threshold", &toml::Value::Float(0.6))
            .is_ok());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let validator = SchemaValidator::new();
        assert!(validator
            .validate_field("detection.confidence_threshold", &toml::Value::Float(1.5))
            .is_err());
    }

    #[test]
    fn test_integer_threshold_is_accepted() {
        let validator = SchemaValidator::new();
        assert!(validator
            .validate_field("detection.confidence_threshold", &toml::Value::Integer(1))
            .is_ok());
    }

    #[test]
    fn test_source_must_be_known() {
        let validator = SchemaValidator::new();
        let config = parse("[detection]\nsource = \"telepathy\"\n");
        let errors = validator.validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "detection.source");
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let validator = SchemaValidator::new();
        let config = parse("[timer]\nminutes_per_finger = \"two\"\n");
        assert!(validator.validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let validator = SchemaValidator::new();
        let config = parse("[display]\nbrightness = 3\n");
        assert!(validator.validate_config(&config).is_ok());
    }

    #[test]
    fn test_pixel_budget_dependency() {
        let validator = SchemaValidator::new();
        let config = parse("[sampling]\nmin_usable_pixels = 500\npixel_budget = 400\n");
        assert!(validator.validate_config(&config).is_ok());
        assert!(validator.validate_dependencies(&config).is_err());
    }

    #[test]
    fn test_feature_count_needs_pixels() {
        let validator = SchemaValidator::new();
        let config = parse("[sampling]\nfeature_count = 120\nmin_usable_pixels = 100\n");
        let errors = validator.validate_dependencies(&config).unwrap_err();
        assert_eq!(errors[0].field, "sampling.feature_count");
    }

    #[test]
    fn test_smoothing_window_must_allow_a_vote() {
        let validator = SchemaValidator::new();
        let config = parse("[detection]\nsmoothing_window = 2\n");
        assert!(validator.validate_config(&config).is_err());
    }

    #[test]
    fn test_scan_window_must_yield_enough_samples() {
        let validator = SchemaValidator::new();
        let config = parse("[sampling]\nscan_window = 100\nsample_stride = 30\n");
        let errors = validator.validate_dependencies(&config).unwrap_err();
        assert_eq!(errors[0].field, "sampling.scan_window");
    }
}
