// src/config/loader.rs
//! Configuration loader: defaults, layered TOML files, then environment overrides

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{constants::paths, validator::SchemaValidator, SystemConfig};
use crate::error::{ErrorContext, FingerTimerError};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parse error: {0}")]
    ParseError(String),

    #[error("configuration validation failed: {}", format_errors(.0))]
    ValidationError(Vec<crate::config::validator::ValidationError>),

    #[error("IO error: {0}")]
    IoError(String),
}

fn format_errors(errors: &[crate::config::validator::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for FingerTimerError {
    fn from(err: ConfigError) -> Self {
        FingerTimerError::Configuration {
            component: "config_loader".to_string(),
            reason: err.to_string(),
            context: ErrorContext::new("config_loader", "load"),
        }
    }
}

/// Loads and merges configuration layers
///
/// Layers, lowest precedence first: built-in defaults, then each path in
/// `config_paths` that exists, then `FTIMER_<SECTION>__<FIELD>` environment
/// variables.
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    schema_validator: SchemaValidator,
    current_config: Arc<RwLock<SystemConfig>>,
}

impl ConfigLoader {
    /// Loader over the standard system, user and local paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            schema_validator: SchemaValidator::new(),
            current_config: Arc::new(RwLock::new(SystemConfig::default())),
        }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, validate and cache the merged configuration
    pub fn load_system_config(&mut self) -> Result<SystemConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        *self.current_config.write() = config.clone();
        info!(
            mode = ?config.system.mode,
            source = ?config.detection.source,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Last successfully loaded configuration
    pub fn get_current_config(&self) -> SystemConfig {
        self.current_config.read().clone()
    }

    /// Shared handle to the cached configuration
    pub fn shared_config(&self) -> Arc<RwLock<SystemConfig>> {
        Arc::clone(&self.current_config)
    }

    /// Validate a single file layered over the defaults, without caching it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let file_value = Self::load_config_file(path)?;
        let mut merged = Self::default_value()?;
        merge_toml_values(&mut merged, file_value);

        self.validate(&merged)?;
        merged
            .try_into::<SystemConfig>()
            .map(|_| ())
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Write the cached configuration as TOML
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let config = self.get_current_config();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<SystemConfig, ConfigError> {
        let mut merged = Self::default_value()?;

        for config_path in &self.config_paths {
            match Self::load_config_file(config_path) {
                Ok(file_value) => {
                    debug!(path = %config_path.display(), "merging configuration file");
                    merge_toml_values(&mut merged, file_value);
                }
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        apply_environment_overrides(&mut merged, std::env::vars());
        self.validate(&merged)?;

        merged
            .try_into::<SystemConfig>()
            .map_err(|e| ConfigError::ParseError(format!("failed to deserialize config: {}", e)))
    }

    fn validate(&self, merged: &toml::Value) -> Result<(), ConfigError> {
        self.schema_validator
            .validate_config(merged)
            .map_err(ConfigError::ValidationError)?;
        self.schema_validator
            .validate_dependencies(merged)
            .map_err(ConfigError::ValidationError)
    }

    fn default_value() -> Result<toml::Value, ConfigError> {
        toml::Value::try_from(SystemConfig::default()).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn load_config_file<P: AsRef<Path>>(path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut found = vec![PathBuf::from(paths::SYSTEM_CONFIG_PATH)];

        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            found.push(PathBuf::from(home).join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        found.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        found.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));
        found
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => merge_toml_values(base_value, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base_value, overlay_value) => *base_value = overlay_value,
    }
}

/// Apply `FTIMER_SECTION__FIELD=value` pairs onto the merged tree
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };

        let lowered = stripped.to_lowercase();
        let Some((section, field)) = lowered.split_once(paths::ENV_SEPARATOR) else {
            warn!(variable = %key, "ignoring environment override without section separator");
            continue;
        };

        let Some(table) = config.as_table_mut() else {
            return;
        };
        let section_value = table
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));

        if let Some(section_table) = section_value.as_table_mut() {
            debug!(section, field, "applying environment override");
            section_table.insert(field.to_string(), parse_env_value(&value));
        }
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecisionSource, OperatingMode};
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn isolated_loader(paths: Vec<PathBuf>) -> ConfigLoader {
        ConfigLoader::with_paths(paths)
    }

    #[test]
    fn test_discovered_paths_are_ordered() {
        let loader = ConfigLoader::new();
        assert_eq!(loader.config_paths()[0], PathBuf::from(paths::SYSTEM_CONFIG_PATH));
        assert_eq!(
            loader.config_paths().last(),
            Some(&PathBuf::from(paths::LOCAL_CONFIG_FILE))
        );
    }

    #[test]
    #[serial]
    fn test_missing_files_yield_defaults() {
        let mut loader = isolated_loader(vec![PathBuf::from("/nonexistent/finger-timer.toml")]);
        let config = loader.load_system_config().unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    #[serial]
    fn test_later_files_override_earlier() {
        let mut base = NamedTempFile::new().unwrap();
        writeln!(base, "[timer]\nminutes_per_finger = 2\nsetting_dwell_ms = 1500\n").unwrap();
        let mut local = NamedTempFile::new().unwrap();
        writeln!(local, "[timer]\nminutes_per_finger = 3\n").unwrap();

        let mut loader = isolated_loader(vec![base.path().to_path_buf(), local.path().to_path_buf()]);
        let config = loader.load_system_config().unwrap();

        assert_eq!(config.timer.minutes_per_finger, 3);
        assert_eq!(config.timer.setting_dwell_ms, 1500);
        assert_eq!(loader.get_current_config(), config);
    }

    #[test]
    fn test_config_file_validation() {
        let loader = isolated_loader(Vec::new());
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[system]
mode = "data_collection"

[detection]
source = "model"
confidence_threshold = 0.7
"#
        )
        .unwrap();

        assert!(loader.validate_config_file(temp_file.path()).is_ok());
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = isolated_loader(Vec::new());
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[detection]\nsmoothing_window = 0\n").unwrap();

        match loader.validate_config_file(temp_file.path()) {
            Err(ConfigError::ValidationError(errors)) => {
                assert_eq!(errors[0].field, "detection.smoothing_window");
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let loader = isolated_loader(Vec::new());
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[timer\nminutes_per_finger = ").unwrap();

        assert!(matches!(
            loader.validate_config_file(temp_file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        std::env::set_var("FTIMER_TIMER__SETTING_DWELL_MS", "2500");
        std::env::set_var("FTIMER_DETECTION__SOURCE", "model");
        std::env::set_var("FTIMER_SYSTEM__MODE", "data_collection");

        let mut loader = isolated_loader(Vec::new());
        let result = loader.load_system_config();

        std::env::remove_var("FTIMER_TIMER__SETTING_DWELL_MS");
        std::env::remove_var("FTIMER_DETECTION__SOURCE");
        std::env::remove_var("FTIMER_SYSTEM__MODE");

        let config = result.unwrap();
        assert_eq!(config.timer.setting_dwell_ms, 2500);
        assert_eq!(config.detection.source, DecisionSource::Model);
        assert_eq!(config.system.mode, OperatingMode::DataCollection);
    }

    #[test]
    fn test_override_without_separator_is_ignored() {
        let mut merged = ConfigLoader::default_value().unwrap();
        let before = merged.clone();
        apply_environment_overrides(
            &mut merged,
            vec![("FTIMER_TIMER_SETTING_DWELL_MS".to_string(), "1".to_string())],
        );
        assert_eq!(merged, before);
    }

    #[test]
    fn test_env_value_parsing() {
        assert_eq!(parse_env_value("42"), toml::Value::Integer(42));
        assert_eq!(parse_env_value("0.5"), toml::Value::Float(0.5));
        assert_eq!(parse_env_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_env_value("debug"), toml::Value::String("debug".to_string()));
    }

    #[test]
    fn test_config_export_round_trips_through_loader() {
        let loader = isolated_loader(Vec::new());
        let temp_file = NamedTempFile::new().unwrap();

        loader.export_config(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[timer]"));
        assert!(loader.validate_config_file(temp_file.path()).is_ok());
    }
}
