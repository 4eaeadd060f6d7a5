//! YAML configuration loading for the triage server.
//!
//! Loads [`TriageConfig`] from a YAML file on disk, falling back to defaults
//! when no file is specified. Every field is optional in the file.

use std::path::{Path, PathBuf};

use triage_core::{TriageConfig, TriageError};

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_ENV_VAR: &str = "TRIAGE_CONFIG";

/// Load a [`TriageConfig`] from a YAML file at `path` and validate it.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the YAML is invalid, or a
/// value is out of range.
pub fn load_config(path: &Path) -> anyhow::Result<TriageConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: TriageConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    validate_config(&config)?;
    Ok(config)
}

/// Resolve the config path: first CLI argument, then [`CONFIG_ENV_VAR`].
#[must_use]
pub fn config_path_from_env() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .map(PathBuf::from)
}

/// Load the config from `path`, or return defaults when `path` is `None`.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<TriageConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(TriageConfig::default()),
    }
}

/// Check value ranges that serde cannot express.
///
/// # Errors
///
/// Returns [`TriageError::Config`] naming the first offending field.
pub fn validate_config(config: &TriageConfig) -> Result<(), TriageError> {
    let threshold = config.classifier.confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TriageError::Config(format!(
            "classifier.confidence_threshold must be within [0, 1], got {threshold}"
        )));
    }
    if config.classifier.max_iter == 0 {
        return Err(TriageError::Config(
            "classifier.max_iter must be greater than 0".to_string(),
        ));
    }
    let learning_rate = config.classifier.learning_rate;
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(TriageError::Config(format!(
            "classifier.learning_rate must be a positive number, got {learning_rate}"
        )));
    }
    let weight_decay = config.classifier.weight_decay;
    if !(weight_decay.is_finite() && weight_decay >= 0.0) {
        return Err(TriageError::Config(format!(
            "classifier.weight_decay must be non-negative, got {weight_decay}"
        )));
    }
    if config.sentiment.timeout_ms == 0 {
        return Err(TriageError::Config(
            "sentiment.timeout_ms must be greater than 0".to_string(),
        ));
    }
    if config.circuit_breaker.failure_threshold == 0 {
        return Err(TriageError::Config(
            "circuit_breaker.failure_threshold must be greater than 0".to_string(),
        ));
    }
    if config.circuit_breaker.half_open_max_calls == 0 {
        return Err(TriageError::Config(
            "circuit_breaker.half_open_max_calls must be greater than 0".to_string(),
        ));
    }
    if !matches!(config.logging.format.as_str(), "text" | "json") {
        return Err(TriageError::Config(format!(
            "logging.format must be \"text\" or \"json\", got {:?}",
            config.logging.format
        )));
    }
    if config.listen_addr.trim().is_empty() {
        return Err(TriageError::Config("listen_addr must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use triage_core::SentimentBackend;

    /// Helper to write YAML to a temp file and return the handle.
    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_config_full() {
        let yaml = r#"
listen_addr: "127.0.0.1:9090"
model_path: "/var/lib/triage/classifier.json"
classifier:
  confidence_threshold: 0.4
  max_iter: 500
  learning_rate: 0.05
sentiment:
  enabled: false
  timeout_ms: 750
  backend: transformer
  cache_dir: "/var/cache/triage"
circuit_breaker:
  enabled: true
  failure_threshold: 3
  recovery_timeout_ms: 10000
  half_open_max_calls: 2
logging:
  level: "debug"
  format: "json"
"#;
        let f = write_yaml(yaml);
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(
            config.model_path.as_deref(),
            Some("/var/lib/triage/classifier.json")
        );
        assert!((config.classifier.confidence_threshold - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.classifier.max_iter, 500);
        assert!(!config.sentiment.enabled);
        assert_eq!(config.sentiment.timeout_ms, 750);
        assert_eq!(config.sentiment.backend, SentimentBackend::Transformer);
        assert_eq!(config.sentiment.cache_dir.as_deref(), Some("/var/cache/triage"));
        assert!((config.classifier.learning_rate - 0.05).abs() < f64::EPSILON);
        assert!((config.classifier.weight_decay - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.half_open_max_calls, 2);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_partial_uses_defaults() {
        let f = write_yaml("listen_addr: \"127.0.0.1:8001\"\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8001");
        assert!((config.classifier.confidence_threshold - 0.25).abs() < f64::EPSILON);
        assert!(config.sentiment.enabled);
        assert_eq!(config.circuit_breaker.recovery_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_config_null_model_path_disables_persistence() {
        let f = write_yaml("model_path: null\n");
        let config = load_config(f.path()).unwrap();
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/triage.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let f = write_yaml("not: [valid: yaml: {{{}}}");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_load_config_rejects_out_of_range_threshold() {
        let f = write_yaml("classifier:\n  confidence_threshold: 1.5\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = TriageConfig::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(TriageError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = TriageConfig::default();
        config.sentiment.timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_optimizer_settings() {
        let mut config = TriageConfig::default();
        config.classifier.learning_rate = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = TriageConfig::default();
        config.classifier.weight_decay = -0.1;
        assert!(validate_config(&config).is_err());

        let mut config = TriageConfig::default();
        config.classifier.weight_decay = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
    }
}
