//! Runtime configuration.
//!
//! Loaded from YAML. Every field has a default, so an empty document yields
//! the built-in backend table with a 20 second attempt timeout:
//!
//! ```yaml
//! attempt_timeout: 15s
//! default_max_fallbacks: 2
//! quarantine:
//!   min_failures: 3
//!   max_failure_rate: 0.5
//! providers:
//!   openai:
//!     base_url: http://localhost:8080/v1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use switchyard_core::{
    builtin_profiles, BackendProfile, ProviderKind, QuarantinePolicy, DEFAULT_MAX_FALLBACKS,
};

use crate::providers::ProviderSettings;

/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound on a single provider invocation
    #[serde(with = "humantime_duration")]
    pub attempt_timeout: Duration,

    /// Fallbacks allowed when a request does not say
    pub default_max_fallbacks: u32,

    /// When a failing backend is pulled from rotation
    pub quarantine: QuarantinePolicy,

    /// Static backend profiles, in tie-break order
    pub backends: Vec<BackendProfile>,

    /// Per-kind provider settings
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            default_max_fallbacks: DEFAULT_MAX_FALLBACKS,
            quarantine: QuarantinePolicy::default(),
            backends: builtin_profiles(),
            providers: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Settings for `kind`, or the defaults.
    pub fn provider(&self, kind: ProviderKind) -> ProviderSettings {
        self.providers.get(&kind).cloned().unwrap_or_default()
    }

    /// Check ranges and key uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid("attempt_timeout must be greater than zero".into()));
        }

        validate_quarantine(&self.quarantine)?;

        let mut seen = HashSet::new();
        for profile in &self.backends {
            let key = profile.key.as_str();
            if !seen.insert(key) {
                return Err(ConfigError::Invalid(format!("duplicate backend key '{}'", key)));
            }
            if !(0.0..=10.0).contains(&profile.speed) {
                return Err(ConfigError::Invalid(format!("{}: speed must be in [0, 10]", key)));
            }
            if !(0.0..=10.0).contains(&profile.quality) {
                return Err(ConfigError::Invalid(format!("{}: quality must be in [0, 10]", key)));
            }
            if !(0.0..=1.0).contains(&profile.reliability) {
                return Err(ConfigError::Invalid(format!("{}: reliability must be in [0, 1]", key)));
            }
            if !(profile.cost_per_k_tokens >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{}: cost_per_k_tokens must be non-negative",
                    key
                )));
            }
            if profile.max_output_tokens == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{}: max_output_tokens must be greater than zero",
                    key
                )));
            }
        }

        Ok(())
    }
}

/// Reject quarantine policies that would pull a backend sooner than the
/// default rule. Stricter policies are fine.
pub fn validate_quarantine(policy: &QuarantinePolicy) -> Result<(), ConfigError> {
    let floor = QuarantinePolicy::default();

    if policy.min_failures < floor.min_failures {
        return Err(ConfigError::Invalid(format!(
            "quarantine.min_failures must be at least {}, got {}",
            floor.min_failures, policy.min_failures
        )));
    }
    if !(floor.max_failure_rate..=1.0).contains(&policy.max_failure_rate) {
        return Err(ConfigError::Invalid(format!(
            "quarantine.max_failure_rate must be in [{}, 1], got {}",
            floor.max_failure_rate, policy.max_failure_rate
        )));
    }
    Ok(())
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RuntimeConfig::from_yaml("{}").unwrap();
        assert_eq!(config.attempt_timeout, Duration::from_secs(20));
        assert_eq!(config.default_max_fallbacks, 3);
        assert_eq!(config.quarantine.min_failures, 3);
        assert_eq!(config.backends.len(), 8);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_parse_overrides() {
        let yaml = r#"
attempt_timeout: 1m 30s
default_max_fallbacks: 1
quarantine:
  min_failures: 5
providers:
  openai:
    base_url: http://localhost:8080/v1
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.attempt_timeout, Duration::from_secs(90));
        assert_eq!(config.default_max_fallbacks, 1);
        assert_eq!(config.quarantine.min_failures, 5);
        assert_eq!(config.quarantine.max_failure_rate, 0.5);
        assert_eq!(
            config.provider(ProviderKind::OpenAi).base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(config.provider(ProviderKind::Groq), ProviderSettings::default());
    }

    #[test]
    fn test_custom_backends_replace_builtin_table() {
        let yaml = r#"
backends:
  - key: local/llama
    name: Local Llama
    kind: openai
    model: llama-3-8b
    speed: 9.0
    quality: 6.0
    reliability: 0.8
    cost_per_k_tokens: 0.0
    task_specialties: [general, sentiment]
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].max_output_tokens, 8192);
        assert_eq!(config.backends[0].kind, ProviderKind::OpenAi);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RuntimeConfig::default();
        config.attempt_timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = RuntimeConfig::default();
        config.backends[0].reliability = 1.5;
        assert!(config.validate().unwrap_err().to_string().contains("reliability"));

        let mut config = RuntimeConfig::default();
        config.backends[1].cost_per_k_tokens = -0.1;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        let dup = config.backends[0].clone();
        config.backends.push(dup);
        assert!(config.validate().unwrap_err().to_string().contains("duplicate"));
    }

    #[test]
    fn test_quarantine_cannot_be_loosened() {
        let err = RuntimeConfig::from_yaml("quarantine:\n  min_failures: 0\n").unwrap_err();
        assert!(err.to_string().contains("min_failures"));

        let err = RuntimeConfig::from_yaml("quarantine:\n  max_failure_rate: 0.2\n").unwrap_err();
        assert!(err.to_string().contains("max_failure_rate"));

        assert!(RuntimeConfig::from_yaml("quarantine:\n  max_failure_rate: 1.5\n").is_err());

        // Stricter than the default is allowed
        let config =
            RuntimeConfig::from_yaml("quarantine:\n  min_failures: 10\n  max_failure_rate: 0.9\n").unwrap();
        assert_eq!(config.quarantine.min_failures, 10);
    }

    #[test]
    fn test_bad_duration_is_parse_error() {
        let err = RuntimeConfig::from_yaml("attempt_timeout: soon").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RuntimeConfig::from_yaml_file("/nonexistent/switchyard.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_serialize_round_trips_timeout() {
        let yaml = serde_yaml::to_string(&RuntimeConfig::default()).unwrap();
        assert!(yaml.contains("attempt_timeout: 20s"));
    }
}
