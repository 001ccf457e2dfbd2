//! Retry configuration loaded from TOML.
//!
//! ```toml
//! [default]
//! max_attempts = 3
//! initial_delay_ms = 1000
//! backoff_factor = 2.0
//!
//! [policies.text-generation]
//! max_attempts = 5
//! jitter = 0.2
//! max_delay_ms = 30000
//! ```
//!
//! Every field is optional and falls back to the executor defaults. Values
//! go through [`RetryPolicy::new`], so a negative `max_attempts` is rejected
//! here rather than silently accepted.

use crate::RetryPolicy;
use crate::error::PolicyError;
use crate::policy::{PolicyRegistry, register_global_policy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading retry configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read retry config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML was malformed or had unknown fields.
    #[error("failed to parse retry config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A policy section held invalid values.
    #[error("invalid retry policy '{name}': {source}")]
    Policy {
        /// Section name (`default` for the default policy).
        name: String,
        /// Validation failure.
        #[source]
        source: PolicyError,
    },
}

/// Raw policy parameters as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Retries after the first attempt. Signed so negative input can be
    /// reported instead of failing to parse.
    pub max_attempts: i64,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Delay growth factor per retry.
    pub backoff_factor: f64,
    /// Jitter factor in `[0, 1]`; `0` disables jitter.
    pub jitter: f64,
    /// Optional delay cap, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: i64::from(RetryPolicy::DEFAULT_MAX_ATTEMPTS),
            initial_delay_ms: RetryPolicy::DEFAULT_INITIAL_DELAY.as_millis() as u64,
            backoff_factor: RetryPolicy::DEFAULT_BACKOFF_FACTOR,
            jitter: 0.0,
            max_delay_ms: None,
        }
    }
}

impl TryFrom<&PolicyConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(config: &PolicyConfig) -> Result<Self, Self::Error> {
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            config.backoff_factor,
        )?
        .with_jitter(config.jitter)?;

        match config.max_delay_ms {
            Some(ms) => policy.with_max_delay(Duration::from_millis(ms)),
            None => Ok(policy),
        }
    }
}

/// Top-level retry configuration: a default policy plus named overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Policy used when a call site names none.
    pub default: PolicyConfig,
    /// Named policies, typically one per external provider.
    pub policies: BTreeMap<String, PolicyConfig>,
}

impl RetryConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    /// Validated default policy.
    pub fn default_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::try_from(&self.default).map_err(|source| ConfigError::Policy {
            name: "default".to_string(),
            source,
        })
    }

    /// Validate every section into a registry.
    ///
    /// The default policy is registered under `"default"` unless a named
    /// policy of that name overrides it.
    pub fn to_registry(&self) -> Result<PolicyRegistry, ConfigError> {
        let mut registry = PolicyRegistry::new();
        registry.register("default", self.default_policy()?);

        for (name, section) in &self.policies {
            let policy = RetryPolicy::try_from(section).map_err(|source| ConfigError::Policy {
                name: name.clone(),
                source,
            })?;
            registry.register(name.clone(), policy);
        }

        Ok(registry)
    }

    /// Validate every section and publish it to the global registry.
    ///
    /// Nothing is registered when any section is invalid. Returns the number
    /// of policies registered.
    pub fn install_global(&self) -> Result<usize, ConfigError> {
        let registry = self.to_registry()?;
        let entries = registry.all();
        let count = entries.len();
        for (name, policy) in entries {
            register_global_policy(name, policy);
        }
        tracing::debug!(count, "installed retry policies");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::get_global_policy;

    #[test]
    fn test_default_config_values() {
        let cfg = RetryConfig::default();
        let policy = cfg.default_policy().unwrap();

        assert_eq!(policy, RetryPolicy::default());
        assert!(cfg.policies.is_empty());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg = RetryConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, RetryConfig::default());
    }

    #[test]
    fn test_toml_custom_values() {
        let toml = r#"
            [default]
            max_attempts = 2
            initial_delay_ms = 250

            [policies.text-generation]
            max_attempts = 5
            backoff_factor = 3.0
            jitter = 0.2
            max_delay_ms = 30000

            [policies.webhook]
            max_attempts = 0
        "#;
        let cfg = RetryConfig::from_toml_str(toml).unwrap();

        let default = cfg.default_policy().unwrap();
        assert_eq!(default.max_attempts(), 2);
        assert_eq!(default.initial_delay(), Duration::from_millis(250));
        assert_eq!(default.backoff_factor(), 2.0);

        let registry = cfg.to_registry().unwrap();
        assert_eq!(registry.len(), 3);

        let text = registry.get("text-generation").unwrap();
        assert_eq!(text.max_attempts(), 5);
        assert_eq!(text.initial_delay(), Duration::from_millis(1000));
        assert_eq!(text.backoff_factor(), 3.0);
        assert_eq!(text.jitter(), 0.2);
        assert_eq!(text.max_delay(), Some(Duration::from_secs(30)));

        assert_eq!(registry.get("webhook").unwrap().max_attempts(), 0);
    }

    #[test]
    fn test_negative_max_attempts_rejected() {
        let toml = r#"
            [policies.embedding]
            max_attempts = -1
        "#;
        let cfg = RetryConfig::from_toml_str(toml).unwrap();

        match cfg.to_registry() {
            Err(ConfigError::Policy { name, source }) => {
                assert_eq!(name, "embedding");
                assert_eq!(source, PolicyError::NegativeMaxAttempts(-1));
            }
            other => panic!("expected policy error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_initial_delay_rejected_in_default() {
        let cfg = RetryConfig::from_toml_str("[default]\ninitial_delay_ms = 0\n").unwrap();
        assert!(matches!(
            cfg.default_policy(),
            Err(ConfigError::Policy {
                source: PolicyError::ZeroInitialDelay,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RetryConfig::from_toml_str("[default]\nretries = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut cfg = RetryConfig::default();
        cfg.policies.insert(
            "voice-calls".to_string(),
            PolicyConfig {
                max_attempts: 4,
                ..PolicyConfig::default()
            },
        );

        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(RetryConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RetryConfig::load("/nonexistent/backoff-executor/retry.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_install_global() {
        let toml = r#"
            [policies.config-test-install]
            max_attempts = 6
        "#;
        let cfg = RetryConfig::from_toml_str(toml).unwrap();

        assert_eq!(cfg.install_global().unwrap(), 2);
        assert_eq!(
            get_global_policy("config-test-install")
                .unwrap()
                .max_attempts(),
            6
        );
    }
}
