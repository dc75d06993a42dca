use std::path::Path;

use serde::{Deserialize, Serialize};

use revise_store::RetryPolicy;

use crate::error::ConfigError;

/// Configuration for the update resolver.
///
/// Loaded from TOML; every key is optional:
///
/// ```toml
/// conditional_writes = false
///
/// [retry]
/// max_attempts = 3
/// initial_backoff_ms = 50
/// max_backoff_ms = 2000
/// multiplier = 2.0
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Persist through the store's compare-and-set primitive, keyed on the
    /// version observed while resolving. When `false`, a write that lands
    /// between resolution and persistence is overwritten.
    pub conditional_writes: bool,
    /// Retry schedule applied when the resolver is built with
    /// [`crate::UpdateResolver::with_retry`].
    pub retry: RetryPolicy,
}

impl ResolverConfig {
    /// Configuration that requires conditional writes.
    pub fn hardened() -> Self {
        Self {
            conditional_writes: true,
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Reject settings the retry wrapper cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be at least 1.0".into(),
            ));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.max_backoff_ms must not be below retry.initial_backoff_ms".into(),
            ));
        }
        Ok(())
    }
}
