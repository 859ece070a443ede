//! Aggregate orchestration configuration.
//!
//! Every section has per-field defaults, so an empty JSON object is a valid
//! configuration. Durations are expressed in milliseconds.

mod error;

pub use error::ConfigError;

use crate::ledger::services::PollConfig;
use crate::provider::domain::ProviderFamily;
use crate::provider::services::{DispatchConfig, RetryConfig};
use crate::queue::QueueConfig;
use crate::rate_limit::RateLimitConfig;
use crate::run::services::ResultConfig;
use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Settings for every orchestration component.
///
/// # Examples
///
/// ```
/// use atelier::config::OrchestrationConfig;
/// use atelier::provider::domain::ProviderFamily;
///
/// let config = OrchestrationConfig::from_json_str(
///     r#"{ "rate_limits": { "video": { "capacity": 3 } }, "queue": { "batch_size": 2 } }"#,
/// )
/// .unwrap();
/// assert_eq!(config.rate_limit(ProviderFamily::Video).capacity, 3);
/// assert_eq!(config.queue.batch_size, Some(2));
/// assert_eq!(config.polling.max_attempts, 120);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Token-bucket overrides per family. Families without an entry use
    /// [`RateLimitConfig::for_family`].
    #[serde(default)]
    pub rate_limits: HashMap<ProviderFamily, RateLimitConfig>,
    /// Backoff for recoverable provider errors.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-call limits.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Batch pacing.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Long-running operation polling.
    #[serde(default)]
    pub polling: PollConfig,
    /// Result store behaviour.
    #[serde(default)]
    pub results: ResultConfig,
}

impl OrchestrationConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and the validation
    /// errors of [`validate`](Self::validate).
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates `file` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`from_json_str`](Self::from_json_str).
    pub fn load(dir: &Dir, file: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = dir.read_to_string(file).map_err(|source| ConfigError::Read {
            path: file.to_owned(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Returns the effective rate limit for a family.
    #[must_use]
    pub fn rate_limit(&self, family: ProviderFamily) -> RateLimitConfig {
        self.rate_limits
            .get(&family)
            .copied()
            .unwrap_or_else(|| RateLimitConfig::for_family(family))
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RateLimit`] for an unusable bucket and
    /// [`ConfigError::Invalid`] for any other out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (family, limit) in &self.rate_limits {
            limit.validate().map_err(|source| ConfigError::RateLimit {
                family: *family,
                source,
            })?;
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(invalid("retry.max_delay_ms", "must not be below base_delay_ms"));
        }
        if self.dispatch.call_timeout_ms == 0 {
            return Err(invalid("dispatch.call_timeout_ms", "must be positive"));
        }
        if self.queue.batch_size == Some(0) {
            return Err(invalid("queue.batch_size", "must be positive when set"));
        }
        if self.polling.interval_ms == 0 {
            return Err(invalid("polling.interval_ms", "must be positive"));
        }
        if self.polling.max_attempts == 0 {
            return Err(invalid("polling.max_attempts", "must be positive"));
        }
        if self.polling.call_timeout_ms == 0 {
            return Err(invalid("polling.call_timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

const fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests;
