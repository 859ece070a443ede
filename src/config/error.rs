//! Configuration loading errors.

use crate::provider::domain::ProviderFamily;
use crate::rate_limit::RateLimitConfigError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// File that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[source] serde_json::Error),

    /// A family's rate limit can never grant a token.
    #[error("invalid rate limit for {family}: {source}")]
    RateLimit {
        /// Family whose limit is invalid.
        family: ProviderFamily,
        /// What is wrong with it.
        #[source]
        source: RateLimitConfigError,
    },

    /// A setting is outside its allowed range.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted path of the setting.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}
