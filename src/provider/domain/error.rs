//! Classified provider errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors returned while constructing provider values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderDomainError {
    /// The provider identifier is empty or contains whitespace.
    #[error("invalid provider identifier '{0}'")]
    InvalidProviderId(String),
}

/// Error returned while parsing provider families.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown provider family: {0}")]
pub struct ParseProviderFamilyError(pub String);

/// How the orchestration layer should react to a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Rate limited, 5xx, or timed out. Retried with backoff.
    Recoverable,
    /// The provider answered but produced nothing usable (for example a
    /// safety refusal). Triggers the fallback chain.
    NoUsableOutput,
    /// Bad credentials, invalid input, exhausted quota. Surfaces at once.
    Fatal,
    /// The call observed cancellation.
    Cancelled,
    /// The durable ledger backing the call is unavailable.
    StorageUnavailable,
}

impl ProviderErrorKind {
    /// Classifies an upstream HTTP status code.
    ///
    /// Request timeouts, throttling, and server errors are recoverable;
    /// everything else is fatal.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            408 | 429 | 500..=599 => Self::Recoverable,
            _ => Self::Fatal,
        }
    }

    /// Returns `true` when the retry policy may repeat the call.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns `true` when the dispatcher may try a fallback provider.
    #[must_use]
    pub const fn triggers_fallback(self) -> bool {
        matches!(self, Self::NoUsableOutput)
    }

    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::NoUsableOutput => "no_usable_output",
            Self::Fatal => "fatal",
            Self::Cancelled => "cancelled",
            Self::StorageUnavailable => "storage_unavailable",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a provider adapter, already classified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retry_after: Option<Duration>,
}

impl ProviderError {
    /// Creates a classified error.
    #[must_use]
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Creates a recoverable error.
    #[must_use]
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Recoverable, message)
    }

    /// Creates a no-usable-output error.
    #[must_use]
    pub fn no_usable_output(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::NoUsableOutput, message)
    }

    /// Creates a fatal error.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Fatal, message)
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ProviderErrorKind::Cancelled, "cancelled")
    }

    /// Creates a storage error for ledger write failures.
    #[must_use]
    pub fn storage(err: &dyn std::error::Error) -> Self {
        Self::new(ProviderErrorKind::StorageUnavailable, err.to_string())
    }

    /// Classifies an HTTP failure by status code.
    #[must_use]
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::from_http_status(status), message)
    }

    /// Records a provider-signalled minimum wait before retrying.
    #[must_use]
    pub const fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Returns the classification.
    #[must_use]
    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    /// Returns the error text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider-signalled retry delay, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;
