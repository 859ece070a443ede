//! Exponential-backoff retry around a single provider call.

use crate::provider::domain::{ProviderError, ProviderErrorKind, ProviderResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Randomise each delay between half and all of its nominal value.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Creates a configuration without jitter.
    #[must_use]
    pub fn fixed(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay_ms: duration_millis(base_delay),
            max_delay_ms: duration_millis(max_delay),
            jitter: false,
        }
    }

    /// Returns the base delay.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Returns the delay ceiling.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError {
    /// Recoverable errors persisted through every retry.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: ProviderError,
    },
    /// The operation failed with an error retries cannot fix.
    #[error("non-recoverable failure on attempt {attempts}: {error}")]
    NonRecoverable {
        /// Attempts made.
        attempts: u32,
        /// The error that stopped the loop.
        error: ProviderError,
    },
    /// Cancellation was observed.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl RetryError {
    /// Returns the number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRecoverable { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Retries recoverable failures with capped exponential backoff.
///
/// The delay before retry `n` (zero-based) is
/// `min(base_delay * 2^n, max_delay)`, raised to any provider-signalled
/// `Retry-After`, then optionally jittered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the policy configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the nominal (unjittered) delay before retry `attempt`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self
            .config
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.config.max_delay_ms);
        Duration::from_millis(millis)
    }

    fn backoff(&self, attempt: u32, error: &ProviderError) -> Duration {
        let nominal = self.delay_for_attempt(attempt);
        let delay = error
            .retry_after()
            .map_or(nominal, |hint| nominal.max(hint).min(self.config.max_delay()));
        if !self.config.jitter {
            return delay;
        }
        let half = delay.checked_div(2).unwrap_or(delay);
        let spread = duration_millis(delay.saturating_sub(half));
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }

    /// Runs `operation` until it succeeds, fails non-recoverably, exhausts
    /// the retry budget, or observes cancellation.
    ///
    /// `operation` receives the zero-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError`] describing why the loop stopped.
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            let attempts = attempt.saturating_add(1);

            if error.kind() == ProviderErrorKind::Cancelled {
                return Err(RetryError::Cancelled { attempts });
            }
            if !error.kind().is_retryable() {
                return Err(RetryError::NonRecoverable { attempts, error });
            }
            if attempt >= self.config.max_retries {
                return Err(RetryError::Exhausted {
                    attempts,
                    last: error,
                });
            }

            let delay = self.backoff(attempt, &error);
            warn!(
                attempt = attempts,
                delay_ms = duration_millis(delay),
                error = %error,
                "recoverable provider error, backing off"
            );
            tokio::select! {
                () = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
                () = tokio::time::sleep(delay) => {}
            }
            attempt = attempts;
        }
    }
}
