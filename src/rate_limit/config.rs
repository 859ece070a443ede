//! Token-bucket configuration.

use crate::provider::domain::ProviderFamily;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Token-bucket settings for one provider family.
///
/// # Examples
///
/// ```
/// use atelier::rate_limit::RateLimitConfig;
/// use std::time::Duration;
///
/// let config = RateLimitConfig::default();
/// assert_eq!(config.capacity, 20);
/// assert_eq!(config.refill_interval(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens granted per refill interval; also the bucket ceiling.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Length of one refill interval in milliseconds.
    #[serde(default = "default_refill_interval_ms")]
    pub refill_interval_ms: u64,
}

const fn default_capacity() -> u32 {
    20
}

const fn default_refill_interval_ms() -> u64 {
    10_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_interval_ms: default_refill_interval_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Creates a configuration from a capacity and interval.
    #[must_use]
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval_ms: u64::try_from(refill_interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns the default quota for a provider family.
    #[must_use]
    pub const fn for_family(family: ProviderFamily) -> Self {
        match family {
            ProviderFamily::Image => Self {
                capacity: 20,
                refill_interval_ms: 10_000,
            },
            ProviderFamily::Video => Self {
                capacity: 5,
                refill_interval_ms: 10_000,
            },
            ProviderFamily::Training => Self {
                capacity: 2,
                refill_interval_ms: 60_000,
            },
        }
    }

    /// Returns the refill interval.
    #[must_use]
    pub const fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }

    /// Checks that the bucket can ever grant a token.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitConfigError`] for a zero capacity, or an interval
    /// that is zero or too large to represent.
    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        if self.capacity == 0 {
            return Err(RateLimitConfigError::ZeroCapacity);
        }
        if self.refill_interval_ms == 0 {
            return Err(RateLimitConfigError::ZeroInterval);
        }
        if i64::try_from(self.refill_interval_ms).is_err() {
            return Err(RateLimitConfigError::IntervalOutOfRange(self.refill_interval_ms));
        }
        Ok(())
    }
}

/// Invalid token-bucket configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateLimitConfigError {
    /// The bucket holds no tokens.
    #[error("rate limit capacity must be positive")]
    ZeroCapacity,
    /// The refill interval is zero.
    #[error("rate limit refill interval must be positive")]
    ZeroInterval,
    /// The refill interval does not fit the timestamp arithmetic.
    #[error("rate limit refill interval {0}ms is out of range")]
    IntervalOutOfRange(u64),
}
