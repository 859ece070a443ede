//! Shared, mutex-serialized rate limiters.

use super::{RateLimitConfig, RateLimitConfigError, TokenBucket};
use crate::provider::domain::ProviderFamily;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Shortest sleep between token checks in [`RateLimiter::consume_blocking`].
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors returned while waiting for a token.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// The wait was cancelled before a token became available.
    #[error("cancelled while waiting for a rate-limit token")]
    Cancelled,
}

/// Token-bucket gate for one provider family.
///
/// Every query reads the injected clock and updates the bucket under a
/// mutex, so concurrent tasks serialize their token accounting.
#[derive(Debug)]
pub struct RateLimiter<C: Clock> {
    family: ProviderFamily,
    bucket: Mutex<TokenBucket>,
    clock: Arc<C>,
}

impl<C: Clock> RateLimiter<C> {
    /// Creates a limiter with a full bucket.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitConfigError`] when the configuration is invalid.
    pub fn new(
        family: ProviderFamily,
        config: RateLimitConfig,
        clock: Arc<C>,
    ) -> Result<Self, RateLimitConfigError> {
        let bucket = TokenBucket::new(config, clock.utc())?;
        Ok(Self {
            family,
            bucket: Mutex::new(bucket),
            clock,
        })
    }

    /// Returns the family this limiter gates.
    #[must_use]
    pub const fn family(&self) -> ProviderFamily {
        self.family
    }

    fn with_bucket<T>(&self, f: impl FnOnce(&mut TokenBucket, DateTime<Utc>) -> T) -> T {
        let now = self.clock.utc();
        // The guarded state is a counter and a timestamp; a panic elsewhere
        // cannot leave it half-written.
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut bucket, now)
    }

    /// Takes a token if one is available.
    #[must_use]
    pub fn try_consume(&self) -> bool {
        self.with_bucket(|bucket, now| bucket.try_consume(now))
    }

    /// Returns the number of tokens available now.
    #[must_use]
    pub fn available_tokens(&self) -> u32 {
        self.with_bucket(|bucket, now| bucket.available(now))
    }

    /// Returns how long until a token is available.
    #[must_use]
    pub fn time_until_next_token(&self) -> Duration {
        self.with_bucket(|bucket, now| bucket.time_until_next_token(now))
    }

    /// Waits until a token is available, then takes it.
    ///
    /// Sleeps for the remaining wait, never less than
    /// [`MIN_POLL_INTERVAL`], between checks.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Cancelled`] when `cancel` fires first.
    pub async fn consume_blocking(&self, cancel: &CancellationToken) -> Result<(), RateLimitError> {
        loop {
            if cancel.is_cancelled() {
                return Err(RateLimitError::Cancelled);
            }
            let wait = self.with_bucket(|bucket, now| {
                if bucket.try_consume(now) {
                    None
                } else {
                    Some(bucket.time_until_next_token(now))
                }
            });
            let Some(remaining) = wait else {
                return Ok(());
            };

            let pause = remaining.max(MIN_POLL_INTERVAL);
            debug!(
                family = %self.family,
                wait_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                "waiting for rate-limit token"
            );
            tokio::select! {
                () = cancel.cancelled() => return Err(RateLimitError::Cancelled),
                () = tokio::time::sleep(pause) => {}
            }
        }
    }
}

/// One shared limiter per provider family.
#[derive(Debug)]
pub struct RateLimiterRegistry<C: Clock> {
    limiters: HashMap<ProviderFamily, Arc<RateLimiter<C>>>,
}

impl<C: Clock> RateLimiterRegistry<C> {
    /// Creates limiters for every family using the given overrides, falling
    /// back to [`RateLimitConfig::for_family`].
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitConfigError`] when an override is invalid.
    pub fn new<S: std::hash::BuildHasher>(
        overrides: &HashMap<ProviderFamily, RateLimitConfig, S>,
        clock: &Arc<C>,
    ) -> Result<Self, RateLimitConfigError> {
        let limiters = ProviderFamily::ALL
            .into_iter()
            .map(|family| {
                let config = overrides
                    .get(&family)
                    .copied()
                    .unwrap_or_else(|| RateLimitConfig::for_family(family));
                RateLimiter::new(family, config, Arc::clone(clock))
                    .map(|limiter| (family, Arc::new(limiter)))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(Self { limiters })
    }

    /// Creates limiters for every family with default quotas.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitConfigError`] if a built-in quota is invalid.
    pub fn with_defaults(clock: &Arc<C>) -> Result<Self, RateLimitConfigError> {
        Self::new(&HashMap::new(), clock)
    }

    /// Returns the limiter for a family.
    #[must_use]
    pub fn get(&self, family: ProviderFamily) -> Option<&Arc<RateLimiter<C>>> {
        self.limiters.get(&family)
    }
}
