//! Discrete token bucket.
//!
//! Refills are computed lazily from elapsed time. Only whole intervals grant
//! tokens: half an interval grants nothing, a full one refills the bucket.
//! `last_refill` advances by the whole intervals consumed rather than to
//! `now`, so partial-interval credit carries over to the next query.

use super::{RateLimitConfig, RateLimitConfigError};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Pure token-bucket state; callers supply the current time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBucket {
    capacity: u32,
    interval: TimeDelta,
    tokens: u32,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    /// Creates a full bucket whose first interval starts at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitConfigError`] when the configuration is invalid.
    pub fn new(config: RateLimitConfig, now: DateTime<Utc>) -> Result<Self, RateLimitConfigError> {
        config.validate()?;
        let interval_ms = i64::try_from(config.refill_interval_ms)
            .map_err(|_| RateLimitConfigError::IntervalOutOfRange(config.refill_interval_ms))?;
        let interval = TimeDelta::try_milliseconds(interval_ms)
            .ok_or(RateLimitConfigError::IntervalOutOfRange(config.refill_interval_ms))?;
        Ok(Self {
            capacity: config.capacity,
            interval,
            tokens: config.capacity,
            last_refill: now,
        })
    }

    /// Returns the bucket ceiling.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the start of the current refill interval.
    #[must_use]
    pub const fn last_refill(&self) -> DateTime<Utc> {
        self.last_refill
    }

    /// Credits every whole interval elapsed since `last_refill`.
    pub fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed_ms = now.signed_duration_since(self.last_refill).num_milliseconds();
        let interval_ms = self.interval.num_milliseconds();
        let intervals = elapsed_ms.checked_div(interval_ms).unwrap_or(0);
        if intervals < 1 {
            return;
        }

        let grant = u32::try_from(intervals)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.capacity);
        self.tokens = self.tokens.saturating_add(grant).min(self.capacity);

        let advance = TimeDelta::try_milliseconds(interval_ms.saturating_mul(intervals))
            .unwrap_or(TimeDelta::MAX);
        self.last_refill = self
            .last_refill
            .checked_add_signed(advance)
            .unwrap_or(now);
    }

    /// Takes one token if available.
    pub fn try_consume(&mut self, now: DateTime<Utc>) -> bool {
        self.refill(now);
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }

    /// Returns the tokens available at `now`.
    pub fn available(&mut self, now: DateTime<Utc>) -> u32 {
        self.refill(now);
        self.tokens
    }

    /// Returns how long until a token can be taken; zero when one is
    /// available now.
    pub fn time_until_next_token(&mut self, now: DateTime<Utc>) -> Duration {
        self.refill(now);
        if self.tokens > 0 {
            return Duration::ZERO;
        }
        let next_refill = self
            .last_refill
            .checked_add_signed(self.interval)
            .unwrap_or(now);
        next_refill
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
