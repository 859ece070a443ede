//! Token-bucket rate limiting per provider family.
//!
//! [`TokenBucket`] holds the pure refill arithmetic; [`RateLimiter`] owns a
//! bucket behind a mutex and reads time from an injected clock;
//! [`RateLimiterRegistry`] keeps one shared limiter per
//! [`ProviderFamily`](crate::provider::domain::ProviderFamily).

mod bucket;
mod config;
mod limiter;

pub use bucket::TokenBucket;
pub use config::{RateLimitConfig, RateLimitConfigError};
pub use limiter::{MIN_POLL_INTERVAL, RateLimitError, RateLimiter, RateLimiterRegistry};

#[cfg(test)]
mod tests;
