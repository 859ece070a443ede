//! Batch sizing, pacing, and cancellation options.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Queue pacing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Minimum spacing between batch starts, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Fixed batch width. When absent, the width is derived from the queue
    /// length and provider family.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

const fn default_batch_delay_ms() -> u64 {
    1_000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_delay_ms: default_batch_delay_ms(),
            batch_size: None,
        }
    }
}

impl QueueConfig {
    /// Returns the inter-batch delay.
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Options for one [`process`](super::TaskQueueProcessor::process) call.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    batch_size: usize,
    batch_delay: Duration,
    cancel: CancellationToken,
}

impl BatchOptions {
    /// Creates options with a fresh cancellation token.
    ///
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` as the cooperative cancellation signal.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the batch width.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the minimum spacing between batch starts.
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
