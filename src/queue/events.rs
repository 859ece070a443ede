//! Events and summaries emitted while a queue drains.

use crate::task::domain::Task;
use std::fmt;
use thiserror::Error;

/// How a handler can decline to produce output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError<E> {
    /// The task failed.
    Failed(E),
    /// The task observed cancellation. Counted separately from failures.
    Cancelled,
}

/// Failure reported for one task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError<E: fmt::Display> {
    /// The handler returned an error.
    #[error("{0}")]
    Handler(E),
    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Progress counters sent after every settled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Tasks settled so far, across all batches.
    pub completed: usize,
    /// Tasks in the queue.
    pub total: usize,
    /// Zero-based index of the batch the settled task belonged to.
    pub batch_index: usize,
    /// Number of batches in the queue.
    pub total_batches: usize,
}

/// Tagged event emitted on the processor's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent<O, E: fmt::Display> {
    /// A task settled.
    Progress(BatchProgress),
    /// A handler produced output.
    Result {
        /// The task.
        task: Task,
        /// Handler output.
        output: O,
    },
    /// A handler failed or panicked.
    Error {
        /// The task.
        task: Task,
        /// What went wrong.
        error: QueueError<E>,
    },
    /// A dispatched task observed cancellation.
    Cancelled {
        /// The task.
        task: Task,
    },
}

/// Aggregate counts for one processed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Tasks in the queue.
    pub total: usize,
    /// Handlers that produced output.
    pub succeeded: usize,
    /// Handlers that failed or panicked.
    pub failed: usize,
    /// Dispatched handlers that observed cancellation.
    pub cancelled: usize,
    /// Tasks never handed to the handler.
    pub not_dispatched: usize,
    /// `true` when the cancellation signal stopped scheduling.
    pub was_cancelled: bool,
}

impl BatchSummary {
    /// Returns the number of handlers invoked.
    #[must_use]
    pub const fn dispatched(&self) -> usize {
        self.total.saturating_sub(self.not_dispatched)
    }
}
