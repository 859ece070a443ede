//! Bounded-concurrency batch queue.
//!
//! [`TaskQueueProcessor`] drains an ordered task list in consecutive
//! batches. Tasks inside a batch run concurrently; the next batch starts
//! only after every handler of the current one has settled and the
//! inter-batch delay has elapsed. A failing task never stops the queue.

mod events;
mod options;
mod processor;
mod sizing;

pub use events::{BatchProgress, BatchSummary, HandlerError, QueueError, QueueEvent};
pub use options::{BatchOptions, QueueConfig};
pub use processor::TaskQueueProcessor;
pub use sizing::batch_size_for;

#[cfg(test)]
mod tests;
