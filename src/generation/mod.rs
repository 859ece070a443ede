//! End-to-end batch generation.
//!
//! [`GenerationService`] creates a run for a batch, drains the tasks through
//! the [`crate::queue::TaskQueueProcessor`] and the
//! [`crate::provider::services::ProviderDispatcher`], writes every outcome
//! into the run as soon as it settles, and schedules failed slots for
//! removal after the configured grace period.

mod error;
mod service;

pub use error::GenerationError;
pub use service::{BatchReport, BatchRequest, GenerationEvent, GenerationService};

#[cfg(test)]
mod tests;
