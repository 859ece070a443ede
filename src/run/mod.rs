//! Durable, incrementally updated record of a batch's results.
//!
//! A [`domain::Run`] is created with one `generating` placeholder per task.
//! Outcomes are merged into their slot by task id as they arrive; the slot
//! list keeps its length and order under merging. Failed slots are shown
//! briefly and then pruned by [`services::ResultStore::prune_failed`].

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
