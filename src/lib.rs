//! Atelier: generation task orchestration.
//!
//! This crate drives batches of image and video generation tasks against
//! third-party providers with different rate limits, latencies, and failure
//! modes, and keeps results durable across process interruption.
//!
//! # Architecture
//!
//! Atelier follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types and state machines with no infrastructure
//!   dependencies
//! - **Ports**: Abstract trait interfaces for providers and persistence
//! - **Adapters**: In-memory and file-backed implementations of the ports
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`task`]: Tasks, outcomes, and failure classification
//! - [`rate_limit`]: Discrete token buckets per provider family
//! - [`provider`]: Provider contracts, retry, and fallback dispatch
//! - [`queue`]: Bounded, paced, cancellable batch processing
//! - [`ledger`]: Durable record of long-running operations and crash recovery
//! - [`run`]: Durable, incrementally updated batch results
//! - [`generation`]: The end-to-end batch flow
//! - [`config`]: Aggregate configuration
//! - [`storage`]: Atomic JSON record directories

pub mod config;
pub mod generation;
pub mod ledger;
pub mod provider;
pub mod queue;
pub mod rate_limit;
pub mod run;
pub mod storage;
pub mod task;

#[cfg(test)]
mod test_support;
