//! Durable ledger of long-running provider operations.
//!
//! A [`domain::PendingRequest`] is written before the external create call
//! is issued and updated on every poll. After an unclean shutdown the
//! ledger is the only record of work still running at the provider, so the
//! recovery surface ([`services::PendingRequestLedger::list_non_terminal`],
//! [`services::OperationTracker::resume`],
//! [`services::OperationTracker::cancel`]) reads from it alone.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
