//! Generation tasks: the unit of work the queue drains.
//!
//! A [`domain::Task`] is built by the caller, consumed once by the queue, and
//! resolved into exactly one [`domain::TaskOutcome`] by the provider
//! dispatcher.

pub mod domain;

#[cfg(test)]
mod tests;
