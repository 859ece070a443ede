//! Durable directory of JSON records.
//!
//! Ledger and result-store adapters persist one JSON document per record
//! inside a capability-scoped directory. Writes go to a temporary file that
//! is renamed over the destination, so a crash leaves either the previous or
//! the new document in place, never a torn one.

mod error;
mod record_dir;

pub use error::{StorageError, StorageResult};
pub use record_dir::JsonRecordDir;

#[cfg(test)]
mod tests;
