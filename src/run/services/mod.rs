//! Run services.

mod error;
mod result_store;

pub use error::{RunStoreError, RunStoreResult};
pub use result_store::{ResultConfig, ResultStore};
