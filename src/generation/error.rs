//! Batch-level generation errors.

use crate::run::services::RunStoreError;
use thiserror::Error;

/// Errors that stop a batch from starting.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The run could not be created.
    #[error(transparent)]
    Store(#[from] RunStoreError),
}
