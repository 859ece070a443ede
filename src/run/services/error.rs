//! Service-level result store errors.

use crate::run::{
    domain::{RunDomainError, RunId},
    ports::RunRepositoryError,
};
use thiserror::Error;

/// Errors returned by [`super::ResultStore`].
#[derive(Debug, Clone, Error)]
pub enum RunStoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RunRepositoryError),

    /// The run could not be built.
    #[error(transparent)]
    Domain(#[from] RunDomainError),

    /// The run does not exist.
    #[error("run not found: {0}")]
    NotFound(RunId),
}

/// Result type for result store operations.
pub type RunStoreResult<T> = Result<T, RunStoreError>;
