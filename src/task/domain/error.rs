//! Error types for task construction.

use thiserror::Error;

/// Errors returned while constructing task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The prompt is empty after trimming and no reference payload was given.
    #[error("task input must carry a prompt or at least one reference payload")]
    EmptyInput,

    /// A reference payload has no location.
    #[error("reference payload {index} has an empty location")]
    EmptyReference {
        /// Position of the offending payload.
        index: usize,
    },
}
