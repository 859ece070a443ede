//! Run domain errors.

use crate::task::domain::TaskId;
use thiserror::Error;

/// Errors returned while constructing runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunDomainError {
    /// A run needs at least one task.
    #[error("a run must contain at least one task")]
    EmptyRun,

    /// Two slots would share a task id.
    #[error("task {0} appears more than once in the run")]
    DuplicateTask(TaskId),
}
