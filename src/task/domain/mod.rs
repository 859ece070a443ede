//! Domain model for generation tasks and their outcomes.

mod error;
mod ids;
mod outcome;
mod task;
mod text;

pub use error::TaskDomainError;
pub use ids::TaskId;
pub use outcome::{
    ERROR_PREVIEW_CHARS, FailureReason, GenerationPayload, OutcomeResult, TaskFailure, TaskOutcome,
};
pub use task::{PROMPT_PREVIEW_CHARS, ReferencePayload, Task, TaskInput};
pub use text::truncate_for_log;
