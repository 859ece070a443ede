//! Handles and poll results for long-running provider operations.

use crate::task::domain::GenerationPayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-issued handle of an external long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    /// Wraps a provider handle.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the handle as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by one poll of a long-running operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// Still running.
    Pending {
        /// Human-readable progress text, if the provider reports one.
        progress: Option<String>,
    },
    /// Finished with output.
    Completed(GenerationPayload),
}
