//! Outcome of executing one task against the provider table.

use super::{TaskId, truncate_for_log};
use crate::provider::domain::ProviderId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Maximum number of error characters kept in failures and log lines.
pub const ERROR_PREVIEW_CHARS: usize = 150;

/// Provider output for a successful generation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationPayload {
    /// Location of the generated asset, when the provider hosts it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    /// Provider-specific response body.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl GenerationPayload {
    /// Creates a payload pointing at a hosted asset.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            result_url: Some(url.into()),
            data: Value::Null,
        }
    }

    /// Attaches provider-specific data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Why a task ended without a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A recoverable error persisted past the retry budget.
    ExhaustedRetries,
    /// The provider rejected the call in a way retries cannot fix.
    NonRecoverable,
    /// No provider in the chain produced output.
    NoUsableOutput,
    /// No registered provider accepts this task's input.
    NoCapableProvider,
    /// The durable ledger could not be written.
    StorageDegraded,
}

impl FailureReason {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExhaustedRetries => "exhausted_retries",
            Self::NonRecoverable => "non_recoverable",
            Self::NoUsableOutput => "no_usable_output",
            Self::NoCapableProvider => "no_capable_provider",
            Self::StorageDegraded => "storage_degraded",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Failure classification.
    pub reason: FailureReason,
    /// Truncated provider error text.
    pub message: String,
    /// Number of provider attempts made across the whole chain.
    pub attempts: u32,
}

impl TaskFailure {
    /// Creates a failure, truncating the message.
    #[must_use]
    pub fn new(reason: FailureReason, message: &str, attempts: u32) -> Self {
        Self {
            reason,
            message: truncate_for_log(message, ERROR_PREVIEW_CHARS),
            attempts,
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} attempt(s): {}",
            self.reason, self.attempts, self.message
        )
    }
}

impl std::error::Error for TaskFailure {}

/// Success or failure of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeResult {
    /// The provider produced a result.
    Success {
        /// Generated output.
        payload: GenerationPayload,
    },
    /// The task failed.
    Failed {
        /// Failure details.
        failure: TaskFailure,
    },
}

/// Immutable record of how a task ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_used: Option<ProviderId>,
    result: OutcomeResult,
}

impl TaskOutcome {
    /// Creates a success outcome tagged with the provider that produced it.
    #[must_use]
    pub const fn success(task_id: TaskId, provider: ProviderId, payload: GenerationPayload) -> Self {
        Self {
            task_id,
            provider_used: Some(provider),
            result: OutcomeResult::Success { payload },
        }
    }

    /// Creates a failure outcome.
    ///
    /// `provider` is the last provider attempted, if any was.
    #[must_use]
    pub const fn failure(task_id: TaskId, provider: Option<ProviderId>, failure: TaskFailure) -> Self {
        Self {
            task_id,
            provider_used: provider,
            result: OutcomeResult::Failed { failure },
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the provider that produced the outcome.
    #[must_use]
    pub const fn provider_used(&self) -> Option<&ProviderId> {
        self.provider_used.as_ref()
    }

    /// Returns the result.
    #[must_use]
    pub const fn result(&self) -> &OutcomeResult {
        &self.result
    }

    /// Returns `true` for success outcomes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Success { .. })
    }

    /// Returns the payload for success outcomes.
    #[must_use]
    pub const fn payload(&self) -> Option<&GenerationPayload> {
        match &self.result {
            OutcomeResult::Success { payload } => Some(payload),
            OutcomeResult::Failed { .. } => None,
        }
    }

    /// Returns the failure for failed outcomes.
    #[must_use]
    pub const fn failure_details(&self) -> Option<&TaskFailure> {
        match &self.result {
            OutcomeResult::Success { .. } => None,
            OutcomeResult::Failed { failure } => Some(failure),
        }
    }
}
