//! Result slots and their merge rule.

use crate::provider::domain::ProviderId;
use crate::task::domain::{GenerationPayload, OutcomeResult, TaskFailure, TaskId, TaskOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contents of one result slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    /// Placeholder shown while the task runs.
    Generating,
    /// The task produced output.
    Success {
        /// Generated output.
        payload: GenerationPayload,
        /// Provider that produced it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<ProviderId>,
    },
    /// The task failed. Kept until pruned.
    Failed {
        /// Failure details.
        failure: TaskFailure,
        /// When the failure was recorded; pruning counts from here.
        failed_at: DateTime<Utc>,
    },
}

impl SlotState {
    /// Converts an outcome into slot contents.
    #[must_use]
    pub fn from_outcome(outcome: &TaskOutcome, now: DateTime<Utc>) -> Self {
        match outcome.result() {
            OutcomeResult::Success { payload } => Self::Success {
                payload: payload.clone(),
                provider: outcome.provider_used().cloned(),
            },
            OutcomeResult::Failed { failure } => Self::Failed {
                failure: failure.clone(),
                failed_at: now,
            },
        }
    }

    /// Returns `true` for success and failed slots.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Generating)
    }

    /// Returns `true` when `incoming` may replace `self`.
    ///
    /// Terminal writes always win, so a late real result replaces a stale
    /// duplicate. A `generating` placeholder never replaces a terminal slot.
    #[must_use]
    pub const fn accepts(&self, incoming: &Self) -> bool {
        incoming.is_terminal() || !self.is_terminal()
    }
}

/// One position in a run's ordered result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSlot {
    task_id: TaskId,
    #[serde(flatten)]
    state: SlotState,
}

impl ResultSlot {
    /// Creates a slot.
    #[must_use]
    pub const fn new(task_id: TaskId, state: SlotState) -> Self {
        Self { task_id, state }
    }

    /// Creates a `generating` placeholder.
    #[must_use]
    pub const fn placeholder(task_id: TaskId) -> Self {
        Self::new(task_id, SlotState::Generating)
    }

    /// Creates the slot an outcome resolves to.
    #[must_use]
    pub fn from_outcome(outcome: &TaskOutcome, now: DateTime<Utc>) -> Self {
        Self::new(outcome.task_id(), SlotState::from_outcome(outcome, now))
    }

    /// Returns the task this slot belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the slot contents.
    #[must_use]
    pub const fn state(&self) -> &SlotState {
        &self.state
    }

    pub(super) fn replace_state(&mut self, state: SlotState) {
        self.state = state;
    }
}
