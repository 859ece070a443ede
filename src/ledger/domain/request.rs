//! Pending request aggregate and partial updates.

use super::{LedgerDomainError, OperationHandle, PendingRequestId, RequestStatus};
use crate::provider::domain::{ProviderFamily, ProviderId};
use crate::task::domain::{Task, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Durable record of one long-running provider operation.
///
/// The record carries the original task so a `queued` entry can be
/// submitted after a restart, and the provider's operation handle so a
/// `polling` entry can be re-attached without submitting again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    request_id: PendingRequestId,
    family: ProviderFamily,
    provider: ProviderId,
    task: Task,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation: Option<OperationHandle>,
    status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_polled_at: Option<DateTime<Utc>>,
    retry_count: u32,
    max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PendingRequest {
    /// Creates a `queued` entry for `task` on `provider`.
    ///
    /// `max_retries` bounds the number of polls before the operation is
    /// failed with a timeout.
    #[must_use]
    pub fn new(
        provider: ProviderId,
        family: ProviderFamily,
        task: Task,
        max_retries: u32,
        clock: &impl Clock,
    ) -> Self {
        Self {
            request_id: PendingRequestId::new(),
            family,
            provider,
            task,
            operation: None,
            status: RequestStatus::Queued,
            progress: None,
            created_at: clock.utc(),
            started_at: None,
            completed_at: None,
            last_polled_at: None,
            retry_count: 0,
            max_retries,
            result_url: None,
            error: None,
        }
    }

    /// Returns the entry identifier.
    #[must_use]
    pub const fn request_id(&self) -> PendingRequestId {
        self.request_id
    }

    /// Returns the provider family.
    #[must_use]
    pub const fn family(&self) -> ProviderFamily {
        self.family
    }

    /// Returns the provider running the operation.
    #[must_use]
    pub const fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Returns the original task.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task.id()
    }

    /// Returns the external operation handle, once the provider issued one.
    #[must_use]
    pub const fn operation(&self) -> Option<&OperationHandle> {
        self.operation.as_ref()
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        self.status
    }

    /// Returns `true` once the entry is completed or failed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the provider's latest progress text.
    #[must_use]
    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    /// Returns when the entry was recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the create call was issued.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the entry became terminal.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns when the operation was last polled.
    #[must_use]
    pub const fn last_polled_at(&self) -> Option<DateTime<Utc>> {
        self.last_polled_at
    }

    /// Returns the number of polls made.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the poll budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns `true` when the poll budget is spent.
    #[must_use]
    pub const fn poll_budget_spent(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Returns the result location for completed entries.
    #[must_use]
    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    /// Returns the failure text for failed entries.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Merges `patch` into the entry.
    ///
    /// Entering `in_progress` stamps `started_at`; entering a terminal
    /// status stamps `completed_at`; a poll attempt stamps `last_polled_at`
    /// and increments `retry_count`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerDomainError::InvalidTransition`] when the patch moves
    /// the status backwards or touches a terminal entry at all. The entry is
    /// left unchanged.
    pub fn apply(
        &mut self,
        patch: &PendingRequestPatch,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerDomainError> {
        if self.status.is_terminal() {
            return Err(LedgerDomainError::InvalidTransition {
                from: self.status,
                to: patch.status.unwrap_or(self.status),
            });
        }
        if let Some(next) = patch.status {
            if next != self.status && !self.status.can_transition_to(next) {
                return Err(LedgerDomainError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            if next == RequestStatus::InProgress && self.started_at.is_none() {
                self.started_at = Some(now);
            }
            if next.is_terminal() {
                self.completed_at = Some(now);
            }
            self.status = next;
        }
        if let Some(handle) = &patch.operation {
            self.operation = Some(handle.clone());
        }
        if let Some(progress) = &patch.progress {
            self.progress = Some(progress.clone());
        }
        if patch.poll_attempt {
            self.last_polled_at = Some(now);
            self.retry_count = self.retry_count.saturating_add(1);
        }
        if let Some(url) = &patch.result_url {
            self.result_url = Some(url.clone());
        }
        if let Some(error) = &patch.error {
            self.error = Some(error.clone());
        }
        Ok(())
    }
}

/// Partial update merged into a stored [`PendingRequest`].
///
/// Repositories apply patches as read-modify-write under their own lock so
/// concurrent writers never lose each other's fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRequestPatch {
    status: Option<RequestStatus>,
    operation: Option<OperationHandle>,
    progress: Option<String>,
    poll_attempt: bool,
    result_url: Option<String>,
    error: Option<String>,
}

impl PendingRequestPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch moving the entry to `status`.
    #[must_use]
    pub fn transition(status: RequestStatus) -> Self {
        Self::new().with_status(status)
    }

    /// Patch marking the entry completed with an optional result location.
    #[must_use]
    pub fn completed(result_url: Option<String>) -> Self {
        Self {
            status: Some(RequestStatus::Completed),
            result_url,
            ..Self::default()
        }
    }

    /// Patch marking the entry failed.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::transition(RequestStatus::Failed).with_error(error)
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Records the provider's operation handle.
    #[must_use]
    pub fn with_operation(mut self, handle: OperationHandle) -> Self {
        self.operation = Some(handle);
        self
    }

    /// Sets the progress text.
    #[must_use]
    pub fn with_progress(mut self, progress: impl Into<String>) -> Self {
        self.progress = Some(progress.into());
        self
    }

    /// Counts one poll.
    #[must_use]
    pub const fn with_poll_attempt(mut self) -> Self {
        self.poll_attempt = true;
        self
    }

    /// Sets the failure text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns the status this patch moves to, if any.
    #[must_use]
    pub const fn status(&self) -> Option<RequestStatus> {
        self.status
    }
}
