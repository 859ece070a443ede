//! Create-then-poll driver backed by the ledger.

use super::{LedgerError, LedgerResult, PendingRequestLedger};
use crate::ledger::{
    domain::{
        LedgerDomainError, OperationHandle, PendingRequest, PendingRequestId, PendingRequestPatch,
        RequestStatus,
    },
    ports::{LedgerRepositoryError, PendingRequestRepository},
};
use crate::provider::{
    domain::{PollStatus, ProviderError, ProviderFamily, ProviderId},
    ports::OperationProvider,
};
use crate::task::domain::{ERROR_PREVIEW_CHARS, GenerationPayload, Task, truncate_for_log};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait between polls, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Polls allowed before the operation is failed with a timeout.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Upper bound for one submit or poll call, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

const fn default_interval_ms() -> u64 {
    5_000
}

const fn default_max_attempts() -> u32 {
    120
}

const fn default_call_timeout_ms() -> u64 {
    60_000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl PollConfig {
    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Returns the bound for a single submit or poll call.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// How a tracked operation ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The provider produced output; the entry is `completed`.
    Completed(GenerationPayload),
    /// The operation failed; the entry is `failed`.
    Failed(ProviderError),
    /// The entry was cancelled through the ledger.
    Cancelled,
    /// The poller was stopped by [`OperationTracker::shutdown`]; the entry is
    /// left non-terminal for a later resume.
    Detached,
}

/// Drives ledger entries through `queued → in_progress → polling →
/// {completed | failed}`.
///
/// Every state change is written to the ledger before the next external
/// call, so a crash at any point leaves an entry that
/// [`resume`](Self::resume) can pick up. Each submit and poll is bounded by
/// [`PollConfig::call_timeout_ms`] and polls by
/// [`PollConfig::max_attempts`]; exceeding the attempt count fails the entry
/// with a timeout reason. A timed-out poll counts as an attempt.
pub struct OperationTracker<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    ledger: PendingRequestLedger<R, C>,
    providers: HashMap<ProviderId, Arc<dyn OperationProvider>>,
    poll: PollConfig,
    active: Mutex<HashMap<PendingRequestId, CancellationToken>>,
}

impl<R, C> OperationTracker<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    /// Creates a tracker with no registered providers.
    #[must_use]
    pub fn new(ledger: PendingRequestLedger<R, C>, poll: PollConfig) -> Self {
        Self {
            ledger,
            providers: HashMap::new(),
            poll,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a long-running provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn OperationProvider>) -> Self {
        self.providers.insert(provider.id().clone(), provider);
        self
    }

    /// Returns the underlying ledger.
    #[must_use]
    pub const fn ledger(&self) -> &PendingRequestLedger<R, C> {
        &self.ledger
    }

    /// Returns the family of a registered provider.
    #[must_use]
    pub fn family_of(&self, provider_id: &ProviderId) -> Option<ProviderFamily> {
        self.providers.get(provider_id).map(|provider| provider.family())
    }

    /// Returns `true` while a poller is attached to `id`.
    #[must_use]
    pub fn is_tracking(&self, id: PendingRequestId) -> bool {
        self.active_pollers().contains_key(&id)
    }

    /// Records `task` in the ledger, submits it, and polls until it settles.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the provider is unknown or a ledger
    /// write fails. Provider failures are reported through
    /// [`Settlement::Failed`] instead.
    pub async fn run(&self, provider_id: &ProviderId, task: &Task) -> LedgerResult<Settlement> {
        let provider = self.provider(provider_id)?;
        let request = PendingRequest::new(
            provider_id.clone(),
            provider.family(),
            task.clone(),
            self.poll.max_attempts,
            &**self.ledger.clock(),
        );
        self.ledger.record(&request).await?;
        let poller = self.attach(request.request_id())?;
        self.submit_and_poll(provider.as_ref(), &request, &poller.token)
            .await
    }

    /// Re-attaches a poller to a non-terminal entry after a restart.
    ///
    /// Entries holding an operation handle are polled without submitting
    /// again. A `queued` entry never reached the provider and is submitted
    /// from its stored task. An `in_progress` entry without a handle cannot
    /// be resumed: the create call may or may not have reached the provider.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`], [`LedgerError::AlreadyTracking`],
    /// [`LedgerError::Domain`] for entries that cannot be resumed, or any
    /// ledger write failure.
    pub async fn resume(&self, id: PendingRequestId) -> LedgerResult<Settlement> {
        let request = self
            .ledger
            .get(id)
            .await?
            .ok_or(LedgerError::NotFound(id))?;
        let not_resumable = || LedgerDomainError::NotResumable {
            request_id: id,
            status: request.status(),
        };
        if request.is_terminal() {
            return Err(not_resumable().into());
        }
        let provider = self.provider(request.provider())?;
        let poller = self.attach(id)?;
        info!(
            request_id = %id,
            task_id = %request.task_id(),
            status = %request.status(),
            "resuming pending request"
        );
        match (request.status(), request.operation()) {
            (RequestStatus::Queued, _) => {
                self.submit_and_poll(provider.as_ref(), &request, &poller.token)
                    .await
            }
            (RequestStatus::InProgress | RequestStatus::Polling, Some(handle)) => {
                self.poll_until_settled(provider.as_ref(), id, handle, &poller.token)
                    .await
            }
            _ => Err(not_resumable().into()),
        }
    }

    /// Cancels an entry and stops its poller, if one is attached.
    ///
    /// The failed status is written before the poller is stopped. A poller
    /// whose next write finds the entry already failed settles as
    /// [`Settlement::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] or [`LedgerError::AlreadyTerminal`]
    /// when there is nothing to cancel, or a ledger write failure.
    pub async fn cancel(&self, id: PendingRequestId) -> LedgerResult<PendingRequest> {
        let cancelled = self.ledger.cancel(id).await?;
        if let Some(token) = self.active_pollers().get(&id) {
            token.cancel();
        }
        Ok(cancelled)
    }

    /// Stops every live poller, leaving their entries resumable.
    pub fn shutdown(&self) {
        let pollers = self.active_pollers();
        for token in pollers.values() {
            token.cancel();
        }
        info!(stopped = pollers.len(), "operation tracker shut down");
    }

    fn provider(&self, id: &ProviderId) -> LedgerResult<Arc<dyn OperationProvider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownProvider(id.clone()))
    }

    fn active_pollers(
        &self,
    ) -> MutexGuard<'_, HashMap<PendingRequestId, CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, id: PendingRequestId) -> LedgerResult<ActivePoller<'_>> {
        let mut pollers = self.active_pollers();
        if pollers.contains_key(&id) {
            return Err(LedgerError::AlreadyTracking(id));
        }
        let token = CancellationToken::new();
        pollers.insert(id, token.clone());
        Ok(ActivePoller {
            registry: &self.active,
            id,
            token,
        })
    }

    async fn submit_and_poll(
        &self,
        provider: &dyn OperationProvider,
        request: &PendingRequest,
        token: &CancellationToken,
    ) -> LedgerResult<Settlement> {
        let id = request.request_id();
        if self
            .write(id, &PendingRequestPatch::transition(RequestStatus::InProgress))
            .await?
            .is_none()
        {
            return Ok(Settlement::Cancelled);
        }
        let limit = self.poll.call_timeout();
        let submitted = tokio::time::timeout(limit, provider.submit(request.task()))
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::fatal(format!(
                    "operation submit timed out after {}ms",
                    limit.as_millis()
                )))
            });
        let handle = match submitted {
            Ok(handle) => handle,
            Err(error) => return self.fail(id, error).await,
        };
        debug!(request_id = %id, operation = %handle, "operation submitted");
        let recorded = self
            .write(
                id,
                &PendingRequestPatch::transition(RequestStatus::Polling)
                    .with_operation(handle.clone()),
            )
            .await?;
        if recorded.is_none() {
            return Ok(Settlement::Cancelled);
        }
        self.poll_until_settled(provider, id, &handle, token).await
    }

    async fn poll_until_settled(
        &self,
        provider: &dyn OperationProvider,
        id: PendingRequestId,
        handle: &OperationHandle,
        token: &CancellationToken,
    ) -> LedgerResult<Settlement> {
        loop {
            tokio::select! {
                () = token.cancelled() => return self.interrupted(id).await,
                () = tokio::time::sleep(self.poll.interval()) => {}
            }
            let limit = self.poll.call_timeout();
            let raced = tokio::select! {
                () = token.cancelled() => return self.interrupted(id).await,
                answer = tokio::time::timeout(limit, provider.poll(handle)) => answer,
            };
            let polled = raced.unwrap_or_else(|_| {
                Err(ProviderError::recoverable(format!(
                    "poll timed out after {}ms",
                    limit.as_millis()
                )))
            });
            if token.is_cancelled() {
                return self.interrupted(id).await;
            }
            let tick = PendingRequestPatch::transition(RequestStatus::Polling).with_poll_attempt();
            let written = match polled {
                Ok(PollStatus::Completed(payload)) => {
                    let patch = PendingRequestPatch::completed(payload.result_url.clone())
                        .with_poll_attempt();
                    if self.write(id, &patch).await?.is_none() {
                        return Ok(Settlement::Cancelled);
                    }
                    info!(request_id = %id, operation = %handle, "operation completed");
                    return Ok(Settlement::Completed(payload));
                }
                Ok(PollStatus::Pending { progress }) => {
                    let patch = match progress {
                        Some(text) => tick.with_progress(text),
                        None => tick,
                    };
                    self.write(id, &patch).await?
                }
                Err(error) if error.kind().is_retryable() => {
                    warn!(request_id = %id, error = %error, "poll failed, will poll again");
                    self.write(id, &tick).await?
                }
                Err(error) => return self.fail(id, error).await,
            };
            let Some(updated) = written else {
                return Ok(Settlement::Cancelled);
            };
            if updated.poll_budget_spent() {
                let timeout = ProviderError::fatal(format!(
                    "operation timed out after {} polls",
                    updated.retry_count()
                ));
                return self.fail(id, timeout).await;
            }
        }
    }

    async fn fail(&self, id: PendingRequestId, error: ProviderError) -> LedgerResult<Settlement> {
        let reason = truncate_for_log(error.message(), ERROR_PREVIEW_CHARS);
        if self
            .write(id, &PendingRequestPatch::failed(reason))
            .await?
            .is_none()
        {
            return Ok(Settlement::Cancelled);
        }
        warn!(request_id = %id, kind = error.kind().as_str(), error = %error, "operation failed");
        Ok(Settlement::Failed(error))
    }

    /// Applies `patch`, returning `None` when a user cancel already failed
    /// the entry.
    async fn write(
        &self,
        id: PendingRequestId,
        patch: &PendingRequestPatch,
    ) -> LedgerResult<Option<PendingRequest>> {
        match self.ledger.update(id, patch).await {
            Ok(updated) => Ok(Some(updated)),
            Err(LedgerError::Repository(LedgerRepositoryError::Domain(
                LedgerDomainError::InvalidTransition {
                    from: RequestStatus::Failed,
                    ..
                },
            ))) => {
                debug!(request_id = %id, "entry cancelled while the poller was working");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn interrupted(&self, id: PendingRequestId) -> LedgerResult<Settlement> {
        let status = self.ledger.get(id).await?.map(|request| request.status());
        if status == Some(RequestStatus::Failed) {
            Ok(Settlement::Cancelled)
        } else {
            debug!(request_id = %id, "poller detached");
            Ok(Settlement::Detached)
        }
    }
}

/// Registration of a live poller; removed from the registry on drop.
struct ActivePoller<'a> {
    registry: &'a Mutex<HashMap<PendingRequestId, CancellationToken>>,
    id: PendingRequestId,
    token: CancellationToken,
}

impl Drop for ActivePoller<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
