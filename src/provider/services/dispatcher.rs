//! Provider selection, retry, and fallback for a single task.

use super::{RetryError, RetryPolicy};
use crate::provider::{
    domain::{Capability, ProviderError, ProviderErrorKind, ProviderId},
    ports::GenerationProvider,
};
use crate::rate_limit::RateLimiterRegistry;
use crate::task::domain::{
    ERROR_PREVIEW_CHARS, FailureReason, GenerationPayload, Task, TaskFailure, TaskId, TaskOutcome,
    truncate_for_log,
};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-call limits applied by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound for one provider attempt, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

const fn default_call_timeout_ms() -> u64 {
    120_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Who bounds the duration of one provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallBound {
    /// [`DispatchConfig::call_timeout_ms`].
    Dispatcher,
    /// A per-entry timeout.
    Fixed(Duration),
    /// The provider enforces its own budget; its attempts are never cut
    /// short.
    Provider,
}

/// One row of the provider capability table.
#[derive(Clone)]
pub struct ProviderEntry {
    provider: Arc<dyn GenerationProvider>,
    capability: Capability,
    bound: CallBound,
}

impl ProviderEntry {
    /// Creates an entry using the dispatcher's default call timeout.
    #[must_use]
    pub fn new(provider: Arc<dyn GenerationProvider>, capability: Capability) -> Self {
        Self {
            provider,
            capability,
            bound: CallBound::Dispatcher,
        }
    }

    /// Creates an entry for a provider that bounds its own calls, such as a
    /// ledger-backed create-then-poll provider. The dispatcher applies no
    /// timeout to its attempts.
    #[must_use]
    pub fn self_bounded(provider: Arc<dyn GenerationProvider>, capability: Capability) -> Self {
        Self {
            provider,
            capability,
            bound: CallBound::Provider,
        }
    }

    /// Overrides the per-attempt timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.bound = CallBound::Fixed(timeout);
        self
    }

    /// Returns who bounds one attempt.
    #[must_use]
    pub const fn bound(&self) -> CallBound {
        self.bound
    }

    /// Returns the provider identifier.
    #[must_use]
    pub fn provider_id(&self) -> &ProviderId {
        self.provider.id()
    }

    /// Returns the capability predicate.
    #[must_use]
    pub const fn capability(&self) -> &Capability {
        &self.capability
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("provider", self.provider.id())
            .field("capability", &self.capability)
            .field("bound", &self.bound)
            .finish()
    }
}

/// Status-line update emitted while a task is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The first capable provider is being tried.
    Primary {
        /// Task being dispatched.
        task_id: TaskId,
        /// Provider being called.
        provider: ProviderId,
    },
    /// The previous provider produced no usable output.
    FallingBack {
        /// Task being dispatched.
        task_id: TaskId,
        /// Provider that produced nothing.
        from: ProviderId,
        /// Provider tried next.
        to: ProviderId,
    },
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary { provider, .. } => write!(f, "Generating with {provider}"),
            Self::FallingBack { from, to, .. } => {
                write!(f, "{from} returned no output, falling back to {to}")
            }
        }
    }
}

/// The task observed cancellation before producing an outcome.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("dispatch of task {task_id} was cancelled")]
pub struct DispatchCancelled {
    /// Task whose dispatch was cancelled.
    pub task_id: TaskId,
}

/// Routes tasks through the provider table.
///
/// The first entry whose capability matches is the primary. When a provider
/// fails with [`ProviderErrorKind::NoUsableOutput`], the next matching entry
/// is tried with the same task. Every attempt waits on the rate limiter of
/// the provider's family and, unless the entry is
/// [`self_bounded`](ProviderEntry::self_bounded), is bounded by a timeout;
/// recoverable failures are retried by the [`RetryPolicy`].
pub struct ProviderDispatcher<C: Clock> {
    entries: Vec<ProviderEntry>,
    limiters: Arc<RateLimiterRegistry<C>>,
    retry: RetryPolicy,
    config: DispatchConfig,
    status: Option<UnboundedSender<DispatchStatus>>,
}

impl<C: Clock> ProviderDispatcher<C> {
    /// Creates a dispatcher over an ordered provider table.
    #[must_use]
    pub const fn new(
        entries: Vec<ProviderEntry>,
        limiters: Arc<RateLimiterRegistry<C>>,
        retry: RetryPolicy,
        config: DispatchConfig,
    ) -> Self {
        Self {
            entries,
            limiters,
            retry,
            config,
            status: None,
        }
    }

    /// Sends status-line updates to `sink`.
    #[must_use]
    pub fn with_status_sink(mut self, sink: UnboundedSender<DispatchStatus>) -> Self {
        self.status = Some(sink);
        self
    }

    fn emit(&self, status: DispatchStatus) {
        if let Some(sink) = &self.status {
            if sink.send(status).is_err() {
                debug!("status receiver dropped");
            }
        }
    }

    /// Resolves a task into exactly one outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchCancelled`] when cancellation is observed while
    /// waiting for a token, between retries, or inside the provider.
    pub async fn dispatch(
        &self,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<TaskOutcome, DispatchCancelled> {
        let task_id = task.id();
        let mut candidates = self
            .entries
            .iter()
            .filter(|entry| entry.capability.matches(task));

        let Some(primary) = candidates.next() else {
            warn!(%task_id, input = %task.input().preview(), "no provider accepts task");
            return Ok(TaskOutcome::failure(
                task_id,
                None,
                TaskFailure::new(
                    FailureReason::NoCapableProvider,
                    "no registered provider accepts this input",
                    0,
                ),
            ));
        };

        self.emit(DispatchStatus::Primary {
            task_id,
            provider: primary.provider_id().clone(),
        });

        let mut current = primary;
        let mut attempts: u32 = 0;
        loop {
            let provider_id = current.provider_id().clone();
            let error = match self.call_with_retry(current, task, cancel).await {
                Ok(payload) => {
                    debug!(%task_id, provider = %provider_id, "task succeeded");
                    return Ok(TaskOutcome::success(task_id, provider_id, payload));
                }
                Err(RetryError::Cancelled { .. }) => {
                    return Err(DispatchCancelled { task_id });
                }
                Err(error) => error,
            };
            attempts = attempts.saturating_add(error.attempts());

            if let RetryError::NonRecoverable { error: cause, .. } = &error {
                if cause.kind().triggers_fallback() {
                    if let Some(next) = candidates.next() {
                        info!(
                            %task_id,
                            from = %provider_id,
                            to = %next.provider_id(),
                            "no usable output, falling back"
                        );
                        self.emit(DispatchStatus::FallingBack {
                            task_id,
                            from: provider_id,
                            to: next.provider_id().clone(),
                        });
                        current = next;
                        continue;
                    }
                }
            }

            let failure = failure_from(&error, attempts);
            warn!(
                %task_id,
                provider = %provider_id,
                input = %task.input().preview(),
                reason = %failure.reason,
                error = %truncate_for_log(&error.to_string(), ERROR_PREVIEW_CHARS),
                "task failed"
            );
            return Ok(TaskOutcome::failure(task_id, Some(provider_id), failure));
        }
    }

    async fn call_with_retry(
        &self,
        entry: &ProviderEntry,
        task: &Task,
        cancel: &CancellationToken,
    ) -> Result<GenerationPayload, RetryError> {
        let provider = &entry.provider;
        let limiter = self.limiters.get(provider.family());
        let bound = entry.bound;
        let default_timeout = self.config.call_timeout();

        self.retry
            .execute(
                |attempt| async move {
                    if let Some(gate) = limiter {
                        gate.consume_blocking(cancel)
                            .await
                            .map_err(|_| ProviderError::cancelled())?;
                    }
                    debug!(task_id = %task.id(), provider = %provider.id(), attempt, "calling provider");
                    let timeout = match bound {
                        CallBound::Dispatcher => default_timeout,
                        CallBound::Fixed(limit) => limit,
                        CallBound::Provider => return provider.generate(task, cancel).await,
                    };
                    tokio::time::timeout(timeout, provider.generate(task, cancel))
                        .await
                        .unwrap_or_else(|_| {
                            Err(ProviderError::recoverable(format!(
                                "provider call timed out after {}ms",
                                timeout.as_millis()
                            )))
                        })
                },
                cancel,
            )
            .await
    }
}

fn failure_from(error: &RetryError, attempts: u32) -> TaskFailure {
    match error {
        RetryError::Exhausted { last, .. } => {
            TaskFailure::new(FailureReason::ExhaustedRetries, last.message(), attempts)
        }
        RetryError::NonRecoverable { error: cause, .. } => {
            let reason = match cause.kind() {
                ProviderErrorKind::NoUsableOutput => FailureReason::NoUsableOutput,
                ProviderErrorKind::StorageUnavailable => FailureReason::StorageDegraded,
                ProviderErrorKind::Recoverable
                | ProviderErrorKind::Fatal
                | ProviderErrorKind::Cancelled => FailureReason::NonRecoverable,
            };
            TaskFailure::new(reason, cause.message(), attempts)
        }
        RetryError::Cancelled { .. } => {
            TaskFailure::new(FailureReason::NonRecoverable, "cancelled", attempts)
        }
    }
}
