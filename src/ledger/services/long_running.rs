//! Ledger-backed adapter exposing a long-running provider to the dispatcher.

use super::{LedgerError, LedgerResult, OperationTracker, Settlement};
use crate::ledger::ports::PendingRequestRepository;
use crate::provider::{
    domain::{Capability, ProviderError, ProviderFamily, ProviderId, ProviderResult},
    ports::GenerationProvider,
    services::ProviderEntry,
};
use crate::task::domain::{GenerationPayload, Task};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// A [`GenerationProvider`] whose single call spans a whole
/// create-then-poll cycle recorded in the ledger.
///
/// Register it in the dispatcher table through
/// [`into_entry`](Self::into_entry). The tracker bounds each call with its
/// own poll budget; the dispatcher must not time out a live poller. The only
/// recoverable error a call returns is a rejected submit, whose entry is
/// already `failed`, so a retry never duplicates an outstanding operation.
///
/// Once submitted, an operation keeps polling until it settles even if the
/// batch is cancelled; use [`OperationTracker::cancel`] to stop one. Ledger
/// write failures are reported as [`ProviderError`]s of kind
/// `StorageUnavailable`.
pub struct LongRunningProvider<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    id: ProviderId,
    family: ProviderFamily,
    tracker: Arc<OperationTracker<R, C>>,
}

impl<R, C> LongRunningProvider<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    /// Wraps the operation provider registered in `tracker` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownProvider`] when `tracker` has no such
    /// provider.
    pub fn new(tracker: Arc<OperationTracker<R, C>>, id: ProviderId) -> LedgerResult<Self> {
        let family = tracker
            .family_of(&id)
            .ok_or_else(|| LedgerError::UnknownProvider(id.clone()))?;
        Ok(Self {
            id,
            family,
            tracker,
        })
    }

    /// Wraps the provider in a self-bounded dispatcher table entry.
    #[must_use]
    pub fn into_entry(self, capability: Capability) -> ProviderEntry
    where
        R: 'static,
        C: 'static,
    {
        ProviderEntry::self_bounded(Arc::new(self), capability)
    }
}

#[async_trait]
impl<R, C> GenerationProvider for LongRunningProvider<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn family(&self) -> ProviderFamily {
        self.family
    }

    async fn generate(
        &self,
        task: &Task,
        _cancel: &CancellationToken,
    ) -> ProviderResult<GenerationPayload> {
        match self.tracker.run(&self.id, task).await {
            Ok(Settlement::Completed(payload)) => Ok(payload),
            Ok(Settlement::Failed(err)) => Err(err),
            Ok(Settlement::Cancelled | Settlement::Detached) => Err(ProviderError::cancelled()),
            Err(err) => {
                error!(
                    task_id = %task.id(),
                    provider = %self.id,
                    error = %err,
                    "pending request ledger unavailable"
                );
                Err(ProviderError::storage(&err))
            }
        }
    }
}
