//! Durable pending request ledger.

use super::{LedgerError, LedgerResult};
use crate::ledger::{
    domain::{PendingRequest, PendingRequestId, PendingRequestPatch},
    ports::PendingRequestRepository,
};
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Failure text recorded when a user cancels a pending request.
pub const USER_CANCELLED_REASON: &str = "cancelled by user";

/// Ledger of long-running operations, backed by a repository.
pub struct PendingRequestLedger<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for PendingRequestLedger<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> PendingRequestLedger<R, C>
where
    R: PendingRequestRepository,
    C: Clock + Send + Sync,
{
    /// Creates a ledger.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Returns the ledger clock.
    #[must_use]
    pub const fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Records a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when the write fails.
    pub async fn record(&self, request: &PendingRequest) -> LedgerResult<()> {
        self.repository.insert(request).await?;
        debug!(
            request_id = %request.request_id(),
            task_id = %request.task_id(),
            provider = %request.provider(),
            "pending request recorded"
        );
        Ok(())
    }

    /// Merges `patch` into an entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when the entry is missing, the
    /// transition is invalid, or the write fails.
    pub async fn update(
        &self,
        id: PendingRequestId,
        patch: &PendingRequestPatch,
    ) -> LedgerResult<PendingRequest> {
        let updated = self.repository.update(id, patch, self.clock.utc()).await?;
        debug!(request_id = %id, status = %updated.status(), "pending request updated");
        Ok(updated)
    }

    /// Finds an entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when the read fails.
    pub async fn get(&self, id: PendingRequestId) -> LedgerResult<Option<PendingRequest>> {
        Ok(self.repository.find(id).await?)
    }

    /// Returns every entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when the read fails.
    pub async fn list(&self) -> LedgerResult<Vec<PendingRequest>> {
        Ok(self.repository.list().await?)
    }

    /// Returns entries still queued, in progress, or polling.
    ///
    /// These are the entries offered for resume or cancel after a restart.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when the read fails.
    pub async fn list_non_terminal(&self) -> LedgerResult<Vec<PendingRequest>> {
        let mut requests = self.repository.list().await?;
        requests.retain(|request| !request.is_terminal());
        Ok(requests)
    }

    /// Removes an entry regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when the delete fails.
    pub async fn remove(&self, id: PendingRequestId) -> LedgerResult<bool> {
        Ok(self.repository.remove(id).await?)
    }

    /// Marks a running entry failed with [`USER_CANCELLED_REASON`].
    ///
    /// This only changes the durable record; stopping a live poller is the
    /// job of [`super::OperationTracker::cancel`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] or [`LedgerError::AlreadyTerminal`]
    /// when there is nothing to cancel.
    pub async fn cancel(&self, id: PendingRequestId) -> LedgerResult<PendingRequest> {
        let request = self.require(id).await?;
        if request.is_terminal() {
            return Err(LedgerError::AlreadyTerminal {
                request_id: id,
                status: request.status(),
            });
        }
        let cancelled = self
            .update(id, &PendingRequestPatch::failed(USER_CANCELLED_REASON))
            .await?;
        info!(request_id = %id, task_id = %cancelled.task_id(), "pending request cancelled");
        Ok(cancelled)
    }

    /// Removes a terminal entry once the caller has consumed its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] when the entry is missing and
    /// [`LedgerError::NotTerminal`] when it is still running.
    pub async fn acknowledge(&self, id: PendingRequestId) -> LedgerResult<PendingRequest> {
        let request = self.require(id).await?;
        if !request.is_terminal() {
            return Err(LedgerError::NotTerminal {
                request_id: id,
                status: request.status(),
            });
        }
        self.repository.remove(id).await?;
        Ok(request)
    }

    /// Removes terminal entries that settled at least `older_than` ago.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Repository`] when listing or deleting fails.
    pub async fn prune_terminal(&self, older_than: Duration) -> LedgerResult<usize> {
        let Some(cutoff) = TimeDelta::from_std(older_than)
            .ok()
            .and_then(|age| self.clock.utc().checked_sub_signed(age))
        else {
            return Ok(0);
        };
        let mut removed = 0_usize;
        for request in self.repository.list().await? {
            let settled_at = request.completed_at().unwrap_or_else(|| request.created_at());
            if request.is_terminal()
                && settled_at <= cutoff
                && self.repository.remove(request.request_id()).await?
            {
                removed = removed.saturating_add(1);
            }
        }
        if removed > 0 {
            info!(removed, "pruned terminal pending requests");
        }
        Ok(removed)
    }

    async fn require(&self, id: PendingRequestId) -> LedgerResult<PendingRequest> {
        self.repository
            .find(id)
            .await?
            .ok_or(LedgerError::NotFound(id))
    }
}
