//! In-memory ledger repository for tests and ephemeral sessions.

use crate::ledger::{
    domain::{PendingRequest, PendingRequestId, PendingRequestPatch},
    ports::{LedgerRepositoryError, LedgerRepositoryResult, PendingRequestRepository},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory ledger repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPendingRequestRepository {
    state: Arc<RwLock<HashMap<PendingRequestId, PendingRequest>>>,
}

impl InMemoryPendingRequestRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: &impl fmt::Display) -> LedgerRepositoryError {
    LedgerRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl PendingRequestRepository for InMemoryPendingRequestRepository {
    async fn insert(&self, request: &PendingRequest) -> LedgerRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        if state.contains_key(&request.request_id()) {
            return Err(LedgerRepositoryError::DuplicateRequest(request.request_id()));
        }
        state.insert(request.request_id(), request.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: PendingRequestId,
        patch: &PendingRequestPatch,
        now: DateTime<Utc>,
    ) -> LedgerRepositoryResult<PendingRequest> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let stored = state
            .get_mut(&id)
            .ok_or(LedgerRepositoryError::NotFound(id))?;
        let mut merged = stored.clone();
        merged.apply(patch, now)?;
        *stored = merged.clone();
        Ok(merged)
    }

    async fn find(&self, id: PendingRequestId) -> LedgerRepositoryResult<Option<PendingRequest>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.get(&id).cloned())
    }

    async fn list(&self) -> LedgerRepositoryResult<Vec<PendingRequest>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut requests: Vec<PendingRequest> = state.values().cloned().collect();
        requests.sort_by_key(|request| (request.created_at(), request.request_id()));
        Ok(requests)
    }

    async fn remove(&self, id: PendingRequestId) -> LedgerRepositoryResult<bool> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        Ok(state.remove(&id).is_some())
    }
}
