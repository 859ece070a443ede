//! File-backed ledger repository.

use crate::ledger::{
    domain::{PendingRequest, PendingRequestId, PendingRequestPatch},
    ports::{LedgerRepositoryError, LedgerRepositoryResult, PendingRequestRepository},
};
use crate::storage::{JsonRecordDir, StorageResult};
use async_trait::async_trait;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Ledger repository storing one JSON document per entry.
///
/// Entries survive process restarts; a fresh repository opened on the same
/// directory sees every entry written before.
#[derive(Debug, Clone)]
pub struct FsPendingRequestRepository {
    records: JsonRecordDir,
    write_lock: Arc<Mutex<()>>,
}

impl FsPendingRequestRepository {
    /// Wraps an open record directory.
    #[must_use]
    pub fn new(records: JsonRecordDir) -> Self {
        Self {
            records,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Opens (creating if needed) the ledger directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::storage::StorageError`] when the directory cannot be
    /// opened.
    pub fn open(path: &Utf8Path) -> StorageResult<Self> {
        JsonRecordDir::open(path).map(Self::new)
    }

    async fn load(&self, id: PendingRequestId) -> LedgerRepositoryResult<Option<PendingRequest>> {
        self.records
            .read(&id.to_string())
            .await
            .map_err(LedgerRepositoryError::persistence)
    }

    async fn save(&self, request: &PendingRequest) -> LedgerRepositoryResult<()> {
        self.records
            .write(&request.request_id().to_string(), request)
            .await
            .map_err(LedgerRepositoryError::persistence)
    }
}

#[async_trait]
impl PendingRequestRepository for FsPendingRequestRepository {
    async fn insert(&self, request: &PendingRequest) -> LedgerRepositoryResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.load(request.request_id()).await?.is_some() {
            return Err(LedgerRepositoryError::DuplicateRequest(request.request_id()));
        }
        self.save(request).await
    }

    async fn update(
        &self,
        id: PendingRequestId,
        patch: &PendingRequestPatch,
        now: DateTime<Utc>,
    ) -> LedgerRepositoryResult<PendingRequest> {
        let _guard = self.write_lock.lock().await;
        let mut request = self
            .load(id)
            .await?
            .ok_or(LedgerRepositoryError::NotFound(id))?;
        request.apply(patch, now)?;
        self.save(&request).await?;
        Ok(request)
    }

    async fn find(&self, id: PendingRequestId) -> LedgerRepositoryResult<Option<PendingRequest>> {
        self.load(id).await
    }

    async fn list(&self) -> LedgerRepositoryResult<Vec<PendingRequest>> {
        let mut requests: Vec<PendingRequest> = self
            .records
            .read_all()
            .await
            .map_err(LedgerRepositoryError::persistence)?;
        requests.sort_by_key(|request| (request.created_at(), request.request_id()));
        Ok(requests)
    }

    async fn remove(&self, id: PendingRequestId) -> LedgerRepositoryResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.records
            .remove(&id.to_string())
            .await
            .map_err(LedgerRepositoryError::persistence)
    }
}
