//! Repository port for pending request persistence.

use crate::ledger::domain::{
    LedgerDomainError, PendingRequest, PendingRequestId, PendingRequestPatch,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger repository operations.
pub type LedgerRepositoryResult<T> = Result<T, LedgerRepositoryError>;

/// Pending request persistence contract.
///
/// Implementations must make [`update`](Self::update) a read-modify-write
/// keyed by request id: concurrent patches to the same entry are applied
/// one after another, never as blind overwrites.
#[async_trait]
pub trait PendingRequestRepository: Send + Sync {
    /// Stores a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerRepositoryError::DuplicateRequest`] when the id is
    /// already present.
    async fn insert(&self, request: &PendingRequest) -> LedgerRepositoryResult<()>;

    /// Merges `patch` into the stored entry and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerRepositoryError::NotFound`] when the entry is absent
    /// and [`LedgerRepositoryError::Domain`] when the patch is an invalid
    /// status transition.
    async fn update(
        &self,
        id: PendingRequestId,
        patch: &PendingRequestPatch,
        now: DateTime<Utc>,
    ) -> LedgerRepositoryResult<PendingRequest>;

    /// Finds an entry by id.
    async fn find(&self, id: PendingRequestId) -> LedgerRepositoryResult<Option<PendingRequest>>;

    /// Returns every entry, oldest first.
    async fn list(&self) -> LedgerRepositoryResult<Vec<PendingRequest>>;

    /// Removes an entry, returning `true` when it existed.
    async fn remove(&self, id: PendingRequestId) -> LedgerRepositoryResult<bool>;
}

/// Errors returned by ledger repository implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerRepositoryError {
    /// An entry with the same id already exists.
    #[error("duplicate pending request: {0}")]
    DuplicateRequest(PendingRequestId),

    /// The entry was not found.
    #[error("pending request not found: {0}")]
    NotFound(PendingRequestId),

    /// The patch was rejected by the state machine.
    #[error(transparent)]
    Domain(#[from] LedgerDomainError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
