//! Repository port for run persistence.

use crate::run::domain::{MergeReport, ResultSlot, Run, RunId};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for run repository operations.
pub type RunRepositoryResult<T> = Result<T, RunRepositoryError>;

/// What a slot removal did to its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotRemoval {
    /// Slots removed.
    pub removed: usize,
    /// `true` when the run lost its last slot and was deleted.
    pub run_deleted: bool,
}

/// Run persistence contract.
///
/// Every slot-level write is a read-modify-write of the stored run keyed by
/// run id; concurrent writers to one run are applied one after another.
/// Operations that remove slots delete the run once it has none left.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Stores a new run.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::DuplicateRun`] when the id is already
    /// present.
    async fn create(&self, run: &Run) -> RunRepositoryResult<()>;

    /// Finds a run by id.
    async fn find(&self, id: RunId) -> RunRepositoryResult<Option<Run>>;

    /// Returns every run, newest first.
    async fn list(&self) -> RunRepositoryResult<Vec<Run>>;

    /// Deletes a run, returning `true` when it existed.
    async fn delete(&self, id: RunId) -> RunRepositoryResult<bool>;

    /// Merges slots into the stored run.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::NotFound`] when the run is absent.
    async fn merge_slots(
        &self,
        id: RunId,
        slots: &[ResultSlot],
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<(Run, MergeReport)>;

    /// Removes failed slots recorded at or before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::NotFound`] when the run is absent.
    async fn prune_failed(
        &self,
        id: RunId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<SlotRemoval>;

    /// Removes one slot.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::NotFound`] when the run is absent.
    async fn remove_slot(
        &self,
        id: RunId,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<SlotRemoval>;
}

/// Errors returned by run repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RunRepositoryError {
    /// A run with the same id already exists.
    #[error("duplicate run: {0}")]
    DuplicateRun(RunId),

    /// The run was not found.
    #[error("run not found: {0}")]
    NotFound(RunId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RunRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
