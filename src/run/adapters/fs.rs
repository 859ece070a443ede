//! File-backed run repository.

use crate::run::{
    domain::{MergeReport, ResultSlot, Run, RunId},
    ports::{RunRepository, RunRepositoryError, RunRepositoryResult, SlotRemoval},
};
use crate::storage::{JsonRecordDir, StorageResult};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Run repository storing one JSON document per run.
#[derive(Debug, Clone)]
pub struct FsRunRepository {
    records: JsonRecordDir,
    write_lock: Arc<Mutex<()>>,
}

impl FsRunRepository {
    /// Wraps an open record directory.
    #[must_use]
    pub fn new(records: JsonRecordDir) -> Self {
        Self {
            records,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Opens (creating if needed) the run directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::storage::StorageError`] when the directory cannot be
    /// opened.
    pub fn open(path: &Utf8Path) -> StorageResult<Self> {
        JsonRecordDir::open(path).map(Self::new)
    }

    async fn load(&self, id: RunId) -> RunRepositoryResult<Option<Run>> {
        self.records
            .read(&id.to_string())
            .await
            .map_err(RunRepositoryError::persistence)
    }

    async fn require(&self, id: RunId) -> RunRepositoryResult<Run> {
        self.load(id).await?.ok_or(RunRepositoryError::NotFound(id))
    }

    async fn save(&self, run: &Run) -> RunRepositoryResult<()> {
        self.records
            .write(&run.id().to_string(), run)
            .await
            .map_err(RunRepositoryError::persistence)
    }

    async fn erase(&self, id: RunId) -> RunRepositoryResult<bool> {
        self.records
            .remove(&id.to_string())
            .await
            .map_err(RunRepositoryError::persistence)
    }

    async fn store_after_removal(
        &self,
        run: &Run,
        removed: usize,
    ) -> RunRepositoryResult<SlotRemoval> {
        let run_deleted = run.is_empty();
        if run_deleted {
            self.erase(run.id()).await?;
        } else if removed > 0 {
            self.save(run).await?;
        }
        Ok(SlotRemoval {
            removed,
            run_deleted,
        })
    }
}

#[async_trait]
impl RunRepository for FsRunRepository {
    async fn create(&self, run: &Run) -> RunRepositoryResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.load(run.id()).await?.is_some() {
            return Err(RunRepositoryError::DuplicateRun(run.id()));
        }
        self.save(run).await
    }

    async fn find(&self, id: RunId) -> RunRepositoryResult<Option<Run>> {
        self.load(id).await
    }

    async fn list(&self) -> RunRepositoryResult<Vec<Run>> {
        let mut runs: Vec<Run> = self
            .records
            .read_all()
            .await
            .map_err(RunRepositoryError::persistence)?;
        runs.sort_by_key(|run| std::cmp::Reverse((run.created_at(), run.id())));
        Ok(runs)
    }

    async fn delete(&self, id: RunId) -> RunRepositoryResult<bool> {
        let _guard = self.write_lock.lock().await;
        self.erase(id).await
    }

    async fn merge_slots(
        &self,
        id: RunId,
        slots: &[ResultSlot],
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<(Run, MergeReport)> {
        let _guard = self.write_lock.lock().await;
        let mut run = self.require(id).await?;
        let report = run.merge(slots, now);
        if report.applied > 0 {
            self.save(&run).await?;
        }
        Ok((run, report))
    }

    async fn prune_failed(
        &self,
        id: RunId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<SlotRemoval> {
        let _guard = self.write_lock.lock().await;
        let mut run = self.require(id).await?;
        let removed = run.remove_failed_before(cutoff, now);
        self.store_after_removal(&run, removed).await
    }

    async fn remove_slot(
        &self,
        id: RunId,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<SlotRemoval> {
        let _guard = self.write_lock.lock().await;
        let mut run = self.require(id).await?;
        let removed = usize::from(run.remove_slot(task_id, now));
        self.store_after_removal(&run, removed).await
    }
}
