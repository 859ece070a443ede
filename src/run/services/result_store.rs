//! Durable run projection read by the gallery.

use super::{RunStoreError, RunStoreResult};
use crate::run::{
    domain::{ResultSlot, Run, RunId, RunSummary},
    ports::{RunRepository, RunRepositoryError, SlotRemoval},
};
use crate::task::domain::{TaskId, TaskOutcome};
use chrono::TimeDelta;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultConfig {
    /// How long a failed slot stays visible before it is pruned, in
    /// milliseconds.
    #[serde(default = "default_failed_slot_grace_ms")]
    pub failed_slot_grace_ms: u64,
}

const fn default_failed_slot_grace_ms() -> u64 {
    3_000
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self {
            failed_slot_grace_ms: default_failed_slot_grace_ms(),
        }
    }
}

impl ResultConfig {
    /// Returns the failed-slot grace period.
    #[must_use]
    pub const fn failed_slot_grace(&self) -> Duration {
        Duration::from_millis(self.failed_slot_grace_ms)
    }
}

/// Store of runs and their ordered result slots.
pub struct ResultStore<R, C>
where
    R: RunRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for ResultStore<R, C>
where
    R: RunRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> ResultStore<R, C>
where
    R: RunRepository,
    C: Clock + Send + Sync,
{
    /// Creates a result store.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates and stores a run with one placeholder per task.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::Domain`] for an empty or duplicated task list
    /// and [`RunStoreError::Repository`] when the write fails.
    pub async fn create_run(
        &self,
        task_ids: impl IntoIterator<Item = TaskId> + Send,
        summary: RunSummary,
    ) -> RunStoreResult<Run> {
        let run = Run::new(task_ids, summary, &*self.clock)?;
        self.repository.create(&run).await?;
        info!(run_id = %run.id(), slots = run.slots().len(), "run created");
        Ok(run)
    }

    /// Merges result slots into a run by task id.
    ///
    /// Slots for tasks outside the run are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::NotFound`] when the run is absent and
    /// [`RunStoreError::Repository`] when the write fails.
    pub async fn update_run_results(
        &self,
        run_id: RunId,
        slots: &[ResultSlot],
    ) -> RunStoreResult<Run> {
        let (run, report) = self
            .repository
            .merge_slots(run_id, slots, self.clock.utc())
            .await
            .map_err(|err| not_found(err, run_id))?;
        for task_id in &report.unknown {
            warn!(run_id = %run_id, task_id = %task_id, "result for unknown task ignored");
        }
        if report.refused > 0 {
            debug!(
                run_id = %run_id,
                refused = report.refused,
                "placeholder writes over finished slots ignored"
            );
        }
        Ok(run)
    }

    /// Writes one outcome into its slot.
    ///
    /// # Errors
    ///
    /// Same as [`update_run_results`](Self::update_run_results).
    pub async fn record_outcome(&self, run_id: RunId, outcome: &TaskOutcome) -> RunStoreResult<Run> {
        let slot = ResultSlot::from_outcome(outcome, self.clock.utc());
        self.update_run_results(run_id, &[slot]).await
    }

    /// Deletes a run, returning `true` when it existed.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::Repository`] when the delete fails.
    pub async fn delete_run(&self, run_id: RunId) -> RunStoreResult<bool> {
        let deleted = self.repository.delete(run_id).await?;
        if deleted {
            info!(run_id = %run_id, "run deleted");
        }
        Ok(deleted)
    }

    /// Deletes one result; the run goes with its last result.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::NotFound`] when the run is absent and
    /// [`RunStoreError::Repository`] when the write fails.
    pub async fn delete_result(&self, run_id: RunId, task_id: TaskId) -> RunStoreResult<SlotRemoval> {
        let removal = self
            .repository
            .remove_slot(run_id, task_id, self.clock.utc())
            .await
            .map_err(|err| not_found(err, run_id))?;
        if removal.run_deleted {
            info!(run_id = %run_id, "last result deleted, run removed");
        }
        Ok(removal)
    }

    /// Returns every run, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::Repository`] when the read fails.
    pub async fn list_runs(&self) -> RunStoreResult<Vec<Run>> {
        Ok(self.repository.list().await?)
    }

    /// Finds a run.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::Repository`] when the read fails.
    pub async fn get_run(&self, run_id: RunId) -> RunStoreResult<Option<Run>> {
        Ok(self.repository.find(run_id).await?)
    }

    /// Removes failed slots that have been visible for at least `grace`.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::NotFound`] when the run is absent and
    /// [`RunStoreError::Repository`] when the write fails.
    pub async fn prune_failed(&self, run_id: RunId, grace: Duration) -> RunStoreResult<SlotRemoval> {
        let now = self.clock.utc();
        let Some(cutoff) = TimeDelta::from_std(grace)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return Ok(SlotRemoval::default());
        };
        let removal = self
            .repository
            .prune_failed(run_id, cutoff, now)
            .await
            .map_err(|err| not_found(err, run_id))?;
        if removal.removed > 0 {
            info!(
                run_id = %run_id,
                removed = removal.removed,
                run_deleted = removal.run_deleted,
                "pruned failed results"
            );
        }
        Ok(removal)
    }
}

fn not_found(err: RunRepositoryError, run_id: RunId) -> RunStoreError {
    match err {
        RunRepositoryError::NotFound(_) => RunStoreError::NotFound(run_id),
        other => other.into(),
    }
}
