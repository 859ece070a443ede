//! In-memory run repository.

use crate::run::{
    domain::{MergeReport, ResultSlot, Run, RunId},
    ports::{RunRepository, RunRepositoryError, RunRepositoryResult, SlotRemoval},
};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory run repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRunRepository {
    state: Arc<RwLock<HashMap<RunId, Run>>>,
}

impl InMemoryRunRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn remove_with<F>(&self, id: RunId, remove: F) -> RunRepositoryResult<SlotRemoval>
    where
        F: FnOnce(&mut Run) -> usize,
    {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let run = state.get_mut(&id).ok_or(RunRepositoryError::NotFound(id))?;
        let removed = remove(run);
        let run_deleted = run.is_empty();
        if run_deleted {
            state.remove(&id);
        }
        Ok(SlotRemoval {
            removed,
            run_deleted,
        })
    }
}

fn poisoned(err: &impl fmt::Display) -> RunRepositoryError {
    RunRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn create(&self, run: &Run) -> RunRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        if state.contains_key(&run.id()) {
            return Err(RunRepositoryError::DuplicateRun(run.id()));
        }
        state.insert(run.id(), run.clone());
        Ok(())
    }

    async fn find(&self, id: RunId) -> RunRepositoryResult<Option<Run>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(state.get(&id).cloned())
    }

    async fn list(&self) -> RunRepositoryResult<Vec<Run>> {
        let state = self.state.read().map_err(|err| poisoned(&err))?;
        let mut runs: Vec<Run> = state.values().cloned().collect();
        runs.sort_by_key(|run| std::cmp::Reverse((run.created_at(), run.id())));
        Ok(runs)
    }

    async fn delete(&self, id: RunId) -> RunRepositoryResult<bool> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        Ok(state.remove(&id).is_some())
    }

    async fn merge_slots(
        &self,
        id: RunId,
        slots: &[ResultSlot],
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<(Run, MergeReport)> {
        let mut state = self.state.write().map_err(|err| poisoned(&err))?;
        let run = state.get_mut(&id).ok_or(RunRepositoryError::NotFound(id))?;
        let report = run.merge(slots, now);
        Ok((run.clone(), report))
    }

    async fn prune_failed(
        &self,
        id: RunId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<SlotRemoval> {
        self.remove_with(id, |run| run.remove_failed_before(cutoff, now))
    }

    async fn remove_slot(
        &self,
        id: RunId,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> RunRepositoryResult<SlotRemoval> {
        self.remove_with(id, |run| usize::from(run.remove_slot(task_id, now)))
    }
}
