//! Run aggregate.

use super::{ResultSlot, RunDomainError, RunId, SlotState};
use crate::provider::domain::ProviderFamily;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Caller-supplied description of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Display label, such as the prompt the batch was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Provider family the batch targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<ProviderFamily>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl RunSummary {
    /// Creates a summary with a label.
    #[must_use]
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Sets the provider family.
    #[must_use]
    pub const fn with_family(mut self, family: ProviderFamily) -> Self {
        self.family = Some(family);
        self
    }
}

/// Slot counts by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounts {
    /// Slots still generating.
    pub generating: usize,
    /// Successful slots.
    pub succeeded: usize,
    /// Failed slots not yet pruned.
    pub failed: usize,
}

/// What a merge did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Slots whose contents were replaced.
    pub applied: usize,
    /// Placeholders refused because the slot is already terminal.
    pub refused: usize,
    /// Incoming slots whose task is not part of the run.
    pub unknown: Vec<TaskId>,
}

/// A batch of tasks submitted together and its ordered results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    id: RunId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    slots: Vec<ResultSlot>,
    #[serde(default)]
    summary: RunSummary,
}

impl Run {
    /// Creates a run with one placeholder per task, in task order.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::EmptyRun`] for an empty task list and
    /// [`RunDomainError::DuplicateTask`] when a task id repeats.
    pub fn new(
        task_ids: impl IntoIterator<Item = TaskId>,
        summary: RunSummary,
        clock: &impl Clock,
    ) -> Result<Self, RunDomainError> {
        let mut seen = HashSet::new();
        let mut slots = Vec::new();
        for task_id in task_ids {
            if !seen.insert(task_id) {
                return Err(RunDomainError::DuplicateTask(task_id));
            }
            slots.push(ResultSlot::placeholder(task_id));
        }
        if slots.is_empty() {
            return Err(RunDomainError::EmptyRun);
        }
        let now = clock.utc();
        Ok(Self {
            id: RunId::new(),
            created_at: now,
            updated_at: now,
            slots,
            summary,
        })
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the time of the last change.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the ordered result slots.
    #[must_use]
    pub fn slots(&self) -> &[ResultSlot] {
        &self.slots
    }

    /// Returns the slot for `task_id`.
    #[must_use]
    pub fn slot(&self, task_id: TaskId) -> Option<&ResultSlot> {
        self.slots.iter().find(|slot| slot.task_id() == task_id)
    }

    /// Returns the caller's summary.
    #[must_use]
    pub const fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Returns `true` once every slot has been removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Counts slots by state.
    #[must_use]
    pub fn counts(&self) -> RunCounts {
        self.slots
            .iter()
            .fold(RunCounts::default(), |mut counts, slot| {
                match slot.state() {
                    SlotState::Generating => counts.generating += 1,
                    SlotState::Success { .. } => counts.succeeded += 1,
                    SlotState::Failed { .. } => counts.failed += 1,
                }
                counts
            })
    }

    /// Merges incoming slots into the run by task id.
    ///
    /// Slot order and count never change. Terminal writes replace whatever
    /// the slot holds; placeholders never replace a terminal slot. Slots for
    /// unknown tasks are reported and otherwise ignored.
    pub fn merge(&mut self, incoming: &[ResultSlot], now: DateTime<Utc>) -> MergeReport {
        let mut report = MergeReport::default();
        for update in incoming {
            let Some(slot) = self
                .slots
                .iter_mut()
                .find(|slot| slot.task_id() == update.task_id())
            else {
                report.unknown.push(update.task_id());
                continue;
            };
            if slot.state().accepts(update.state()) {
                slot.replace_state(update.state().clone());
                report.applied = report.applied.saturating_add(1);
            } else {
                report.refused = report.refused.saturating_add(1);
            }
        }
        if report.applied > 0 {
            self.updated_at = now;
        }
        report
    }

    /// Removes failed slots recorded at or before `cutoff`.
    ///
    /// Returns the number of slots removed.
    pub fn remove_failed_before(&mut self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> usize {
        let before = self.slots.len();
        self.slots.retain(|slot| {
            !matches!(slot.state(), SlotState::Failed { failed_at, .. } if *failed_at <= cutoff)
        });
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            self.updated_at = now;
        }
        removed
    }

    /// Removes the slot for `task_id`, returning `true` when it existed.
    pub fn remove_slot(&mut self, task_id: TaskId, now: DateTime<Utc>) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.task_id() != task_id);
        let removed = self.slots.len() < before;
        if removed {
            self.updated_at = now;
        }
        removed
    }
}
