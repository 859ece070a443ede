//! Batch orchestration service.

use super::GenerationError;
use crate::provider::{domain::ProviderFamily, services::ProviderDispatcher};
use crate::queue::{
    BatchOptions, BatchSummary, HandlerError, QueueConfig, QueueEvent, TaskQueueProcessor,
    batch_size_for,
};
use crate::run::{
    domain::{Run, RunId, RunSummary, SlotState},
    ports::RunRepository,
    services::{ResultConfig, ResultStore},
};
use crate::task::domain::{FailureReason, Task, TaskFailure, TaskOutcome};
use mockable::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Queue event type emitted by [`GenerationService`].
pub type GenerationEvent = QueueEvent<TaskOutcome, TaskFailure>;

/// A batch of tasks to generate together.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Tasks in display order.
    pub tasks: Vec<Task>,
    /// Family the batch is sized for.
    pub family: ProviderFamily,
    /// Description stored with the run.
    pub summary: RunSummary,
}

impl BatchRequest {
    /// Creates a request with an empty run summary.
    #[must_use]
    pub fn new(tasks: Vec<Task>, family: ProviderFamily) -> Self {
        Self {
            tasks,
            family,
            summary: RunSummary::default().with_family(family),
        }
    }

    /// Replaces the run summary.
    #[must_use]
    pub fn with_summary(mut self, summary: RunSummary) -> Self {
        self.summary = summary;
        self
    }
}

/// How a batch ended.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// The run the batch wrote into.
    pub run_id: RunId,
    /// The persisted run after the queue drained; `None` when it could not be
    /// read back or no slots remain.
    pub run: Option<Run>,
    /// Aggregate queue counts.
    pub summary: BatchSummary,
    /// `true` when a durable write failed during the batch.
    pub storage_degraded: bool,
}

/// Runs batches end to end.
pub struct GenerationService<R, C>
where
    R: RunRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    dispatcher: Arc<ProviderDispatcher<C>>,
    results: ResultStore<R, C>,
    queue: QueueConfig,
    result_config: ResultConfig,
    events: Option<UnboundedSender<GenerationEvent>>,
}

impl<R, C> GenerationService<R, C>
where
    R: RunRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a service.
    #[must_use]
    pub const fn new(
        dispatcher: Arc<ProviderDispatcher<C>>,
        results: ResultStore<R, C>,
        queue: QueueConfig,
        result_config: ResultConfig,
    ) -> Self {
        Self {
            dispatcher,
            results,
            queue,
            result_config,
            events: None,
        }
    }

    /// Forwards queue progress, result, and error events to `sink`.
    #[must_use]
    pub fn with_events(mut self, sink: UnboundedSender<GenerationEvent>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Returns the result store the service writes into.
    #[must_use]
    pub const fn results(&self) -> &ResultStore<R, C> {
        &self.results
    }

    /// Generates every task of `request`, recording each outcome as it
    /// settles.
    ///
    /// Individual task failures are counted, never returned. Slots still
    /// generating once the queue drains belong to tasks that were never
    /// dispatched or observed cancellation; they are removed from the run.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Store`] when the run cannot be created.
    pub async fn process_batch(
        &self,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchReport, GenerationError> {
        let BatchRequest {
            tasks,
            family,
            summary,
        } = request;
        let run = self
            .results
            .create_run(tasks.iter().map(Task::id).collect::<Vec<_>>(), summary)
            .await?;
        let run_id = run.id();
        let batch_size = self
            .queue
            .batch_size
            .unwrap_or_else(|| batch_size_for(tasks.len(), family));
        info!(%run_id, tasks = tasks.len(), family = %family, batch_size, "batch started");

        let degraded = Arc::new(AtomicBool::new(false));
        let options =
            BatchOptions::new(batch_size, self.queue.batch_delay()).with_cancel(cancel.clone());
        let mut processor = TaskQueueProcessor::new(options);
        if let Some(sink) = &self.events {
            processor = processor.with_events(sink.clone());
        }
        let queue_summary = processor
            .process(tasks, |task| self.handle(run_id, task, &cancel, &degraded))
            .await;

        let settled = self.settle(run_id, &degraded).await;
        let storage_degraded = degraded.load(Ordering::SeqCst);
        if storage_degraded {
            error!(%run_id, "batch finished with storage degraded");
        }
        info!(
            %run_id,
            succeeded = queue_summary.succeeded,
            failed = queue_summary.failed,
            cancelled = queue_summary.cancelled,
            "batch finished"
        );
        Ok(BatchReport {
            run_id,
            run: settled,
            summary: queue_summary,
            storage_degraded,
        })
    }

    fn handle(
        &self,
        run_id: RunId,
        task: Task,
        cancel: &CancellationToken,
        degraded: &Arc<AtomicBool>,
    ) -> impl Future<Output = Result<TaskOutcome, HandlerError<TaskFailure>>> + Send + 'static {
        let dispatcher = Arc::clone(&self.dispatcher);
        let results = self.results.clone();
        let grace = self.result_config.failed_slot_grace();
        let cancel = cancel.clone();
        let degraded = Arc::clone(degraded);
        async move {
            let Ok(outcome) = dispatcher.dispatch(&task, &cancel).await else {
                return Err(HandlerError::Cancelled);
            };
            let stored = results.record_outcome(run_id, &outcome).await;
            if let Err(err) = &stored {
                error!(%run_id, task_id = %task.id(), error = %err, "outcome could not be stored");
                degraded.store(true, Ordering::SeqCst);
            }
            match (outcome.failure_details(), stored) {
                (None, Ok(_)) => Ok(outcome),
                // The slot still reads generating and is removed when the
                // batch settles, so the task counts as failed.
                (None, Err(err)) => Err(HandlerError::Failed(TaskFailure::new(
                    FailureReason::StorageDegraded,
                    &format!("result could not be stored: {err}"),
                    1,
                ))),
                (Some(failure), _) => {
                    if failure.reason == FailureReason::StorageDegraded {
                        degraded.store(true, Ordering::SeqCst);
                    }
                    schedule_prune(results, run_id, grace);
                    Err(HandlerError::Failed(failure.clone()))
                }
            }
        }
    }

    async fn settle(&self, run_id: RunId, degraded: &AtomicBool) -> Option<Run> {
        let run = match self.results.get_run(run_id).await {
            Ok(run) => run?,
            Err(err) => {
                error!(%run_id, error = %err, "run could not be read back");
                degraded.store(true, Ordering::SeqCst);
                return None;
            }
        };
        let stale: Vec<_> = run
            .slots()
            .iter()
            .filter(|slot| *slot.state() == SlotState::Generating)
            .map(|slot| slot.task_id())
            .collect();
        if stale.is_empty() {
            return Some(run);
        }
        debug!(%run_id, stale = stale.len(), "removing placeholders of unfinished tasks");
        for task_id in stale {
            if let Err(err) = self.results.delete_result(run_id, task_id).await {
                warn!(%run_id, %task_id, error = %err, "placeholder could not be removed");
                degraded.store(true, Ordering::SeqCst);
            }
        }
        match self.results.get_run(run_id).await {
            Ok(run) => run,
            Err(err) => {
                error!(%run_id, error = %err, "run could not be read back");
                degraded.store(true, Ordering::SeqCst);
                None
            }
        }
    }
}

fn schedule_prune<R, C>(results: ResultStore<R, C>, run_id: RunId, grace: std::time::Duration)
where
    R: RunRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        match results.prune_failed(run_id, grace).await {
            Ok(removal) => debug!(%run_id, removed = removal.removed, "failed slot pruning ran"),
            Err(err) => debug!(%run_id, error = %err, "failed slot pruning skipped"),
        }
    });
}
