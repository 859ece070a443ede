//! Batch-by-batch queue driver.

use super::{BatchOptions, BatchProgress, BatchSummary, HandlerError, QueueError, QueueEvent};
use crate::task::domain::Task;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type Joined<O, E> = Result<Result<O, HandlerError<E>>, JoinError>;

/// Drains tasks in bounded batches.
///
/// Dispatch follows input order; completion order within a batch does not.
/// Cancellation is checked before each dispatch, after each settled task and
/// before each inter-batch wait. Handlers already running are left to
/// finish and their results are reported normally.
pub struct TaskQueueProcessor<O, E: fmt::Display> {
    options: BatchOptions,
    events: Option<UnboundedSender<QueueEvent<O, E>>>,
}

impl<O, E> TaskQueueProcessor<O, E>
where
    O: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    /// Creates a processor.
    #[must_use]
    pub const fn new(options: BatchOptions) -> Self {
        Self {
            options,
            events: None,
        }
    }

    /// Sends progress, result, and error events to `sink`.
    #[must_use]
    pub fn with_events(mut self, sink: UnboundedSender<QueueEvent<O, E>>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Runs `handler` once for every task and returns aggregate counts.
    ///
    /// Handler failures and panics are reported as events and counted; they
    /// never abort the remaining queue.
    pub async fn process<H, Fut>(&self, tasks: Vec<Task>, handler: H) -> BatchSummary
    where
        H: Fn(Task) -> Fut,
        Fut: Future<Output = Result<O, HandlerError<E>>> + Send + 'static,
    {
        let cancel = self.options.cancel_token().clone();
        let batch_size = self.options.batch_size();
        let total = tasks.len();
        let total_batches = total.div_ceil(batch_size);
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };
        let mut dispatched = 0_usize;
        let mut completed = 0_usize;

        info!(total, batch_size, total_batches, "processing queue");
        for (batch_index, batch) in tasks.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                summary.was_cancelled = true;
                break;
            }
            let started = Instant::now();
            let mut in_flight: JoinSet<Result<O, HandlerError<E>>> = JoinSet::new();
            let mut owners: HashMap<task::Id, Task> = HashMap::with_capacity(batch.len());
            for task in batch {
                if cancel.is_cancelled() {
                    summary.was_cancelled = true;
                    break;
                }
                debug!(task_id = %task.id(), batch_index, "dispatching task");
                let spawned = in_flight.spawn(handler(task.clone()));
                owners.insert(spawned.id(), task.clone());
                dispatched = dispatched.saturating_add(1);
            }

            while let Some(joined) = in_flight.join_next_with_id().await {
                completed = completed.saturating_add(1);
                let (id, result) = match joined {
                    Ok((id, output)) => (id, Ok(output)),
                    Err(err) => (err.id(), Err(err)),
                };
                let Some(task) = owners.remove(&id) else {
                    error!(%id, "settled handler has no dispatched task");
                    summary.failed = summary.failed.saturating_add(1);
                    continue;
                };
                self.record(task, result, &mut summary);
                self.emit(QueueEvent::Progress(BatchProgress {
                    completed,
                    total,
                    batch_index,
                    total_batches,
                }));
                if cancel.is_cancelled() && !summary.was_cancelled {
                    debug!(batch_index, "cancellation observed, draining in-flight tasks");
                    summary.was_cancelled = true;
                }
            }

            if batch_index.saturating_add(1) >= total_batches {
                break;
            }
            if cancel.is_cancelled() {
                summary.was_cancelled = true;
                break;
            }
            let wait = self.options.batch_delay().saturating_sub(started.elapsed());
            debug!(batch_index, wait_ms = wait.as_millis(), "pacing before next batch");
            tokio::select! {
                () = cancel.cancelled() => {
                    summary.was_cancelled = true;
                    break;
                }
                () = tokio::time::sleep(wait) => {}
            }
        }

        summary.not_dispatched = total.saturating_sub(dispatched);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            not_dispatched = summary.not_dispatched,
            "queue finished"
        );
        summary
    }

    fn record(&self, task: Task, joined: Joined<O, E>, summary: &mut BatchSummary) {
        match joined {
            Ok(Ok(output)) => {
                summary.succeeded = summary.succeeded.saturating_add(1);
                self.emit(QueueEvent::Result { task, output });
            }
            Ok(Err(HandlerError::Failed(err))) => {
                warn!(task_id = %task.id(), input = %task.input().preview(), error = %err, "task failed");
                summary.failed = summary.failed.saturating_add(1);
                self.emit(QueueEvent::Error {
                    task,
                    error: QueueError::Handler(err),
                });
            }
            Ok(Err(HandlerError::Cancelled)) => {
                summary.cancelled = summary.cancelled.saturating_add(1);
                self.emit(QueueEvent::Cancelled { task });
            }
            Err(err) => {
                error!(task_id = %task.id(), error = %err, "task handler panicked");
                summary.failed = summary.failed.saturating_add(1);
                self.emit(QueueEvent::Error {
                    task,
                    error: QueueError::Panicked(err.to_string()),
                });
            }
        }
    }

    fn emit(&self, event: QueueEvent<O, E>) {
        if let Some(sink) = &self.events {
            if sink.send(event).is_err() {
                debug!("queue event receiver dropped");
            }
        }
    }
}
