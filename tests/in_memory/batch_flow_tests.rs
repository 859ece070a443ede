//! In-memory integration tests for the batch generation flow.

use super::helpers::{TestGeneration, generation, primary_and_fallback, tasks};
use atelier::generation::BatchRequest;
use atelier::provider::domain::{ProviderFamily, ProviderId};
use atelier::queue::QueueEvent;
use atelier::run::domain::{ResultSlot, RunSummary, SlotState};
use atelier::task::domain::{FailureReason, Task, TaskId};
use rstest::{fixture, rstest};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[fixture]
fn service() -> TestGeneration {
    generation(primary_and_fallback())
}

fn provider_of(slot: &ResultSlot) -> Option<&str> {
    match slot.state() {
        SlotState::Success { provider, .. } => provider.as_ref().map(ProviderId::as_str),
        SlotState::Generating | SlotState::Failed { .. } => None,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_records_every_outcome_in_task_order(service: TestGeneration) {
    let batch = tasks(&["harbour", "please refuse", "lighthouse", "forbidden gate"]);
    let order: Vec<TaskId> = batch.iter().map(Task::id).collect();

    let report = service
        .process_batch(
            BatchRequest::new(batch, ProviderFamily::Image)
                .with_summary(RunSummary::labelled("coastline")),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!((report.summary.succeeded, report.summary.failed), (3, 1));
    assert!(!report.storage_degraded);
    let run = report.run.expect("run kept");
    let slots: Vec<TaskId> = run.slots().iter().map(ResultSlot::task_id).collect();
    assert_eq!(slots, order);

    let providers: Vec<Option<&str>> = run.slots().iter().map(provider_of).collect();
    assert_eq!(
        providers,
        vec![Some("primary"), Some("fallback"), Some("primary"), None]
    );
    let failed = run.slots().last().map(ResultSlot::state);
    assert!(matches!(
        failed,
        Some(SlotState::Failed { failure, .. }) if failure.reason == FailureReason::NonRecoverable
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_slots_disappear_after_the_grace_period(service: TestGeneration) {
    let batch = tasks(&["forbidden door", "meadow"]);

    let report = service
        .process_batch(
            BatchRequest::new(batch, ProviderFamily::Image),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");
    assert_eq!(report.run.as_ref().map(|run| run.slots().len()), Some(2));

    tokio::time::sleep(Duration::from_millis(300)).await;

    let run = service
        .results()
        .get_run(report.run_id)
        .await
        .expect("read run")
        .expect("run kept");
    assert_eq!(run.slots().len(), 1);
    assert_eq!(run.counts().succeeded, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelling_between_batches_keeps_finished_results(service: TestGeneration) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let observed = service.with_events(tx);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let QueueEvent::Progress(progress) = event {
                if progress.completed == 2 {
                    trigger.cancel();
                }
            }
        }
    });

    let report = observed
        .process_batch(
            BatchRequest::new(tasks(&["a", "b", "c", "d"]), ProviderFamily::Image),
            cancel,
        )
        .await
        .expect("batch runs");
    drop(observed);
    watcher.await.expect("watcher finishes");

    assert!(report.summary.was_cancelled);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.not_dispatched, 2);
    let run = report.run.expect("finished results kept");
    assert_eq!(run.slots().len(), 2);
    assert_eq!(run.counts().succeeded, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn runs_are_listed_newest_first(service: TestGeneration) {
    let first = service
        .process_batch(
            BatchRequest::new(tasks(&["one"]), ProviderFamily::Image),
            CancellationToken::new(),
        )
        .await
        .expect("first batch");
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = service
        .process_batch(
            BatchRequest::new(tasks(&["two"]), ProviderFamily::Image),
            CancellationToken::new(),
        )
        .await
        .expect("second batch");

    let listed: Vec<_> = service
        .results()
        .list_runs()
        .await
        .expect("list runs")
        .iter()
        .map(|run| run.id())
        .collect();
    assert_eq!(listed, vec![second.run_id, first.run_id]);
}
