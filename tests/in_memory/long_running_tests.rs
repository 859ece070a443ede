//! In-memory integration tests for long-running operations in a batch.

use super::helpers::{config, tasks};
use crate::test_helpers::RemoteStudio;
use atelier::generation::{BatchRequest, GenerationService};
use atelier::ledger::adapters::InMemoryPendingRequestRepository;
use atelier::ledger::domain::RequestStatus;
use atelier::ledger::services::{
    LongRunningProvider, OperationTracker, PendingRequestLedger, PollConfig, Settlement,
};
use atelier::provider::domain::{Capability, ProviderFamily};
use atelier::provider::ports::OperationProvider;
use atelier::provider::services::{ProviderDispatcher, RetryPolicy};
use atelier::rate_limit::RateLimiterRegistry;
use atelier::run::adapters::InMemoryRunRepository;
use atelier::run::services::ResultStore;
use mockable::DefaultClock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Tracker = OperationTracker<InMemoryPendingRequestRepository, DefaultClock>;

fn tracker(studio: &Arc<RemoteStudio>) -> Arc<Tracker> {
    let ledger = PendingRequestLedger::new(
        Arc::new(InMemoryPendingRequestRepository::new()),
        Arc::new(DefaultClock),
    );
    let provider: Arc<dyn OperationProvider> = studio.clone();
    Arc::new(
        OperationTracker::new(
            ledger,
            PollConfig {
                interval_ms: 10,
                max_attempts: 50,
                call_timeout_ms: 1_000,
            },
        )
        .with_provider(provider),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn video_batch_settles_through_the_ledger() {
    let studio = RemoteStudio::new("veo");
    studio.complete_new_operations("https://cdn/clip.mp4");
    let tracker = tracker(&studio);
    let long_running = LongRunningProvider::new(Arc::clone(&tracker), studio.provider_id())
        .expect("provider registered");
    let config = config();
    let clock = Arc::new(DefaultClock);
    let dispatcher = ProviderDispatcher::new(
        vec![long_running.into_entry(Capability::any())],
        Arc::new(RateLimiterRegistry::new(&config.rate_limits, &clock).expect("valid limits")),
        RetryPolicy::new(config.retry),
        config.dispatch,
    );
    let service = GenerationService::new(
        Arc::new(dispatcher),
        ResultStore::new(Arc::new(InMemoryRunRepository::new()), clock),
        config.queue,
        config.results,
    );

    let report = service
        .process_batch(
            BatchRequest::new(tasks(&["waves", "gulls"]), ProviderFamily::Video),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(studio.submits(), 2);
    let entries = tracker.ledger().list().await.expect("list ledger");
    assert_eq!(entries.len(), 2);
    assert!(
        entries
            .iter()
            .all(|entry| entry.status() == RequestStatus::Completed
                && entry.result_url() == Some("https://cdn/clip.mp4"))
    );
    assert!(
        tracker
            .ledger()
            .list_non_terminal()
            .await
            .expect("list non-terminal")
            .is_empty()
    );
    for entry in entries {
        tracker
            .ledger()
            .acknowledge(entry.request_id())
            .await
            .expect("acknowledge");
    }
    assert!(tracker.ledger().list().await.expect("list ledger").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_failure_fails_the_entry() {
    let studio = RemoteStudio::new("veo");
    let tracker = tracker(&studio);
    let task = tasks(&["storm"]).pop().expect("one task");
    let runner = Arc::clone(&tracker);
    let provider_id = studio.provider_id();
    let handle = tokio::spawn(async move { runner.run(&provider_id, &task).await });

    let operation = loop {
        let entries = tracker.ledger().list().await.expect("list ledger");
        if let Some(operation) = entries.first().and_then(|entry| entry.operation().cloned()) {
            break operation;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    studio.fail(&operation, "content policy");

    let settlement = handle.await.expect("runner joins").expect("ledger writes");
    assert!(matches!(settlement, Settlement::Failed(ref err) if err.message() == "content policy"));
    let entry = tracker
        .ledger()
        .list()
        .await
        .expect("list ledger")
        .pop()
        .expect("one entry");
    assert_eq!(entry.status(), RequestStatus::Failed);
    assert_eq!(entry.error(), Some("content policy"));
}
