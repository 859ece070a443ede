//! Tests for the ledger recovery surface.

use crate::ledger::adapters::InMemoryPendingRequestRepository;
use crate::ledger::domain::{PendingRequest, PendingRequestPatch, RequestStatus};
use crate::ledger::ports::LedgerRepositoryError;
use crate::ledger::services::{LedgerError, PendingRequestLedger, USER_CANCELLED_REASON};
use crate::provider::domain::{ProviderFamily, ProviderId};
use crate::task::domain::{Task, TaskInput};
use crate::test_support::ManualClock;
use rstest::{fixture, rstest};
use std::sync::Arc;
use std::time::Duration;

type Ledger = PendingRequestLedger<InMemoryPendingRequestRepository, ManualClock>;

struct Harness {
    clock: Arc<ManualClock>,
    ledger: Ledger,
}

#[fixture]
fn harness() -> Harness {
    let clock = ManualClock::new();
    let ledger = PendingRequestLedger::new(
        Arc::new(InMemoryPendingRequestRepository::new()),
        Arc::clone(&clock),
    );
    Harness { clock, ledger }
}

impl Harness {
    fn request(&self, prompt: &str) -> PendingRequest {
        let task = Task::new(TaskInput::from_prompt(prompt)).expect("valid task");
        PendingRequest::new(
            ProviderId::new("kling").expect("valid id"),
            ProviderFamily::Video,
            task,
            10,
            &*self.clock,
        )
    }

    async fn recorded(&self, prompt: &str) -> PendingRequest {
        let request = self.request(prompt);
        self.ledger.record(&request).await.expect("record");
        request
    }

    async fn move_to(&self, request: &PendingRequest, statuses: &[RequestStatus]) {
        for status in statuses {
            self.ledger
                .update(request.request_id(), &PendingRequestPatch::transition(*status))
                .await
                .expect("transition");
        }
    }
}

#[rstest]
#[tokio::test]
async fn recorded_request_is_retrievable(harness: Harness) {
    let request = harness.recorded("a").await;

    let found = harness
        .ledger
        .get(request.request_id())
        .await
        .expect("get");
    assert_eq!(found, Some(request));
}

#[rstest]
#[tokio::test]
async fn duplicate_record_is_rejected(harness: Harness) {
    let request = harness.recorded("a").await;

    let result = harness.ledger.record(&request).await;
    assert!(matches!(
        result,
        Err(LedgerError::Repository(LedgerRepositoryError::DuplicateRequest(id)))
            if id == request.request_id()
    ));
}

#[rstest]
#[tokio::test]
async fn list_non_terminal_hides_settled_requests(harness: Harness) {
    let queued = harness.recorded("queued").await;
    let polling = harness.recorded("polling").await;
    harness
        .move_to(&polling, &[RequestStatus::InProgress, RequestStatus::Polling])
        .await;
    let completed = harness.recorded("completed").await;
    harness
        .move_to(&completed, &[RequestStatus::InProgress, RequestStatus::Completed])
        .await;

    let open: Vec<_> = harness
        .ledger
        .list_non_terminal()
        .await
        .expect("list")
        .iter()
        .map(PendingRequest::request_id)
        .collect();

    assert_eq!(open.len(), 2);
    assert!(open.contains(&queued.request_id()));
    assert!(open.contains(&polling.request_id()));
}

#[rstest]
#[tokio::test]
async fn update_rejects_status_regression(harness: Harness) {
    let request = harness.recorded("a").await;
    harness
        .move_to(&request, &[RequestStatus::InProgress, RequestStatus::Polling])
        .await;

    let result = harness
        .ledger
        .update(
            request.request_id(),
            &PendingRequestPatch::transition(RequestStatus::Queued),
        )
        .await;

    assert!(matches!(
        result,
        Err(LedgerError::Repository(LedgerRepositoryError::Domain(_)))
    ));
    let stored = harness
        .ledger
        .get(request.request_id())
        .await
        .expect("get")
        .expect("present");
    assert_eq!(stored.status(), RequestStatus::Polling);
}

#[rstest]
#[tokio::test]
async fn cancel_marks_request_failed_with_reason(harness: Harness) {
    let request = harness.recorded("a").await;
    harness.move_to(&request, &[RequestStatus::InProgress]).await;

    let cancelled = harness
        .ledger
        .cancel(request.request_id())
        .await
        .expect("cancel");

    assert_eq!(cancelled.status(), RequestStatus::Failed);
    assert_eq!(cancelled.error(), Some(USER_CANCELLED_REASON));
    assert!(cancelled.completed_at().is_some());
}

#[rstest]
#[tokio::test]
async fn cancel_refuses_terminal_requests(harness: Harness) {
    let request = harness.recorded("a").await;
    harness
        .move_to(&request, &[RequestStatus::InProgress, RequestStatus::Completed])
        .await;

    let result = harness.ledger.cancel(request.request_id()).await;
    assert!(matches!(
        result,
        Err(LedgerError::AlreadyTerminal { status: RequestStatus::Completed, .. })
    ));
}

#[rstest]
#[tokio::test]
async fn acknowledge_removes_only_terminal_requests(harness: Harness) {
    let running = harness.recorded("running").await;
    let done = harness.recorded("done").await;
    harness
        .move_to(&done, &[RequestStatus::InProgress, RequestStatus::Completed])
        .await;

    let refused = harness.ledger.acknowledge(running.request_id()).await;
    assert!(matches!(refused, Err(LedgerError::NotTerminal { .. })));

    let acknowledged = harness
        .ledger
        .acknowledge(done.request_id())
        .await
        .expect("acknowledge");
    assert_eq!(acknowledged.status(), RequestStatus::Completed);
    assert_eq!(
        harness.ledger.get(done.request_id()).await.expect("get"),
        None
    );
}

#[rstest]
#[tokio::test]
async fn prune_terminal_respects_age(harness: Harness) {
    let old = harness.recorded("old").await;
    harness
        .move_to(&old, &[RequestStatus::InProgress, RequestStatus::Failed])
        .await;
    harness.clock.advance(Duration::from_secs(3_600));
    let fresh = harness.recorded("fresh").await;
    harness
        .move_to(&fresh, &[RequestStatus::InProgress, RequestStatus::Completed])
        .await;
    harness.clock.advance(Duration::from_secs(1));
    let running = harness.recorded("running").await;

    let removed = harness
        .ledger
        .prune_terminal(Duration::from_secs(600))
        .await
        .expect("prune");

    assert_eq!(removed, 1);
    let remaining: Vec<_> = harness
        .ledger
        .list()
        .await
        .expect("list")
        .iter()
        .map(PendingRequest::request_id)
        .collect();
    assert_eq!(remaining, vec![fresh.request_id(), running.request_id()]);
}

#[rstest]
#[tokio::test]
async fn missing_request_cannot_be_cancelled(harness: Harness) {
    let request = harness.request("never recorded");
    let result = harness.ledger.cancel(request.request_id()).await;
    assert!(matches!(result, Err(LedgerError::NotFound(id)) if id == request.request_id()));
}
