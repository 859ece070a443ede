//! Shared world state for crash recovery BDD scenarios.

use crate::test_helpers::{RemoteStudio, ScratchDir};
use atelier::ledger::adapters::FsPendingRequestRepository;
use atelier::ledger::domain::{PendingRequest, PendingRequestId};
use atelier::ledger::services::{
    LedgerError, OperationTracker, PendingRequestLedger, PollConfig, Settlement,
};
use atelier::provider::ports::OperationProvider;
use camino::Utf8PathBuf;
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;

/// Tracker type used by the BDD world.
pub type TestTracker = OperationTracker<FsPendingRequestRepository, DefaultClock>;

/// Scenario world for crash recovery behaviour tests.
pub struct RecoveryWorld {
    _scratch: ScratchDir,
    pub ledger_path: Utf8PathBuf,
    pub studio: Arc<RemoteStudio>,
    pub tracker: Option<Arc<TestTracker>>,
    pub request_id: Option<PendingRequestId>,
    pub last_settlement: Option<Result<Settlement, LedgerError>>,
    pub last_cancellation: Option<Result<PendingRequest, LedgerError>>,
}

impl RecoveryWorld {
    /// Creates a world with a fresh scratch directory and remote service.
    #[must_use]
    pub fn new() -> Self {
        let scratch = ScratchDir::new();
        let ledger_path = scratch.join("ledger");
        Self {
            _scratch: scratch,
            ledger_path,
            studio: RemoteStudio::new("veo"),
            tracker: None,
            request_id: None,
            last_settlement: None,
            last_cancellation: None,
        }
    }

    /// Opens a tracker over the ledger directory, as a fresh process would.
    pub fn open_tracker(&mut self) -> Result<Arc<TestTracker>, eyre::Report> {
        let repository = FsPendingRequestRepository::open(&self.ledger_path)
            .wrap_err("open ledger directory")?;
        let ledger = PendingRequestLedger::new(Arc::new(repository), Arc::new(DefaultClock));
        let provider: Arc<dyn OperationProvider> = self.studio.clone();
        let tracker = Arc::new(
            OperationTracker::new(
                ledger,
                PollConfig {
                    interval_ms: 10,
                    max_attempts: 500,
                    call_timeout_ms: 1_000,
                },
            )
            .with_provider(provider),
        );
        self.tracker = Some(Arc::clone(&tracker));
        Ok(tracker)
    }

    /// Returns the live tracker.
    pub fn tracker(&self) -> Result<&Arc<TestTracker>, eyre::Report> {
        self.tracker
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no tracker open in scenario world"))
    }

    /// Returns the request under test.
    pub fn request_id(&self) -> Result<PendingRequestId, eyre::Report> {
        self.request_id
            .ok_or_else(|| eyre::eyre!("no request recorded in scenario world"))
    }

    /// Reads the request under test from the ledger.
    pub fn request(&self) -> Result<PendingRequest, eyre::Report> {
        let id = self.request_id()?;
        run_async(self.tracker()?.ledger().get(id))
            .wrap_err("read ledger")?
            .ok_or_else(|| eyre::eyre!("request {id} missing from ledger"))
    }
}

impl Default for RecoveryWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RecoveryWorld {
    RecoveryWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
