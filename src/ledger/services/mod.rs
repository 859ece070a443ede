//! Ledger services: the recovery surface, the poller, and the ledger-backed
//! provider adapter.

mod error;
mod ledger;
mod long_running;
mod tracker;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{PendingRequestLedger, USER_CANCELLED_REASON};
pub use long_running::LongRunningProvider;
pub use tracker::{OperationTracker, PollConfig, Settlement};
