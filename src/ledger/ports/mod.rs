//! Port definitions for ledger persistence.

mod repository;

pub use repository::{LedgerRepositoryError, LedgerRepositoryResult, PendingRequestRepository};
