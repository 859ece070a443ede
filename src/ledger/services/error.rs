//! Service-level ledger errors.

use crate::ledger::{
    domain::{LedgerDomainError, PendingRequestId, RequestStatus},
    ports::LedgerRepositoryError,
};
use crate::provider::domain::ProviderId;
use thiserror::Error;

/// Errors returned by ledger services.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] LedgerRepositoryError),

    /// A state-machine rule was violated.
    #[error(transparent)]
    Domain(#[from] LedgerDomainError),

    /// The entry does not exist.
    #[error("pending request not found: {0}")]
    NotFound(PendingRequestId),

    /// The entry already reached a terminal status.
    #[error("pending request {request_id} is already {status}")]
    AlreadyTerminal {
        /// Entry identifier.
        request_id: PendingRequestId,
        /// Terminal status.
        status: RequestStatus,
    },

    /// The entry is still running.
    #[error("pending request {request_id} is still {status}")]
    NotTerminal {
        /// Entry identifier.
        request_id: PendingRequestId,
        /// Current status.
        status: RequestStatus,
    },

    /// No operation provider is registered under the id.
    #[error("no operation provider registered as {0}")]
    UnknownProvider(ProviderId),

    /// A poller is already attached to the entry.
    #[error("pending request {0} is already being polled")]
    AlreadyTracking(PendingRequestId),
}

/// Result type for ledger services.
pub type LedgerResult<T> = Result<T, LedgerError>;
