//! Ledger domain errors.

use super::{PendingRequestId, RequestStatus};
use thiserror::Error;

/// Errors raised by ledger state changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerDomainError {
    /// The requested status change is not allowed.
    #[error("cannot move pending request from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: RequestStatus,
        /// Requested status.
        to: RequestStatus,
    },

    /// The entry cannot be resumed from its current state.
    #[error("pending request {request_id} cannot be resumed from {status}")]
    NotResumable {
        /// Entry identifier.
        request_id: PendingRequestId,
        /// Status that blocks resumption.
        status: RequestStatus,
    },
}

/// Error returned while parsing request statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown pending request status: {0}")]
pub struct ParseRequestStatusError(pub String);
