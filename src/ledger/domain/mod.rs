//! Ledger domain types and the request state machine.

mod error;
mod ids;
mod request;
mod status;

pub use crate::provider::domain::OperationHandle;
pub use error::{LedgerDomainError, ParseRequestStatusError};
pub use ids::PendingRequestId;
pub use request::{PendingRequest, PendingRequestPatch};
pub use status::RequestStatus;
