//! Port for providers using the create-then-poll pattern.

use crate::provider::domain::{OperationHandle, PollStatus, ProviderFamily, ProviderId, ProviderResult};
use crate::task::domain::Task;
use async_trait::async_trait;

/// Long-running provider contract.
///
/// `submit` starts the external operation and returns its handle; `poll`
/// reports its status. A failed operation is reported as an `Err` from
/// `poll`, classified like any other provider error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OperationProvider: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> &ProviderId;

    /// Returns the family whose rate limit gates this provider.
    fn family(&self) -> ProviderFamily;

    /// Starts the external operation.
    async fn submit(&self, task: &Task) -> ProviderResult<OperationHandle>;

    /// Checks the status of a previously submitted operation.
    async fn poll(&self, handle: &OperationHandle) -> ProviderResult<PollStatus>;
}
