//! Port for providers that answer a generation call directly.

use crate::provider::domain::{ProviderFamily, ProviderId, ProviderResult};
use crate::task::domain::{GenerationPayload, Task};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Uniform `(task) -> payload` contract every dispatcher entry implements.
///
/// Adapters build the provider request, parse the response, and classify
/// failures into [`ProviderError`](crate::provider::domain::ProviderError).
/// The cancellation token is offered for adapters whose transport supports
/// aborting an in-flight request; ignoring it is allowed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> &ProviderId;

    /// Returns the family whose rate limit gates this provider.
    fn family(&self) -> ProviderFamily;

    /// Executes one generation attempt.
    async fn generate(
        &self,
        task: &Task,
        cancel: &CancellationToken,
    ) -> ProviderResult<GenerationPayload>;
}
