//! Domain model for generation providers.

mod capability;
mod error;
mod ids;
mod operation;

pub use capability::Capability;
pub use error::{
    ParseProviderFamilyError, ProviderDomainError, ProviderError, ProviderErrorKind,
    ProviderResult,
};
pub use ids::{ProviderFamily, ProviderId};
pub use operation::{OperationHandle, PollStatus};
