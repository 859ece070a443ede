//! Retry and dispatch services for provider calls.

mod dispatcher;
mod retry;

pub use dispatcher::{
    CallBound, DispatchCancelled, DispatchConfig, DispatchStatus, ProviderDispatcher,
    ProviderEntry,
};
pub use retry::{RetryConfig, RetryError, RetryPolicy};
