//! Port contracts implemented by provider adapters.
//!
//! HTTP request construction and response parsing live behind these traits
//! in the surrounding application.

pub mod generation;
pub mod operation;

pub use generation::GenerationProvider;
pub use operation::OperationProvider;

#[cfg(test)]
pub use generation::MockGenerationProvider;
#[cfg(test)]
pub use operation::MockOperationProvider;
