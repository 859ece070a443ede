//! Ledger repository adapters.

mod fs;
mod memory;

pub use fs::FsPendingRequestRepository;
pub use memory::InMemoryPendingRequestRepository;
