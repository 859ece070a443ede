//! Run repository adapters.

mod fs;
mod memory;

pub use fs::FsRunRepository;
pub use memory::InMemoryRunRepository;
