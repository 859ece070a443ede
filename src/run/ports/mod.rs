//! Port definitions for run persistence.

mod repository;

pub use repository::{RunRepository, RunRepositoryError, RunRepositoryResult, SlotRemoval};
