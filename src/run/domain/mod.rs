//! Run aggregate, result slots, and the slot merge rule.

mod error;
mod ids;
mod run;
mod slot;

pub use error::RunDomainError;
pub use ids::RunId;
pub use run::{MergeReport, Run, RunCounts, RunSummary};
pub use slot::{ResultSlot, SlotState};
