//! Step definitions for crash recovery scenarios.

pub mod world;

mod given;
mod then;
mod when;
