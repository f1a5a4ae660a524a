// CycleScope - app/mod.rs
//
// Application layer: data sources and pipeline orchestration.
// Dependencies: core, platform.

pub mod analysis;
pub mod source;
