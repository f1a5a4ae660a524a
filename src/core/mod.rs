// CycleScope - core/mod.rs
//
// Core numeric layer.
// Must NOT depend on: app, platform, or perform any I/O directly.

pub mod align;
pub mod comparison;
pub mod export;
pub mod hp_filter;
pub mod model;
pub mod stats;
