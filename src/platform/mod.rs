// CycleScope - platform/mod.rs
//
// Platform abstraction layer: directories, config.toml, bounded file reads.
// Dependencies: standard library, directories crate, core model value types.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
