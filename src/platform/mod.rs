// Tycoon LogMon - platform/mod.rs
//
// Platform abstraction layer: per-user directories, config.toml, file reads.
// Dependencies: util, core data types (source rules), directories crate.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
