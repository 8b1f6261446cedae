// Tycoon LogMon - core/mod.rs
//
// Core business logic layer.
// Dependencies: util, plus walkdir/glob for metadata-only source resolution.
// Must NOT depend on: platform, app.

pub mod aggregate;
pub mod classify;
pub mod discovery;
pub mod export;
pub mod filter;
pub mod model;
pub mod parser;
