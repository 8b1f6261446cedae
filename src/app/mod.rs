// Tycoon LogMon - app/mod.rs
//
// Application layer: the one-shot monitor pipeline and the follow loop.
// Dependencies: core, platform, util.

pub mod monitor;
pub mod tail;
