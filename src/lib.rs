// Tycoon LogMon - lib.rs
//
// Library entry point. The command-line front end in `main.rs` is a thin
// shell over these modules; integration tests drive them directly.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
