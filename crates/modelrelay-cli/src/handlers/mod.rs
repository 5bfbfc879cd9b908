//! Command handlers.
//!
//! Each handler is a thin `execute` function that loads configuration,
//! calls into the runtime and formats output for the terminal.

pub mod models;
pub mod providers;
pub mod serve;
