//! Command-line composition root for modelrelay.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used only by the binary
use dotenvy as _;
use tokio as _;
use tracing_subscriber as _;

pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use commands::{Commands, ServeArgs};
pub use error::CliError;
pub use parser::Cli;
