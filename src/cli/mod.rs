//! CLI module
//!
//! Command-line interface for running the poller.
//!
//! # Commands
//!
//! - `run` - Poll the source until interrupted
//! - `validate` - Check the configuration file
//! - `state` - Show the stored checkpoint

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
