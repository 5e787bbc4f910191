//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy object storage poller
#[derive(Parser, Debug)]
#[command(name = "solidafy-poller")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Poller configuration file (YAML)
    #[arg(short = 'C', long, global = true, default_value = "poller.yaml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the source and publish new objects
    Run {
        /// Run a single cycle regardless of the `poll` setting
        #[arg(long)]
        once: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Print the stored checkpoint of the configured source
    State,
}
