//! CLI interface
//!
//! Command-line argument definitions for the `finchat` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Finance research chat engine
#[derive(Debug, Parser)]
#[command(name = "finchat", version, about)]
pub struct Cli {
    /// Path to a configuration file (default: ~/.finchat/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Submit a single message and print the reply
    Chat {
        /// Thread to continue; a new thread is created when omitted
        #[arg(long)]
        thread: Option<String>,

        /// The message to send
        message: String,
    },

    /// List threads, most recently active first
    Threads {
        /// Owner of the threads to list
        #[arg(long, default_value = "local")]
        user: String,
    },
}
