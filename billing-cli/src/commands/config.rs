//! Config Commands
//!
//! Commands for inspecting billing and audit configuration.

use clap::Subcommand;
use std::path::PathBuf;

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective billing config (from the snapshot, else defaults)
    Show,

    /// Check a billing config file
    Validate {
        /// Config file (JSON)
        file: PathBuf,
    },
}
