//! Billing CLI - Command Line Interface
//!
//! Offline tooling over billing snapshots.
//!
//! # Usage
//!
//! ```text
//! billing [OPTIONS] <COMMAND>
//!
//! Commands:
//!   audit   Reconcile the snapshot against its payment ledger
//!   bill    Show the computed bill of a bucket
//!   config  Show or check configuration
//!
//! Options:
//!   -s, --snapshot <FILE>  Snapshot file [env: BILLING_SNAPSHOT]
//!   -f, --format <FORMAT>  Output format (json, table) [default: table]
//!   -v, --verbose          Enable verbose output
//! ```
//!
//! # Examples
//!
//! ```text
//! billing -s snapshot.json audit --allow 0xlegacy
//! billing -s snapshot.json -f json bill --bucket photos
//! ```
//!
//! `audit` exits with status 2 when hard divergences are found.

pub mod commands;
pub mod error;
pub mod handler;
pub mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};

/// Billing CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
