//! CLI Commands Module
//!
//! Command definitions for the billing CLI.

pub mod audit;
pub mod bill;
pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Storage billing auditor
#[derive(Parser, Debug)]
#[command(name = "billing")]
#[command(version)]
#[command(about = "Storage billing snapshot auditor")]
#[command(long_about = "Loads a point-in-time billing snapshot and reconciles derived \
    bucket bills, bindings and lock records against the payment ledger.")]
pub struct Cli {
    /// Snapshot file (JSON) (env: BILLING_SNAPSHOT)
    #[arg(short, long, env = "BILLING_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Output format (json, table)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table format (human-readable)
    #[default]
    Table,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the snapshot against its payment ledger
    Audit(audit::AuditArgs),

    /// Show the computed bill of a bucket
    Bill(bill::BillArgs),

    /// Show or check configuration
    Config {
        #[command(subcommand)]
        command: Option<config::ConfigCommands>,
    },
}
