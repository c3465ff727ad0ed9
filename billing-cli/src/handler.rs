//! Command Handlers
//!
//! Handler functions for CLI commands.

use crate::commands::{
    audit::AuditArgs,
    bill::{BillArgs, BillView},
    config::ConfigCommands,
    Cli, Commands,
};
use crate::error::{CliError, CliResult};
use crate::output;
use billing_core::{BillingConfig, BillingStore, ChargeKeeper, MemoryWorld, WorldSnapshot};
use billing_verifier::AuditConfig;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Audit(args) => handle_audit(&cli, args),
        Commands::Bill(args) => handle_bill(&cli, args),
        Commands::Config { command } => handle_config(&cli, command.as_ref()),
    }
}

/// Read a snapshot file
pub fn load_snapshot(path: Option<&Path>) -> CliResult<WorldSnapshot> {
    let path = path.ok_or_else(|| CliError::config("No snapshot given; pass --snapshot or set BILLING_SNAPSHOT"))?;
    let json = fs::read_to_string(path)?;
    let snapshot = WorldSnapshot::from_json(&json)?;
    info!(
        "Loaded snapshot {} taken at {} ({} buckets)",
        path.display(),
        snapshot.taken_at,
        snapshot.buckets.len()
    );
    Ok(snapshot)
}

/// Handle reconciliation
fn handle_audit(cli: &Cli, args: &AuditArgs) -> CliResult<()> {
    let snapshot = load_snapshot(cli.snapshot.as_deref())?;

    let base = match &args.audit_config {
        Some(path) => {
            debug!("Reading audit config {}", path.display());
            serde_json::from_str::<AuditConfig>(&fs::read_to_string(path)?)?
        }
        None => AuditConfig::default(),
    };
    let config = args.apply(base);

    let report = billing_verifier::reconcile_snapshot(snapshot, config)?;
    output::print_report(&report, cli.format);

    if report.has_divergence() {
        return Err(CliError::Divergence {
            count: report.divergences.len(),
            digest: report.digest,
        });
    }
    Ok(())
}

/// Handle bill inspection
fn handle_bill(cli: &Cli, args: &BillArgs) -> CliResult<()> {
    let world = MemoryWorld::from_snapshot(load_snapshot(cli.snapshot.as_deref())?)?;
    let bucket = world
        .store
        .bucket_by_name(&args.bucket)
        .ok_or_else(|| CliError::not_found(format!("bucket {}", args.bucket)))?;

    let keeper = ChargeKeeper::new(world.config.clone())?;
    let view = world.view();
    let charge_state = view.store.charge_state(bucket.id);

    let (bill, priced_at) = match args.at {
        Some(at) => (keeper.preview_bill(view, bucket.id, at)?, Some(at)),
        None => (
            keeper.compute_bill(view, bucket.id)?,
            charge_state.as_ref().map(|s| s.price_time),
        ),
    };

    let bill_view = BillView {
        bucket_id: bucket.id,
        bucket_name: bucket.name,
        status: bucket.status,
        rate_limit: keeper.rate_limit_state(view, bucket.id)?,
        priced_at,
        charge_state,
        total_rate: bill.total_rate(),
        bill,
    };
    output::print_bill(&bill_view, cli.format);
    Ok(())
}

/// Handle config commands
fn handle_config(cli: &Cli, command: Option<&ConfigCommands>) -> CliResult<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config = match &cli.snapshot {
                Some(path) => load_snapshot(Some(path.as_path()))?.config,
                None => BillingConfig::default(),
            };
            config.validate()?;
            output::print_config(&config, cli.format);
            Ok(())
        }
        Some(ConfigCommands::Validate { file }) => {
            let config: BillingConfig = serde_json::from_str(&fs::read_to_string(file)?)?;
            config.validate()?;
            output::print_config(&config, cli.format);
            output::print_success(&format!("{} is valid", file.display()));
            Ok(())
        }
    }
}
