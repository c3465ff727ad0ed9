//! Output Formatting
//!
//! Utilities for formatting CLI output in various formats.

use crate::commands::bill::BillView;
use crate::commands::OutputFormat;
use billing_core::BillingConfig;
use billing_verifier::ReconciliationReport;
use serde::Serialize;

/// Print as JSON
fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error formatting JSON: {}", e),
    }
}

/// Print reconciliation report
pub fn print_report(report: &ReconciliationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            println!("Reconciliation Report");
            println!("=====================");
            println!("{}", report.summary());
            println!();
            print_row("Generated At", &report.generated_at.to_rfc3339());
            print_row("Digest", &report.digest);
            print_row("Buckets", &report.stats.buckets.to_string());
            print_row("Suspended", &report.stats.suspended_buckets.to_string());
            print_row("Addresses", &report.stats.addresses.to_string());
            print_row("GVGs", &report.stats.gvgs.to_string());
            print_row("Lock Records", &report.stats.lock_records.to_string());

            if !report.divergences.is_empty() {
                println!();
                println!("Divergences:");
                for divergence in &report.divergences {
                    println!("  - {}", divergence);
                }
            }
            if !report.known.is_empty() {
                println!();
                println!("Known (allow-listed):");
                for divergence in &report.known {
                    println!("  - {}", divergence);
                }
            }
        }
    }
}

/// Print bucket bill
pub fn print_bill(view: &BillView, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(view),
        OutputFormat::Table => {
            println!("Bucket Bill");
            println!("===========");
            print_row("Bucket", &format!("{} (id {})", view.bucket_name, view.bucket_id));
            print_row("Status", view.status.name());
            print_row("Rate Limit", &format!("{:?}", view.rate_limit).to_uppercase());
            print_row("Payer", view.bill.payer.as_str());
            if let Some(at) = view.priced_at {
                print_row("Priced At", &at.to_string());
            }
            if let Some(state) = &view.charge_state {
                print_row("Read Quota", &state.charged_read_quota.to_string());
                print_row("Billed Bytes", &state.total_charge_size.to_string());
            }
            print_separator();
            for flow in &view.bill.flows {
                print_row(flow.to.as_str(), &flow.rate.to_string());
            }
            print_separator();
            print_row("Total Rate", &view.total_rate.to_string());
        }
    }
}

/// Print billing config
pub fn print_config(config: &BillingConfig, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Table => {
            println!("Billing Configuration");
            println!("=====================");
            print_row("Max Bindings", &config.max_local_bindings_per_bucket.to_string());
            print_row("Min Charge Size", &config.min_charge_size.to_string());
            print_row("Tax Pool", config.tax_pool_address.as_str());
            print_row("Secondary Count", &config.redundant_secondary_count.to_string());
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{}", message);
}

/// Print a table row
pub fn print_row(key: &str, value: &str) {
    println!("{:<20} {}", key, value);
}

/// Print a separator line
pub fn print_separator() {
    println!("{}", "-".repeat(40));
}
