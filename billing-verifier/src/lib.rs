//! Billing Verifier
//!
//! Offline reconciliation of derived billing state against the payment
//! ledger. The auditor recomputes, from buckets, bindings and lock
//! records, what every ledger address should hold and reports each
//! difference:
//! - net flow rate per address (payers and payees)
//! - outgoing flows per payer and destination
//! - lock balance per payer and locked amount per object
//! - billed size per bucket and stored size per GVG
//!
//! The pass reads a [`KeeperView`](billing_core::KeeperView) only. It is
//! meant to run against a loaded [`WorldSnapshot`](billing_core::WorldSnapshot),
//! outside transaction processing.

pub mod config;
pub mod divergence;
pub mod reconcile;
pub mod report;

mod error;

pub use error::{VerifierError, VerifierResult};

pub use config::AuditConfig;
pub use divergence::{BucketContribution, Divergence};
pub use reconcile::Auditor;
pub use report::{ReconciliationReport, ScanStats};

use billing_core::{MemoryWorld, WorldSnapshot};

/// Load a snapshot and reconcile it
pub fn reconcile_snapshot(snapshot: WorldSnapshot, config: AuditConfig) -> VerifierResult<ReconciliationReport> {
    let world = MemoryWorld::from_snapshot(snapshot)?;
    let auditor = Auditor::new(&world.config, config)?;
    auditor.run_reconciliation(world.view())
}
