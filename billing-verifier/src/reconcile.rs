//! Reconciliation Auditor
//!
//! Read-only pass over a point-in-time view. Every bucket's bill is
//! recomputed with the same calculator the online path uses, summed into
//! expected per-address values and diffed against the ledger:
//!
//! - net rate (active + frozen) of every payer and payee
//! - outgoing flow of every payer, per destination
//! - lock balance of every payer, and each lock record's amount
//! - billed size vs bindings, GVG stored size vs bindings
//!
//! A bucket whose bill cannot be priced is reported and skipped; the scan
//! always covers every bucket.

use crate::config::AuditConfig;
use crate::divergence::{BucketContribution, Divergence};
use crate::error::VerifierResult;
use crate::report::{ReconciliationReport, ScanStats};
use billing_core::{
    Address, BillingCalculator, BillingConfig, Bucket, BucketId, GvgId, KeeperView,
    LockFeeManager, RateLimiter,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Expected value of one ledger quantity and the buckets behind it
#[derive(Clone, Debug, Default)]
struct Expected {
    total: Decimal,
    contributions: Vec<BucketContribution>,
}

impl Expected {
    // Saturates: a total pinned at the bound still diverges from the ledger
    fn add(&mut self, bucket_id: BucketId, bucket_name: &str, amount: Decimal) {
        self.total = self.total.saturating_add(amount);
        match self.contributions.last_mut() {
            Some(last) if last.bucket_id == bucket_id => last.amount = last.amount.saturating_add(amount),
            _ => self.contributions.push(BucketContribution {
                bucket_id,
                bucket_name: bucket_name.to_string(),
                amount,
            }),
        }
    }
}

/// Accumulated expectations of one pass
#[derive(Default)]
struct Ledger {
    net: BTreeMap<Address, Expected>,
    outgoing: BTreeMap<Address, BTreeMap<Address, Expected>>,
    locked: BTreeMap<Address, Expected>,
    gvg_stored: BTreeMap<GvgId, u128>,
}

/// Reconciliation auditor
pub struct Auditor {
    config: AuditConfig,
    calculator: BillingCalculator,
    lock_fees: LockFeeManager,
}

impl Auditor {
    /// Create auditor using the billing config the ledger was built with
    pub fn new(billing: &BillingConfig, config: AuditConfig) -> VerifierResult<Self> {
        config.validate()?;
        billing.validate()?;
        Ok(Self {
            config,
            calculator: BillingCalculator::new(billing),
            lock_fees: LockFeeManager::new(billing),
        })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Run one full pass. Never mutates `view`.
    pub fn run_reconciliation(&self, view: KeeperView<'_>) -> VerifierResult<ReconciliationReport> {
        let mut stats = ScanStats::default();
        let mut findings = Vec::new();
        let mut expected = Ledger::default();

        for bucket in view.store.list_buckets() {
            stats.buckets += 1;
            self.scan_bucket(view, &bucket, &mut expected, &mut stats, &mut findings);
        }

        stats.lock_records = self.scan_locks(view, &mut expected, &mut findings);
        stats.gvgs = Self::scan_gvgs(view, &expected, &mut findings);
        stats.addresses = self.scan_addresses(view, &mut expected, &mut findings);

        let (known, divergences): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|d| d.addresses().iter().any(|a| self.config.is_known(a)));

        for divergence in &divergences {
            warn!("Reconciliation divergence: {}", divergence);
        }
        for divergence in &known {
            info!("Known divergence: {}", divergence);
        }

        let report = ReconciliationReport::new(Utc::now(), stats, divergences, known)?;
        info!("{} (digest {})", report.summary(), report.digest);
        Ok(report)
    }

    fn scan_bucket(
        &self,
        view: KeeperView<'_>,
        bucket: &Bucket,
        expected: &mut Ledger,
        stats: &mut ScanStats,
        findings: &mut Vec<Divergence>,
    ) {
        let bindings = view.store.local_bindings(bucket.id);
        for binding in &bindings {
            *expected.gvg_stored.entry(binding.gvg_id).or_insert(0) += u128::from(binding.stored_size);
        }

        let bound: u128 = bindings.iter().map(|b| u128::from(b.total_charge_size)).sum();
        let state = view.store.charge_state(bucket.id);
        let billed = state.as_ref().map(|s| s.total_charge_size).unwrap_or(0);
        let consistent = state.as_ref().map(|s| s.is_consistent()).unwrap_or(true);
        if u128::from(billed) != bound || !consistent {
            findings.push(Divergence::BilledSize {
                bucket_id: bucket.id,
                bucket_name: bucket.name.clone(),
                billed,
                bound,
            });
        }

        // Suspended buckets contribute nothing to the ledger
        if RateLimiter::is_suspended(view, &bucket.name) {
            stats.suspended_buckets += 1;
            return;
        }

        let bill = match self.calculator.stored_bill(bucket, view) {
            Ok(bill) => bill,
            Err(err) => {
                findings.push(Divergence::BillUnavailable {
                    bucket_id: bucket.id,
                    bucket_name: bucket.name.clone(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        for flow in &bill.flows {
            expected
                .net
                .entry(bill.payer.clone())
                .or_default()
                .add(bucket.id, &bucket.name, -flow.rate);
            expected
                .net
                .entry(flow.to.clone())
                .or_default()
                .add(bucket.id, &bucket.name, flow.rate);
            expected
                .outgoing
                .entry(bill.payer.clone())
                .or_default()
                .entry(flow.to.clone())
                .or_default()
                .add(bucket.id, &bucket.name, flow.rate);
        }
        debug!(
            "Bucket {} expects {} flows from {}",
            bucket.name,
            bill.flows.len(),
            bill.payer
        );
    }

    fn scan_locks(&self, view: KeeperView<'_>, expected: &mut Ledger, findings: &mut Vec<Divergence>) -> usize {
        let records = view.store.list_lock_records();
        for record in &records {
            let bucket_name = view
                .store
                .bucket(record.bucket_id)
                .map(|b| b.name)
                .unwrap_or_default();
            expected
                .locked
                .entry(record.payer.clone())
                .or_default()
                .add(record.bucket_id, &bucket_name, record.amount);

            match self.lock_fees.expected_amount(view, record) {
                Ok(amount) if self.config.diverges(amount, record.amount) => {
                    findings.push(Divergence::LockAmount {
                        object_id: record.object_id,
                        payer: record.payer.clone(),
                        recorded: record.amount,
                        expected: amount,
                    });
                }
                Ok(_) => {}
                Err(err) => findings.push(Divergence::LockUnpriced {
                    object_id: record.object_id,
                    payer: record.payer.clone(),
                    reason: err.to_string(),
                }),
            }
        }
        records.len()
    }

    fn scan_gvgs(view: KeeperView<'_>, expected: &Ledger, findings: &mut Vec<Divergence>) -> usize {
        let gvgs = view.groups.list_gvgs();
        for gvg in &gvgs {
            let bound = expected.gvg_stored.get(&gvg.id).copied().unwrap_or(0);
            if u128::from(gvg.stored_size) != bound {
                findings.push(Divergence::GvgStoredSize {
                    gvg_id: gvg.id,
                    recorded: gvg.stored_size,
                    bound,
                });
            }
        }
        gvgs.len()
    }

    fn scan_addresses(&self, view: KeeperView<'_>, expected: &mut Ledger, findings: &mut Vec<Divergence>) -> usize {
        let records: BTreeMap<Address, _> = view
            .ledger
            .list_stream_records()
            .into_iter()
            .map(|r| (r.account.clone(), r))
            .collect();

        let addresses: BTreeSet<Address> = records
            .keys()
            .chain(expected.net.keys())
            .chain(expected.locked.keys())
            .cloned()
            .collect();

        for address in &addresses {
            let record = records.get(address);

            let net = expected.net.remove(address).unwrap_or_default();
            let actual = record.map(|r| r.effective_netflow_rate()).unwrap_or(Decimal::ZERO);
            if self.config.diverges(net.total, actual) {
                findings.push(Divergence::NetRate {
                    address: address.clone(),
                    expected: net.total,
                    actual,
                    contributions: net.contributions,
                });
            }

            let locked = expected.locked.remove(address).unwrap_or_default();
            let actual = record.map(|r| r.lock_balance).unwrap_or(Decimal::ZERO);
            if self.config.diverges(locked.total, actual) {
                findings.push(Divergence::LockBalance {
                    address: address.clone(),
                    expected: locked.total,
                    actual,
                    contributions: locked.contributions,
                });
            }

            let mut flows = expected.outgoing.remove(address).unwrap_or_default();
            let ledger_flows: BTreeMap<Address, Decimal> = view
                .ledger
                .list_outgoing_flows(address)
                .into_iter()
                .map(|f| (f.to, f.rate))
                .collect();
            let destinations: BTreeSet<Address> =
                flows.keys().chain(ledger_flows.keys()).cloned().collect();
            for destination in destinations {
                let want = flows.remove(&destination).unwrap_or_default();
                let actual = ledger_flows.get(&destination).copied().unwrap_or(Decimal::ZERO);
                if self.config.diverges(want.total, actual) {
                    findings.push(Divergence::OutgoingFlow {
                        payer: address.clone(),
                        destination,
                        expected: want.total,
                        actual,
                        contributions: want.contributions,
                    });
                }
            }
        }
        addresses.len()
    }
}
