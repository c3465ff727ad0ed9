//! Memory Payment Ledger
//!
//! Reference streaming-payment ledger: outgoing flows per payer, one stream
//! record per address, payment-account ownership and the params history.
//! Used by tests and by snapshot-backed audits.

use crate::error::{BillingError, BillingResult};
use crate::ports::PaymentLedger;
use crate::types::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One outgoing flow as persisted by the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutFlowEntry {
    pub from: Address,
    pub to: Address,
    pub rate: Decimal,
}

/// Payment account and the address that owns it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAccountEntry {
    pub account: Address,
    pub owner: Address,
}

/// In-memory payment ledger
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    records: BTreeMap<Address, StreamRecord>,
    out_flows: BTreeMap<Address, BTreeMap<Address, Decimal>>,
    payment_accounts: BTreeMap<Address, Address>,
    params: BTreeMap<Timestamp, VersionedParams>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted parts, as they were
    pub fn from_parts(
        records: Vec<StreamRecord>,
        flows: Vec<OutFlowEntry>,
        accounts: Vec<PaymentAccountEntry>,
        params: Vec<ParamsEntry>,
    ) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.records.insert(record.account.clone(), record);
        }
        for flow in flows {
            *ledger
                .out_flows
                .entry(flow.from)
                .or_default()
                .entry(flow.to)
                .or_insert(Decimal::ZERO) += flow.rate;
        }
        for entry in accounts {
            ledger.payment_accounts.insert(entry.account, entry.owner);
        }
        for entry in params {
            ledger.params.insert(entry.update_time, entry.params);
        }
        ledger
    }

    /// Set params in effect from `update_time` on
    pub fn set_params(&mut self, update_time: Timestamp, params: VersionedParams) {
        self.params.insert(update_time, params);
    }

    /// Credit static balance
    pub fn deposit(&mut self, account: &Address, amount: Decimal) {
        self.record_mut(account).static_balance += amount;
    }

    /// Register a payment account owned by `owner`
    pub fn create_payment_account(&mut self, owner: &Address, account: &Address) {
        self.payment_accounts.insert(account.clone(), owner.clone());
        self.record_mut(account);
    }

    /// Freeze an account: its net rate is parked and it may not pay
    pub fn freeze(&mut self, account: &Address) {
        let record = self.record_mut(account);
        record.frozen_netflow_rate += record.netflow_rate;
        record.netflow_rate = Decimal::ZERO;
        record.status = StreamStatus::Frozen;
    }

    /// Net rate of an address (zero when unknown)
    pub fn netflow_rate(&self, account: &Address) -> Decimal {
        self.records
            .get(account)
            .map(|r| r.effective_netflow_rate())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn stream_record(&self, account: &Address) -> Option<StreamRecord> {
        self.records.get(account).cloned()
    }

    /// Every outgoing flow, ordered by (from, to)
    pub fn list_all_flows(&self) -> Vec<OutFlowEntry> {
        self.out_flows
            .iter()
            .flat_map(|(from, flows)| {
                flows.iter().map(move |(to, rate)| OutFlowEntry {
                    from: from.clone(),
                    to: to.clone(),
                    rate: *rate,
                })
            })
            .collect()
    }

    pub fn list_payment_accounts(&self) -> Vec<PaymentAccountEntry> {
        self.payment_accounts
            .iter()
            .map(|(account, owner)| PaymentAccountEntry {
                account: account.clone(),
                owner: owner.clone(),
            })
            .collect()
    }

    pub fn list_params(&self) -> Vec<ParamsEntry> {
        self.params
            .iter()
            .map(|(time, params)| ParamsEntry {
                update_time: *time,
                params: params.clone(),
            })
            .collect()
    }

    fn record_mut(&mut self, account: &Address) -> &mut StreamRecord {
        self.records
            .entry(account.clone())
            .or_insert_with(|| StreamRecord::new(account.clone()))
    }

    fn credit_rate(&mut self, account: &Address, rate: Decimal) {
        let record = self.record_mut(account);
        match record.status {
            StreamStatus::Active => record.netflow_rate += rate,
            StreamStatus::Frozen => record.frozen_netflow_rate += rate,
        }
    }
}

impl PaymentLedger for MemoryLedger {
    fn apply_flows(&mut self, payer: &Address, flows: &[Flow]) -> BillingResult<()> {
        if let Some(record) = self.records.get(payer) {
            if record.status == StreamStatus::Frozen {
                return Err(BillingError::AccountFrozen {
                    account: payer.to_string(),
                });
            }
        }

        for flow in flows {
            if flow.rate.is_zero() {
                continue;
            }
            let outgoing = self.out_flows.entry(payer.clone()).or_default();
            let rate = outgoing.entry(flow.to.clone()).or_insert(Decimal::ZERO);
            *rate += flow.rate;
            if rate.is_zero() {
                outgoing.remove(&flow.to);
            }

            self.credit_rate(payer, -flow.rate);
            self.credit_rate(&flow.to, flow.rate);
        }

        let count = self.out_flows.get(payer).map(|f| f.len()).unwrap_or(0);
        if count == 0 {
            self.out_flows.remove(payer);
        }
        if !flows.is_empty() {
            self.record_mut(payer).out_flow_count = count as u64;
        }
        Ok(())
    }

    fn update_lock_balance(&mut self, payer: &Address, delta: Decimal) -> BillingResult<StreamRecord> {
        let mut record = self
            .records
            .get(payer)
            .cloned()
            .unwrap_or_else(|| StreamRecord::new(payer.clone()));

        if delta > Decimal::ZERO && record.static_balance < delta {
            return Err(BillingError::InsufficientBalance {
                account: payer.to_string(),
                required: delta,
                available: record.static_balance,
            });
        }
        if delta < Decimal::ZERO && record.lock_balance + delta < Decimal::ZERO {
            return Err(BillingError::LockUnderflow {
                account: payer.to_string(),
                requested: -delta,
                locked: record.lock_balance,
            });
        }

        record.static_balance -= delta;
        record.lock_balance += delta;
        self.records.insert(payer.clone(), record.clone());
        Ok(record)
    }

    fn is_account_owner(&self, account: &Address, candidate: &Address) -> bool {
        account == candidate || self.payment_accounts.get(account) == Some(candidate)
    }

    fn versioned_params(&self, as_of: Timestamp) -> BillingResult<VersionedParams> {
        self.params
            .range(..=as_of)
            .next_back()
            .map(|(_, params)| params.clone())
            .ok_or(BillingError::ParamsNotFound { as_of })
    }

    fn list_stream_records(&self) -> Vec<StreamRecord> {
        self.records.values().cloned().collect()
    }

    fn list_outgoing_flows(&self, address: &Address) -> Vec<Flow> {
        self.out_flows
            .get(address)
            .map(|flows| {
                flows
                    .iter()
                    .map(|(to, rate)| Flow::new(to.clone(), *rate))
                    .collect()
            })
            .unwrap_or_default()
    }
}
