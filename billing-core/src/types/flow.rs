//! Flows and Stream Records
//!
//! A flow is a continuously accruing rate from a payer to a destination.
//! The payment ledger sums flows into a net rate per address.

use super::common::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outgoing flow of a payer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    /// Destination address
    pub to: Address,
    /// Rate per second (may be negative when reversing a bill)
    pub rate: Decimal,
}

impl Flow {
    pub fn new(to: Address, rate: Decimal) -> Self {
        Self { to, rate }
    }

    pub fn negated(&self) -> Self {
        Self {
            to: self.to.clone(),
            rate: -self.rate,
        }
    }
}

/// Aggregate flows per destination, dropping zero rates. Output is ordered
/// by destination address.
pub fn merge_flows<I>(flows: I) -> Vec<Flow>
where
    I: IntoIterator<Item = Flow>,
{
    let mut merged: BTreeMap<Address, Decimal> = BTreeMap::new();
    for flow in flows {
        *merged.entry(flow.to).or_insert(Decimal::ZERO) += flow.rate;
    }
    merged
        .into_iter()
        .filter(|(_, rate)| !rate.is_zero())
        .map(|(to, rate)| Flow::new(to, rate))
        .collect()
}

/// Bill of a bucket: the ordered flow list its payer owes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketBill {
    /// Bucket ID
    pub bucket_id: BucketId,
    /// Payer
    pub payer: Address,
    /// Flows: family first, then one per GVG, then tax
    pub flows: Vec<Flow>,
}

impl BucketBill {
    /// Bill with no flows
    pub fn empty(bucket_id: BucketId, payer: Address) -> Self {
        Self {
            bucket_id,
            payer,
            flows: Vec::new(),
        }
    }

    /// Total outgoing rate, saturating at the `Decimal` bounds. Bills from
    /// the calculator are checked to stay within them.
    pub fn total_rate(&self) -> Decimal {
        self.flows
            .iter()
            .fold(Decimal::ZERO, |total, f| total.saturating_add(f.rate))
    }

    /// Rate owed to a destination
    pub fn rate_to(&self, to: &Address) -> Decimal {
        self.flows
            .iter()
            .filter(|f| &f.to == to)
            .fold(Decimal::ZERO, |total, f| total.saturating_add(f.rate))
    }

    /// Bill with every rate negated
    pub fn negated(&self) -> Self {
        Self {
            bucket_id: self.bucket_id,
            payer: self.payer.clone(),
            flows: self.flows.iter().map(Flow::negated).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// Stream record status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Active,
    Frozen,
}

/// Per-address ledger entry, owned by the payment ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Account address
    pub account: Address,
    /// Net rate: incoming minus outgoing
    pub netflow_rate: Decimal,
    /// Net rate parked while the record is frozen
    pub frozen_netflow_rate: Decimal,
    /// Settled balance
    pub static_balance: Decimal,
    /// Balance reserved for objects pending seal
    pub lock_balance: Decimal,
    /// Status
    pub status: StreamStatus,
    /// Number of outgoing flows
    pub out_flow_count: u64,
}

impl StreamRecord {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            netflow_rate: Decimal::ZERO,
            frozen_netflow_rate: Decimal::ZERO,
            static_balance: Decimal::ZERO,
            lock_balance: Decimal::ZERO,
            status: StreamStatus::Active,
            out_flow_count: 0,
        }
    }

    /// Net rate including any frozen part
    pub fn effective_netflow_rate(&self) -> Decimal {
        self.netflow_rate + self.frozen_netflow_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_flows_drops_zero_and_orders() {
        let merged = merge_flows(vec![
            Flow::new(Address::new("b"), Decimal::new(10, 0)),
            Flow::new(Address::new("a"), Decimal::new(5, 0)),
            Flow::new(Address::new("b"), Decimal::new(-10, 0)),
            Flow::new(Address::new("a"), Decimal::new(1, 0)),
        ]);
        assert_eq!(merged, vec![Flow::new(Address::new("a"), Decimal::new(6, 0))]);
    }

    #[test]
    fn test_bill_totals() {
        let bill = BucketBill {
            bucket_id: BucketId::new(1),
            payer: Address::new("payer"),
            flows: vec![
                Flow::new(Address::new("family"), Decimal::new(100, 0)),
                Flow::new(Address::new("tax"), Decimal::new(1, 0)),
            ],
        };
        assert_eq!(bill.total_rate(), Decimal::new(101, 0));
        assert_eq!(bill.negated().total_rate(), Decimal::new(-101, 0));
        assert_eq!(bill.rate_to(&Address::new("tax")), Decimal::ONE);
    }

    #[test]
    fn test_total_rate_saturates() {
        let bill = BucketBill {
            bucket_id: BucketId::new(1),
            payer: Address::new("payer"),
            flows: vec![
                Flow::new(Address::new("a"), Decimal::MAX),
                Flow::new(Address::new("b"), Decimal::MAX),
            ],
        };
        assert_eq!(bill.total_rate(), Decimal::MAX);
        assert_eq!(bill.negated().total_rate(), Decimal::MIN);
    }
}
