//! Reconciliation Findings
//!
//! Address-level findings carry the per-bucket contributions that make up
//! the expected value, so a mismatch can be traced to the buckets behind it.

use billing_core::{Address, BucketId, GvgId, ObjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One bucket's share of an expected address value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketContribution {
    pub bucket_id: BucketId,
    pub bucket_name: String,
    /// Signed share: negative on the paying side of a flow
    pub amount: Decimal,
}

/// A difference between derived billing state and the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// Ledger net rate (active + frozen) differs from the recomputed one
    NetRate {
        address: Address,
        expected: Decimal,
        actual: Decimal,
        contributions: Vec<BucketContribution>,
    },

    /// Ledger lock balance differs from the sum of lock records
    LockBalance {
        address: Address,
        expected: Decimal,
        actual: Decimal,
        contributions: Vec<BucketContribution>,
    },

    /// Outgoing flow of a payer to one destination differs
    OutgoingFlow {
        payer: Address,
        destination: Address,
        expected: Decimal,
        actual: Decimal,
        contributions: Vec<BucketContribution>,
    },

    /// Bill of a bucket could not be computed
    BillUnavailable {
        bucket_id: BucketId,
        bucket_name: String,
        reason: String,
    },

    /// Billed size differs from the sum of binding charge sizes. The sum is
    /// widened so a corrupted store still yields a finding.
    BilledSize {
        bucket_id: BucketId,
        bucket_name: String,
        billed: u64,
        bound: u128,
    },

    /// GVG stored size differs from the sum of binding stored sizes
    GvgStoredSize {
        gvg_id: GvgId,
        recorded: u64,
        bound: u128,
    },

    /// Locked amount differs from the amount recomputed from its inputs
    LockAmount {
        object_id: ObjectId,
        payer: Address,
        recorded: Decimal,
        expected: Decimal,
    },

    /// Locked amount could not be recomputed
    LockUnpriced {
        object_id: ObjectId,
        payer: Address,
        reason: String,
    },
}

impl Divergence {
    /// Stable finding code
    pub fn code(&self) -> &'static str {
        match self {
            Divergence::NetRate { .. } => "AUDIT-ADDR-001",
            Divergence::LockBalance { .. } => "AUDIT-ADDR-002",
            Divergence::OutgoingFlow { .. } => "AUDIT-ADDR-003",
            Divergence::BillUnavailable { .. } => "AUDIT-BUCKET-001",
            Divergence::BilledSize { .. } => "AUDIT-BUCKET-002",
            Divergence::GvgStoredSize { .. } => "AUDIT-GVG-001",
            Divergence::LockAmount { .. } => "AUDIT-LOCK-001",
            Divergence::LockUnpriced { .. } => "AUDIT-LOCK-002",
        }
    }

    /// Addresses the finding is attributed to
    pub fn addresses(&self) -> Vec<&Address> {
        match self {
            Divergence::NetRate { address, .. } | Divergence::LockBalance { address, .. } => {
                vec![address]
            }
            Divergence::OutgoingFlow {
                payer, destination, ..
            } => vec![payer, destination],
            Divergence::LockAmount { payer, .. } | Divergence::LockUnpriced { payer, .. } => {
                vec![payer]
            }
            Divergence::BillUnavailable { .. }
            | Divergence::BilledSize { .. }
            | Divergence::GvgStoredSize { .. } => vec![],
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code())?;
        match self {
            Divergence::NetRate {
                address,
                expected,
                actual,
                contributions,
            } => write!(
                f,
                "net rate of {}: expected {}, ledger {} ({} buckets)",
                address,
                expected,
                actual,
                contributions.len()
            ),
            Divergence::LockBalance {
                address,
                expected,
                actual,
                ..
            } => write!(f, "lock balance of {}: expected {}, ledger {}", address, expected, actual),
            Divergence::OutgoingFlow {
                payer,
                destination,
                expected,
                actual,
                ..
            } => write!(
                f,
                "flow {} -> {}: expected {}, ledger {}",
                payer, destination, expected, actual
            ),
            Divergence::BillUnavailable {
                bucket_name, reason, ..
            } => write!(f, "bill of bucket {} unavailable: {}", bucket_name, reason),
            Divergence::BilledSize {
                bucket_name,
                billed,
                bound,
                ..
            } => write!(
                f,
                "bucket {} billed {} bytes, bindings hold {}",
                bucket_name, billed, bound
            ),
            Divergence::GvgStoredSize {
                gvg_id,
                recorded,
                bound,
            } => write!(f, "gvg {} records {} bytes, bindings hold {}", gvg_id, recorded, bound),
            Divergence::LockAmount {
                object_id,
                recorded,
                expected,
                ..
            } => write!(f, "object {} locked {}, expected {}", object_id, recorded, expected),
            Divergence::LockUnpriced {
                object_id, reason, ..
            } => write!(f, "lock of object {} cannot be priced: {}", object_id, reason),
        }
    }
}
