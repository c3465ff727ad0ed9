//! Virtual Groups
//!
//! Relationships are ids, never references: a bucket names its family, a
//! binding names its GVG, a family lists its GVG ids. Every traversal goes
//! through a registry or store lookup.

use super::common::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Storage provider record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProvider {
    /// SP ID
    pub id: SpId,
    /// Operator address
    pub operator_address: Address,
    /// Funding address receiving settled income
    pub funding_address: Address,
}

/// Global virtual group (redundancy group)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gvg {
    /// GVG ID
    pub id: GvgId,
    /// Family the GVG belongs to
    pub family_id: FamilyId,
    /// Primary SP
    pub primary_sp_id: SpId,
    /// Secondary SPs, one per redundancy piece
    pub secondary_sp_ids: Vec<SpId>,
    /// Aggregate payload bytes stored through this GVG
    pub stored_size: u64,
    /// Payout address of secondary-store flows
    pub virtual_payment_address: Address,
    /// Staked deposit backing the GVG's capacity
    pub total_deposit: Decimal,
}

impl Gvg {
    /// Redundancy factor applied to secondary-store billing
    pub fn redundancy_factor(&self) -> u64 {
        self.secondary_sp_ids.len() as u64
    }
}

/// Global virtual group family
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GvgFamily {
    /// Family ID
    pub id: FamilyId,
    /// Primary SP
    pub primary_sp_id: SpId,
    /// Member GVGs, in creation order
    pub gvg_ids: Vec<GvgId>,
    /// Payout address of read and primary-store flows
    pub virtual_payment_address: Address,
}

impl GvgFamily {
    /// Default GVG for a bucket without bindings
    pub fn first_gvg(&self) -> Option<GvgId> {
        self.gvg_ids.first().copied()
    }

    pub fn contains(&self, gvg_id: GvgId) -> bool {
        self.gvg_ids.contains(&gvg_id)
    }
}

/// Local binding (local virtual group): how many bytes of one bucket route
/// through one GVG
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBinding {
    /// Binding ID, unique within the bucket
    pub id: BindingId,
    /// Owning bucket
    pub bucket_id: BucketId,
    /// Bound GVG
    pub gvg_id: GvgId,
    /// Payload bytes, counted against GVG capacity
    pub stored_size: u64,
    /// Billed bytes (payloads rounded up to the minimum charge size)
    pub total_charge_size: u64,
}

impl LocalBinding {
    pub fn new(id: BindingId, bucket_id: BucketId, gvg_id: GvgId) -> Self {
        Self {
            id,
            bucket_id,
            gvg_id,
            stored_size: 0,
            total_charge_size: 0,
        }
    }

    pub fn with_sizes(mut self, stored_size: u64, total_charge_size: u64) -> Self {
        self.stored_size = stored_size;
        self.total_charge_size = total_charge_size;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stored_size == 0 && self.total_charge_size == 0
    }
}
