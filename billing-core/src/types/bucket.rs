//! Bucket and Bucket Charge State
//!
//! A `BucketChargeState` is the snapshot of everything the bucket's last
//! applied bill depended on. The previous bill of any change is recomputed
//! from it, so a change of payer, family, quota or bindings is always
//! reversed exactly.

use super::common::*;
use super::group::LocalBinding;
use crate::error::{BillingError, BillingResult};
use serde::{Deserialize, Serialize};

/// Bucket lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BucketStatus {
    /// Accepting new payloads
    Created,
    /// Moving to another primary SP family
    Migrating,
    /// Scheduled for deletion, no new payloads
    Discontinued,
}

impl BucketStatus {
    pub fn name(&self) -> &'static str {
        match self {
            BucketStatus::Created => "CREATED",
            BucketStatus::Migrating => "MIGRATING",
            BucketStatus::Discontinued => "DISCONTINUED",
        }
    }
}

impl std::fmt::Display for BucketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Bucket record, owned by the bucket CRUD layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket ID
    pub id: BucketId,
    /// Globally unique bucket name
    pub name: String,
    /// Owner address
    pub owner: Address,
    /// Payment account the bucket bills through
    pub payment_account: Address,
    /// Primary storage provider
    pub primary_sp_id: SpId,
    /// Primary SP family the bucket stores through
    pub family_id: FamilyId,
    /// Read quota the owner pays for
    pub charged_read_quota: u64,
    /// Lifecycle status
    pub status: BucketStatus,
}

impl Bucket {
    /// Create a new bucket in CREATED status, self-funded by the owner
    pub fn new(
        id: BucketId,
        name: impl Into<String>,
        owner: Address,
        primary_sp_id: SpId,
        family_id: FamilyId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            payment_account: owner.clone(),
            owner,
            primary_sp_id,
            family_id,
            charged_read_quota: 0,
            status: BucketStatus::Created,
        }
    }

    /// Bill through another payment account
    pub fn with_payment_account(mut self, account: Address) -> Self {
        self.payment_account = account;
        self
    }

    /// Set charged read quota
    pub fn with_read_quota(mut self, quota: u64) -> Self {
        self.charged_read_quota = quota;
        self
    }

    /// Fail unless the bucket is in `expected` status
    pub fn ensure_status(&self, expected: BucketStatus) -> BillingResult<()> {
        if self.status != expected {
            return Err(BillingError::InvalidBucketStatus {
                bucket: self.name.clone(),
                actual: self.status.name().to_string(),
                expected: expected.name().to_string(),
            });
        }
        Ok(())
    }
}

/// Per-binding line of a charge snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargedBinding {
    /// Local binding ID
    pub binding_id: BindingId,
    /// GVG the bytes were billed to
    pub gvg_id: GvgId,
    /// Billed bytes
    pub charge_size: u64,
}

/// Billed snapshot of a bucket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketChargeState {
    /// Bucket ID
    pub bucket_id: BucketId,
    /// Payer of the billed flows
    pub payment_account: Address,
    /// Primary SP whose prices applied
    pub primary_sp_id: SpId,
    /// Family receiving read and primary-store flows
    pub family_id: FamilyId,
    /// Billed read quota
    pub charged_read_quota: u64,
    /// Total billed storage bytes
    pub total_charge_size: u64,
    /// Per-binding byte breakdown, ordered by binding id
    pub bindings: Vec<ChargedBinding>,
    /// Time at which prices were resolved
    pub price_time: Timestamp,
}

impl BucketChargeState {
    /// Capture the current footprint of a bucket, priced at `price_time`.
    /// Fails when the bound bytes do not fit a `u64`.
    pub fn capture(bucket: &Bucket, bindings: &[LocalBinding], price_time: Timestamp) -> BillingResult<Self> {
        let mut charged: Vec<ChargedBinding> = bindings
            .iter()
            .map(|b| ChargedBinding {
                binding_id: b.id,
                gvg_id: b.gvg_id,
                charge_size: b.total_charge_size,
            })
            .collect();
        charged.sort_by_key(|b| b.binding_id);

        let total_charge_size = charged
            .iter()
            .try_fold(0u64, |total, b| total.checked_add(b.charge_size))
            .ok_or_else(|| {
                BillingError::invariant("size_overflow", format!("bucket {} billed size overflows", bucket.name))
            })?;

        Ok(Self {
            bucket_id: bucket.id,
            payment_account: bucket.payment_account.clone(),
            primary_sp_id: bucket.primary_sp_id,
            family_id: bucket.family_id,
            charged_read_quota: bucket.charged_read_quota,
            total_charge_size,
            bindings: charged,
            price_time,
        })
    }

    /// Check the billed size equals the sum of the breakdown
    pub fn is_consistent(&self) -> bool {
        let bound: u128 = self.bindings.iter().map(|b| u128::from(b.charge_size)).sum();
        bound == u128::from(self.total_charge_size)
    }
}
