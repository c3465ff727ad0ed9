//! Collaborator Ports
//!
//! The billing core never depends on a concrete store, ledger or registry.
//! Every operation receives the handles it touches explicitly, bundled in
//! [`Keepers`] for mutating paths and [`KeeperView`] for read-only ones.
//!
//! Execution is single-threaded: one writer per block, transitions applied
//! in transaction order. None of the ports is `Sync`-bound and none of them
//! locks.

use crate::error::BillingResult;
use crate::types::*;
use rust_decimal::Decimal;

/// Shared key-value store
///
/// Key layout:
/// - bucket by id (and by name)
/// - charge state by bucket id
/// - local binding by (bucket id, binding id)
/// - rate limit by (payment account, bucket owner, bucket name)
/// - rate limit status by bucket name
/// - lock record by object id
pub trait BillingStore {
    // ==================== Buckets ====================

    /// Get bucket by id
    fn bucket(&self, id: BucketId) -> Option<Bucket>;

    /// Get bucket by name
    fn bucket_by_name(&self, name: &str) -> Option<Bucket>;

    /// All buckets, ordered by id
    fn list_buckets(&self) -> Vec<Bucket>;

    /// Insert or replace a bucket
    fn save_bucket(&mut self, bucket: Bucket);

    // ==================== Charge state ====================

    fn charge_state(&self, bucket_id: BucketId) -> Option<BucketChargeState>;

    fn save_charge_state(&mut self, state: BucketChargeState);

    fn remove_charge_state(&mut self, bucket_id: BucketId);

    // ==================== Local bindings ====================

    fn local_binding(&self, bucket_id: BucketId, binding_id: BindingId) -> Option<LocalBinding>;

    /// Bindings of a bucket, ordered by binding id
    fn local_bindings(&self, bucket_id: BucketId) -> Vec<LocalBinding>;

    fn save_local_binding(&mut self, binding: LocalBinding);

    fn remove_local_bindings(&mut self, bucket_id: BucketId);

    /// Allocate the next binding id of a bucket
    fn next_binding_id(&mut self, bucket_id: BucketId) -> BindingId;

    // ==================== Rate limits ====================

    fn rate_limit(&self, key: &RateLimitKey) -> Option<RateLimit>;

    fn save_rate_limit(&mut self, limit: RateLimit);

    fn rate_limit_status(&self, bucket_name: &str) -> Option<RateLimitStatus>;

    fn save_rate_limit_status(&mut self, status: RateLimitStatus);

    fn remove_rate_limit_status(&mut self, bucket_name: &str);

    // ==================== Lock records ====================

    fn lock_record(&self, object_id: ObjectId) -> Option<LockRecord>;

    /// All lock records, ordered by object id
    fn list_lock_records(&self) -> Vec<LockRecord>;

    fn save_lock_record(&mut self, record: LockRecord);

    fn remove_lock_record(&mut self, object_id: ObjectId);
}

/// Streaming-payment ledger
pub trait PaymentLedger {
    /// Add `flows` to the payer's outgoing flows (negative rates remove)
    fn apply_flows(&mut self, payer: &Address, flows: &[Flow]) -> BillingResult<()>;

    /// Move `delta` from static to lock balance (negative releases)
    fn update_lock_balance(&mut self, payer: &Address, delta: Decimal) -> BillingResult<StreamRecord>;

    /// Whether `candidate` owns `account` (an address owns itself)
    fn is_account_owner(&self, account: &Address, candidate: &Address) -> bool;

    /// Reserve time and tax rate in effect at `as_of`
    fn versioned_params(&self, as_of: Timestamp) -> BillingResult<VersionedParams>;

    /// Every stream record, ordered by account
    fn list_stream_records(&self) -> Vec<StreamRecord>;

    /// Outgoing flows of an address, ordered by destination
    fn list_outgoing_flows(&self, address: &Address) -> Vec<Flow>;
}

/// Storage-provider registry
pub trait StorageProviderRegistry {
    /// Unit prices of `sp_id` in effect at `as_of`
    fn unit_prices(&self, sp_id: SpId, as_of: Timestamp) -> BillingResult<UnitPrices>;
}

/// Virtual-group registry
pub trait VirtualGroupRegistry {
    fn family(&self, sp_id: SpId, family_id: FamilyId) -> Option<GvgFamily>;

    fn gvg(&self, gvg_id: GvgId) -> Option<Gvg>;

    /// All GVGs, ordered by id
    fn list_gvgs(&self) -> Vec<Gvg>;

    /// Check `gvg_id` can take `extra_bytes` more; returns the current record
    fn reserve_capacity(&self, gvg_id: GvgId, extra_bytes: u64) -> BillingResult<Gvg>;

    fn save_gvg(&mut self, gvg: Gvg);
}

/// Mutable handles for one transaction
pub struct Keepers<'a> {
    pub store: &'a mut dyn BillingStore,
    pub ledger: &'a mut dyn PaymentLedger,
    pub providers: &'a dyn StorageProviderRegistry,
    pub groups: &'a mut dyn VirtualGroupRegistry,
}

impl<'a> Keepers<'a> {
    pub fn new(
        store: &'a mut dyn BillingStore,
        ledger: &'a mut dyn PaymentLedger,
        providers: &'a dyn StorageProviderRegistry,
        groups: &'a mut dyn VirtualGroupRegistry,
    ) -> Self {
        Self {
            store,
            ledger,
            providers,
            groups,
        }
    }

    /// Read-only view of the same handles
    pub fn view(&self) -> KeeperView<'_> {
        KeeperView {
            store: &*self.store,
            ledger: &*self.ledger,
            providers: self.providers,
            groups: &*self.groups,
        }
    }
}

/// Read-only handles, used by pure paths and by the reconciliation pass
#[derive(Clone, Copy)]
pub struct KeeperView<'a> {
    pub store: &'a dyn BillingStore,
    pub ledger: &'a dyn PaymentLedger,
    pub providers: &'a dyn StorageProviderRegistry,
    pub groups: &'a dyn VirtualGroupRegistry,
}
