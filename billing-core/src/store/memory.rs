//! Memory Store
//!
//! In-memory implementation of [`BillingStore`]. Ordered maps keep every
//! listing deterministic.

use crate::ports::BillingStore;
use crate::types::*;
use std::collections::BTreeMap;

/// In-memory billing store
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    buckets: BTreeMap<BucketId, Bucket>,
    charge_states: BTreeMap<BucketId, BucketChargeState>,
    bindings: BTreeMap<(BucketId, BindingId), LocalBinding>,
    binding_seq: BTreeMap<BucketId, u32>,
    rate_limits: BTreeMap<RateLimitKey, RateLimit>,
    rate_limit_statuses: BTreeMap<String, RateLimitStatus>,
    lock_records: BTreeMap<ObjectId, LockRecord>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All charge states, ordered by bucket id
    pub fn list_charge_states(&self) -> Vec<BucketChargeState> {
        self.charge_states.values().cloned().collect()
    }

    /// All local bindings, ordered by (bucket id, binding id)
    pub fn list_all_bindings(&self) -> Vec<LocalBinding> {
        self.bindings.values().cloned().collect()
    }

    /// All rate limits
    pub fn list_rate_limits(&self) -> Vec<RateLimit> {
        self.rate_limits.values().cloned().collect()
    }

    /// All rate limit statuses
    pub fn list_rate_limit_statuses(&self) -> Vec<RateLimitStatus> {
        self.rate_limit_statuses.values().cloned().collect()
    }
}

impl BillingStore for MemoryStore {
    // ==================== Buckets ====================

    fn bucket(&self, id: BucketId) -> Option<Bucket> {
        self.buckets.get(&id).cloned()
    }

    fn bucket_by_name(&self, name: &str) -> Option<Bucket> {
        self.buckets.values().find(|b| b.name == name).cloned()
    }

    fn list_buckets(&self) -> Vec<Bucket> {
        self.buckets.values().cloned().collect()
    }

    fn save_bucket(&mut self, bucket: Bucket) {
        self.buckets.insert(bucket.id, bucket);
    }

    // ==================== Charge state ====================

    fn charge_state(&self, bucket_id: BucketId) -> Option<BucketChargeState> {
        self.charge_states.get(&bucket_id).cloned()
    }

    fn save_charge_state(&mut self, state: BucketChargeState) {
        self.charge_states.insert(state.bucket_id, state);
    }

    fn remove_charge_state(&mut self, bucket_id: BucketId) {
        self.charge_states.remove(&bucket_id);
    }

    // ==================== Local bindings ====================

    fn local_binding(&self, bucket_id: BucketId, binding_id: BindingId) -> Option<LocalBinding> {
        self.bindings.get(&(bucket_id, binding_id)).cloned()
    }

    fn local_bindings(&self, bucket_id: BucketId) -> Vec<LocalBinding> {
        self.bindings
            .range((bucket_id, BindingId::new(0))..=(bucket_id, BindingId::new(u32::MAX)))
            .map(|(_, b)| b.clone())
            .collect()
    }

    fn save_local_binding(&mut self, binding: LocalBinding) {
        let seq = self.binding_seq.entry(binding.bucket_id).or_insert(0);
        if binding.id.get() > *seq {
            *seq = binding.id.get();
        }
        self.bindings.insert((binding.bucket_id, binding.id), binding);
    }

    fn remove_local_bindings(&mut self, bucket_id: BucketId) {
        self.bindings.retain(|(bucket, _), _| *bucket != bucket_id);
    }

    fn next_binding_id(&mut self, bucket_id: BucketId) -> BindingId {
        let seq = self.binding_seq.entry(bucket_id).or_insert(0);
        *seq += 1;
        BindingId::new(*seq)
    }

    // ==================== Rate limits ====================

    fn rate_limit(&self, key: &RateLimitKey) -> Option<RateLimit> {
        self.rate_limits.get(key).cloned()
    }

    fn save_rate_limit(&mut self, limit: RateLimit) {
        self.rate_limits.insert(limit.key.clone(), limit);
    }

    fn rate_limit_status(&self, bucket_name: &str) -> Option<RateLimitStatus> {
        self.rate_limit_statuses.get(bucket_name).cloned()
    }

    fn save_rate_limit_status(&mut self, status: RateLimitStatus) {
        self.rate_limit_statuses
            .insert(status.bucket_name.clone(), status);
    }

    fn remove_rate_limit_status(&mut self, bucket_name: &str) {
        self.rate_limit_statuses.remove(bucket_name);
    }

    // ==================== Lock records ====================

    fn lock_record(&self, object_id: ObjectId) -> Option<LockRecord> {
        self.lock_records.get(&object_id).cloned()
    }

    fn list_lock_records(&self) -> Vec<LockRecord> {
        self.lock_records.values().cloned().collect()
    }

    fn save_lock_record(&mut self, record: LockRecord) {
        self.lock_records.insert(record.object_id, record);
    }

    fn remove_lock_record(&mut self, object_id: ObjectId) {
        self.lock_records.remove(&object_id);
    }
}
