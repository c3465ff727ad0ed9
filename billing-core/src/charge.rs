//! Charge Keeper
//!
//! Entry point for the CRUD layer and migration handlers. Every bucket and
//! object lifecycle event that changes what a bucket owes goes through
//! here: the footprint is updated, the new bill is gated by the rate
//! limiter, and only the delta against the last applied bill reaches the
//! ledger.
//!
//! Each operation computes and checks everything it can before its first
//! write. The host still commits or discards a whole transaction.

use crate::billing::{apply_bill_changes, BillingCalculator};
use crate::binder::{BindingEvent, VirtualGroupBinder};
use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::lockfee::LockFeeManager;
use crate::ports::{BillingStore, KeeperView, Keepers};
use crate::ratelimit::RateLimiter;
use crate::types::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Bill change computed but not yet written
#[derive(Clone, Debug)]
struct PendingBill {
    prev: BucketBill,
    new: BucketBill,
    state: BucketChargeState,
    suspended: bool,
}

/// Result of sealing an object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealOutcome {
    /// Released lock
    pub lock: LockRecord,
    /// Binding the payload was routed through
    pub binding: BindingEvent,
    /// Bucket bill after the seal
    pub bill: BucketBill,
}

/// Charge keeper
#[derive(Clone, Debug)]
pub struct ChargeKeeper {
    config: BillingConfig,
    calculator: BillingCalculator,
    rate_limiter: RateLimiter,
    binder: VirtualGroupBinder,
    lock_fees: LockFeeManager,
}

impl ChargeKeeper {
    /// Create keeper from a validated config
    pub fn new(config: BillingConfig) -> BillingResult<Self> {
        config.validate()?;
        let calculator = BillingCalculator::new(&config);
        Ok(Self {
            rate_limiter: RateLimiter::new(calculator.clone()),
            binder: VirtualGroupBinder::new(&config),
            lock_fees: LockFeeManager::new(&config),
            calculator,
            config,
        })
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn calculator(&self) -> &BillingCalculator {
        &self.calculator
    }

    pub fn lock_fees(&self) -> &LockFeeManager {
        &self.lock_fees
    }

    fn load_bucket(store: &dyn BillingStore, bucket_id: BucketId) -> BillingResult<Bucket> {
        store.bucket(bucket_id).ok_or(BillingError::BucketNotFound {
            bucket: bucket_id.to_string(),
        })
    }

    // ==================== Bills ====================

    /// Bill of the bucket's last applied snapshot
    pub fn compute_bill(&self, view: KeeperView<'_>, bucket_id: BucketId) -> BillingResult<BucketBill> {
        let bucket = Self::load_bucket(view.store, bucket_id)?;
        self.calculator.stored_bill(&bucket, view)
    }

    /// Bill the bucket's live footprint would have at `as_of`
    pub fn preview_bill(
        &self,
        view: KeeperView<'_>,
        bucket_id: BucketId,
        as_of: Timestamp,
    ) -> BillingResult<BucketBill> {
        let bucket = Self::load_bucket(view.store, bucket_id)?;
        let state = BucketChargeState::capture(&bucket, &view.store.local_bindings(bucket_id), as_of)?;
        self.calculator.compute_bill(&state, view)
    }

    fn plan_bill(
        &self,
        view: KeeperView<'_>,
        bucket: &Bucket,
        bindings: &[LocalBinding],
        now: Timestamp,
    ) -> BillingResult<PendingBill> {
        let prev = self.calculator.stored_bill(bucket, view)?;
        let state = BucketChargeState::capture(bucket, bindings, now)?;
        let new = self.calculator.compute_bill(&state, view)?;

        let raises = new.total_rate() > prev.total_rate()
            || (new.payer != prev.payer && !new.total_rate().is_zero());
        if raises {
            RateLimiter::check_under_limit(
                view,
                &bucket.payment_account,
                &bucket.owner,
                &bucket.name,
                new.total_rate(),
            )?;
        }

        Ok(PendingBill {
            prev,
            new,
            state,
            suspended: RateLimiter::is_suspended(view, &bucket.name),
        })
    }

    fn commit_bill(&self, keepers: &mut Keepers<'_>, pending: PendingBill) -> BillingResult<BucketBill> {
        if !pending.suspended {
            apply_bill_changes(&mut *keepers.ledger, &pending.prev, &pending.new)?;
        }
        keepers.store.save_charge_state(pending.state);

        tracing::debug!(
            "Bucket {} billed at {}: rate {} -> {}{}",
            pending.new.bucket_id,
            pending.new.payer,
            pending.prev.total_rate(),
            pending.new.total_rate(),
            if pending.suspended { " (suspended)" } else { "" }
        );
        Ok(pending.new)
    }

    /// Re-price the bucket's live footprint at `now` and apply the change
    pub fn apply_or_refresh_bill(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        now: Timestamp,
    ) -> BillingResult<BucketBill> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        let bindings = keepers.store.local_bindings(bucket_id);
        let pending = self.plan_bill(keepers.view(), &bucket, &bindings, now)?;
        self.commit_bill(keepers, pending)
    }

    // ==================== Bucket lifecycle ====================

    /// Persist a new bucket and apply its first bill
    pub fn charge_new_bucket(
        &self,
        keepers: &mut Keepers<'_>,
        bucket: Bucket,
        now: Timestamp,
    ) -> BillingResult<BucketBill> {
        let bindings = keepers.store.local_bindings(bucket.id);
        let pending = self.plan_bill(keepers.view(), &bucket, &bindings, now)?;
        keepers.store.save_bucket(bucket);
        self.commit_bill(keepers, pending)
    }

    pub fn change_read_quota(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        quota: u64,
        now: Timestamp,
    ) -> BillingResult<BucketBill> {
        let mut bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        bucket.charged_read_quota = quota;

        let bindings = keepers.store.local_bindings(bucket_id);
        let pending = self.plan_bill(keepers.view(), &bucket, &bindings, now)?;
        keepers.store.save_bucket(bucket);
        self.commit_bill(keepers, pending)
    }

    /// Move the bucket's bill to another payment account
    pub fn change_payment_account(
        &self,
        keepers: &mut Keepers<'_>,
        operator: &Address,
        bucket_id: BucketId,
        new_account: &Address,
        now: Timestamp,
    ) -> BillingResult<BucketBill> {
        let mut bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        if &bucket.owner != operator {
            return Err(BillingError::NotBucketOwner {
                bucket: bucket.name,
                operator: operator.to_string(),
            });
        }
        if !keepers.ledger.is_account_owner(new_account, operator) {
            return Err(BillingError::NotAccountOwner {
                account: new_account.to_string(),
                operator: operator.to_string(),
            });
        }
        bucket.payment_account = new_account.clone();

        let bindings = keepers.store.local_bindings(bucket_id);
        let pending = self.plan_bill(keepers.view(), &bucket, &bindings, now)?;
        keepers.store.save_bucket(bucket);
        self.commit_bill(keepers, pending)
    }

    /// Reverse the bucket's bill and drop its billing records.
    ///
    /// Returns the bill that was removed.
    pub fn uncharge_bucket(&self, keepers: &mut Keepers<'_>, bucket_id: BucketId) -> BillingResult<BucketBill> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        let prev = self.calculator.stored_bill(&bucket, keepers.view())?;
        let suspended = RateLimiter::is_suspended(keepers.view(), &bucket.name);

        let bindings = keepers.store.local_bindings(bucket_id);
        let mut gvgs: BTreeMap<GvgId, Gvg> = BTreeMap::new();
        for binding in &bindings {
            let mut gvg = match gvgs.remove(&binding.gvg_id) {
                Some(gvg) => gvg,
                None => keepers.groups.gvg(binding.gvg_id).ok_or(BillingError::GvgNotFound {
                    gvg_id: binding.gvg_id.get(),
                })?,
            };
            gvg.stored_size = gvg
                .stored_size
                .checked_sub(binding.stored_size)
                .ok_or_else(|| BillingError::SizeUnderflow {
                    target: format!("gvg {}", gvg.id),
                    requested: binding.stored_size,
                    available: gvg.stored_size,
                })?;
            gvgs.insert(gvg.id, gvg);
        }

        if !suspended {
            let zero = BucketBill::empty(bucket_id, prev.payer.clone());
            apply_bill_changes(&mut *keepers.ledger, &prev, &zero)?;
        }
        for gvg in gvgs.into_values() {
            keepers.groups.save_gvg(gvg);
        }
        keepers.store.remove_local_bindings(bucket_id);
        keepers.store.remove_charge_state(bucket_id);
        keepers.store.remove_rate_limit_status(&bucket.name);

        tracing::info!("Bucket {} uncharged, rate {} removed", bucket.name, prev.total_rate());
        Ok(prev)
    }

    /// CREATED -> MIGRATING
    pub fn start_migration(&self, keepers: &mut Keepers<'_>, bucket_id: BucketId) -> BillingResult<()> {
        let mut bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        bucket.ensure_status(BucketStatus::Created)?;
        bucket.status = BucketStatus::Migrating;
        tracing::info!("Bucket {} migrating from SP {}", bucket.name, bucket.primary_sp_id);
        keepers.store.save_bucket(bucket);
        Ok(())
    }

    /// MIGRATING -> CREATED under a new primary SP and family.
    ///
    /// Rebind plan, new bill and rate limit are all checked before any
    /// counter moves.
    pub fn complete_migration(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        dst_sp_id: SpId,
        dst_family_id: FamilyId,
        mapping: &BTreeMap<GvgId, GvgId>,
        now: Timestamp,
    ) -> BillingResult<BucketBill> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        bucket.ensure_status(BucketStatus::Migrating)?;
        let family = keepers
            .groups
            .family(dst_sp_id, dst_family_id)
            .ok_or(BillingError::FamilyNotFound {
                sp_id: dst_sp_id.get(),
                family_id: dst_family_id.get(),
            })?;

        let plan = self.binder.plan_rebind(keepers.view(), &bucket, &family, mapping)?;
        let migrated = Bucket {
            primary_sp_id: dst_sp_id,
            family_id: dst_family_id,
            status: BucketStatus::Created,
            ..bucket
        };
        let pending = self.plan_bill(keepers.view(), &migrated, &plan.bindings, now)?;

        self.binder.apply_rebind(keepers, plan)?;
        tracing::info!(
            "Bucket {} migrated to SP {} family {}",
            migrated.name,
            dst_sp_id,
            dst_family_id
        );
        keepers.store.save_bucket(migrated);
        self.commit_bill(keepers, pending)
    }

    /// Stop accepting new payloads
    pub fn discontinue_bucket(&self, keepers: &mut Keepers<'_>, bucket_id: BucketId) -> BillingResult<()> {
        let mut bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        if bucket.status == BucketStatus::Discontinued {
            return Err(BillingError::InvalidBucketStatus {
                bucket: bucket.name,
                actual: BucketStatus::Discontinued.name().to_string(),
                expected: BucketStatus::Created.name().to_string(),
            });
        }
        bucket.status = BucketStatus::Discontinued;
        tracing::info!("Bucket {} discontinued", bucket.name);
        keepers.store.save_bucket(bucket);
        Ok(())
    }

    // ==================== Rate limits ====================

    #[allow(clippy::too_many_arguments)]
    pub fn set_rate_limit(
        &self,
        keepers: &mut Keepers<'_>,
        now: Timestamp,
        operator: &Address,
        bucket_owner: &Address,
        payment_account: &Address,
        bucket_name: &str,
        new_limit: Decimal,
    ) -> BillingResult<RateLimitState> {
        self.rate_limiter.set_rate_limit(
            keepers,
            now,
            operator,
            bucket_owner,
            payment_account,
            bucket_name,
            new_limit,
        )
    }

    pub fn is_suspended(&self, view: KeeperView<'_>, bucket_name: &str) -> bool {
        RateLimiter::is_suspended(view, bucket_name)
    }

    pub fn rate_limit_state(&self, view: KeeperView<'_>, bucket_id: BucketId) -> BillingResult<RateLimitState> {
        let bucket = Self::load_bucket(view.store, bucket_id)?;
        Ok(RateLimiter::state(view, &bucket))
    }

    // ==================== Bindings ====================

    /// Bind a payload without re-billing
    pub fn bind_new_payload(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        target: Option<GvgId>,
        payload_size: u64,
    ) -> BillingResult<BindingEvent> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        self.binder.bind_new_payload(keepers, &bucket, target, payload_size)
    }

    /// Unbind a payload without re-billing
    pub fn unbind_payload(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        binding_id: BindingId,
        payload_size: u64,
    ) -> BillingResult<LocalBinding> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        self.binder.unbind_payload(keepers, &bucket, binding_id, payload_size)
    }

    /// Rebind every binding into the bucket's current family, without
    /// re-billing
    pub fn rebind_all(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        mapping: &BTreeMap<GvgId, GvgId>,
    ) -> BillingResult<Vec<LocalBinding>> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        let family = keepers
            .groups
            .family(bucket.primary_sp_id, bucket.family_id)
            .ok_or(BillingError::FamilyNotFound {
                sp_id: bucket.primary_sp_id.get(),
                family_id: bucket.family_id.get(),
            })?;
        self.binder.rebind_all(keepers, &bucket, &family, mapping)
    }

    // ==================== Objects ====================

    /// Reserve the fee of a newly created object
    pub fn lock(
        &self,
        keepers: &mut Keepers<'_>,
        object_id: ObjectId,
        bucket_id: BucketId,
        payload_size: u64,
        now: Timestamp,
    ) -> BillingResult<LockRecord> {
        let bucket = Self::load_bucket(&*keepers.store, bucket_id)?;
        bucket.ensure_status(BucketStatus::Created)?;
        self.lock_fees.lock(keepers, object_id, &bucket, payload_size, now)
    }

    /// Release the fee of an object deleted before seal
    pub fn unlock(&self, keepers: &mut Keepers<'_>, object_id: ObjectId) -> BillingResult<LockRecord> {
        self.lock_fees.unlock(keepers, object_id)
    }

    /// Seal an object: release its fee, bind its payload and re-bill the
    /// bucket so the deposit becomes a continuous flow
    pub fn unlock_and_charge(
        &self,
        keepers: &mut Keepers<'_>,
        object_id: ObjectId,
        target: Option<GvgId>,
        now: Timestamp,
    ) -> BillingResult<SealOutcome> {
        let lock = self.lock_fees.unlock(keepers, object_id)?;
        let bucket = Self::load_bucket(&*keepers.store, lock.bucket_id)?;
        let binding = self
            .binder
            .bind_new_payload(keepers, &bucket, target, lock.payload_size)?;
        let bill = self.apply_or_refresh_bill(keepers, bucket.id, now)?;

        Ok(SealOutcome { lock, binding, bill })
    }

    /// Delete a sealed object
    pub fn delete_object(
        &self,
        keepers: &mut Keepers<'_>,
        bucket_id: BucketId,
        binding_id: BindingId,
        payload_size: u64,
        now: Timestamp,
    ) -> BillingResult<BucketBill> {
        self.unbind_payload(keepers, bucket_id, binding_id, payload_size)?;
        self.apply_or_refresh_bill(keepers, bucket_id, now)
    }
}
