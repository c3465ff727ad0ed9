//! Lock-Fee Manager
//!
//! Before an object is sealed its GVG is unknown, so the fee is quoted
//! against the configured secondary count and reserved up front:
//!
//! ```text
//! rate   = trunc(primary × charge) + trunc(secondary × charge × count)
//!        + trunc(tax × user rate)
//! amount = rate × reserve_time
//! ```

use crate::billing::{rate_of, sum_rates, tax_of};
use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::ports::{KeeperView, Keepers};
use crate::pricing::PriceResolver;
use crate::types::*;
use rust_decimal::Decimal;

/// Lock-fee manager
#[derive(Clone, Debug)]
pub struct LockFeeManager {
    min_charge_size: u64,
    redundant_secondary_count: u32,
}

impl LockFeeManager {
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            min_charge_size: config.min_charge_size,
            redundant_secondary_count: config.redundant_secondary_count,
        }
    }

    /// Steady-state rate of one object under `snapshot`
    pub fn object_rate(&self, snapshot: &PriceSnapshot, payload_size: u64) -> BillingResult<Decimal> {
        let charge_size = payload_size.max(self.min_charge_size);
        let secondary_units = charge_size
            .checked_mul(self.redundant_secondary_count as u64)
            .ok_or_else(|| {
                BillingError::invariant("rate_overflow", format!("charge size {} overflows", charge_size))
            })?;

        let primary = rate_of(snapshot.prices.primary_store_price, charge_size)?;
        let secondary = rate_of(snapshot.prices.secondary_store_price, secondary_units)?;
        let user_rate = sum_rates([primary, secondary])?;
        let tax = tax_of(snapshot.params.validator_tax_rate, user_rate)?;
        sum_rates([user_rate, tax])
    }

    /// Amount reserved for `rate`
    pub fn lock_amount(rate: Decimal, reserve_time: u64) -> BillingResult<Decimal> {
        rate.checked_mul(Decimal::from(reserve_time)).ok_or_else(|| {
            BillingError::invariant("rate_overflow", format!("{} x {} overflows", rate, reserve_time))
        })
    }

    /// Amount a record should hold, recomputed from its own inputs
    pub fn expected_amount(&self, view: KeeperView<'_>, record: &LockRecord) -> BillingResult<Decimal> {
        let snapshot = PriceResolver::new(view.providers, view.ledger)
            .resolve(record.primary_sp_id, record.priced_at)?;
        let rate = self.object_rate(&snapshot, record.payload_size)?;
        Self::lock_amount(rate, snapshot.params.reserve_time)
    }

    /// Reserve the fee of a new object on the bucket's payment account
    pub fn lock(
        &self,
        keepers: &mut Keepers<'_>,
        object_id: ObjectId,
        bucket: &Bucket,
        payload_size: u64,
        now: Timestamp,
    ) -> BillingResult<LockRecord> {
        if keepers.store.lock_record(object_id).is_some() {
            return Err(BillingError::LockAlreadyExists {
                object_id: object_id.get(),
            });
        }

        let snapshot = PriceResolver::new(keepers.providers, &*keepers.ledger)
            .resolve(bucket.primary_sp_id, now)?;
        let rate = self.object_rate(&snapshot, payload_size)?;
        let amount = Self::lock_amount(rate, snapshot.params.reserve_time)?;

        if !amount.is_zero() {
            keepers.ledger.update_lock_balance(&bucket.payment_account, amount)?;
        }

        let record = LockRecord {
            object_id,
            bucket_id: bucket.id,
            payer: bucket.payment_account.clone(),
            primary_sp_id: bucket.primary_sp_id,
            payload_size,
            priced_at: now,
            amount,
        };
        keepers.store.save_lock_record(record.clone());

        tracing::info!(
            "Locked {} on {} for object {} ({} bytes)",
            amount,
            record.payer,
            object_id,
            payload_size
        );
        Ok(record)
    }

    /// Release the exact amount locked for an object
    pub fn unlock(&self, keepers: &mut Keepers<'_>, object_id: ObjectId) -> BillingResult<LockRecord> {
        let record = keepers
            .store
            .lock_record(object_id)
            .ok_or(BillingError::LockNotFound {
                object_id: object_id.get(),
            })?;

        if !record.amount.is_zero() {
            keepers.ledger.update_lock_balance(&record.payer, -record.amount)?;
        }
        keepers.store.remove_lock_record(object_id);

        tracing::info!(
            "Unlocked {} on {} for object {}",
            record.amount,
            record.payer,
            object_id
        );
        Ok(record)
    }
}
