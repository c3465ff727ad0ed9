//! Rate-Limit State Machine
//!
//! UNLIMITED -> LIMITED -> SUSPENDED, per bucket. While SUSPENDED the
//! bucket's ledger contribution is exactly zero; the charge snapshot keeps
//! tracking the footprint so resuming re-applies the full bill.

use crate::billing::{apply_bill_changes, BillingCalculator};
use crate::error::{BillingError, BillingResult};
use crate::ports::{KeeperView, Keepers};
use crate::types::*;
use rust_decimal::Decimal;

/// Rate limiter
#[derive(Clone, Debug)]
pub struct RateLimiter {
    calculator: BillingCalculator,
}

impl RateLimiter {
    pub fn new(calculator: BillingCalculator) -> Self {
        Self { calculator }
    }

    /// Whether the bucket's flows are currently removed from the ledger
    pub fn is_suspended(view: KeeperView<'_>, bucket_name: &str) -> bool {
        view.store
            .rate_limit_status(bucket_name)
            .map(|status| status.is_limited)
            .unwrap_or(false)
    }

    /// Current state of a bucket
    pub fn state(view: KeeperView<'_>, bucket: &Bucket) -> RateLimitState {
        if Self::is_suspended(view, &bucket.name) {
            return RateLimitState::Suspended;
        }
        let key = RateLimitKey::new(
            bucket.payment_account.clone(),
            bucket.owner.clone(),
            bucket.name.clone(),
        );
        match view.store.rate_limit(&key) {
            Some(_) => RateLimitState::Limited,
            None => RateLimitState::Unlimited,
        }
    }

    /// Persist a new limit and suspend or resume the bucket's flows.
    ///
    /// Returns the state the bucket is left in.
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
        if !keepers.ledger.is_account_owner(payment_account, operator) {
            return Err(BillingError::NotAccountOwner {
                account: payment_account.to_string(),
                operator: operator.to_string(),
            });
        }

        let limit = RateLimit {
            key: RateLimitKey::new(payment_account.clone(), bucket_owner.clone(), bucket_name),
            flow_rate_limit: new_limit,
        };

        // Limit for a bucket not billed through this account: value only
        let bucket = keepers
            .store
            .bucket_by_name(bucket_name)
            .filter(|b| &b.owner == bucket_owner && &b.payment_account == payment_account);
        let Some(bucket) = bucket else {
            keepers.store.save_rate_limit(limit);
            return Ok(RateLimitState::Limited);
        };

        if Self::is_suspended(keepers.view(), bucket_name) {
            let state = BucketChargeState::capture(
                &bucket,
                &keepers.store.local_bindings(bucket.id),
                now,
            )?;
            let bill = self.calculator.compute_bill(&state, keepers.view())?;

            if bill.total_rate() <= new_limit {
                let zero = BucketBill::empty(bucket.id, bill.payer.clone());
                apply_bill_changes(&mut *keepers.ledger, &zero, &bill)?;
                keepers.store.save_charge_state(state);
                keepers.store.remove_rate_limit_status(bucket_name);
                keepers.store.save_rate_limit(limit);

                tracing::info!(
                    "Bucket {} resumed: rate {} within limit {}",
                    bucket_name,
                    bill.total_rate(),
                    new_limit
                );
                return Ok(RateLimitState::Limited);
            }

            keepers.store.save_rate_limit(limit);
            return Ok(RateLimitState::Suspended);
        }

        let current = self.calculator.stored_bill(&bucket, keepers.view())?;
        if current.total_rate() > new_limit {
            let zero = BucketBill::empty(bucket.id, current.payer.clone());
            apply_bill_changes(&mut *keepers.ledger, &current, &zero)?;
            keepers.store.save_rate_limit_status(RateLimitStatus {
                bucket_name: bucket_name.to_string(),
                is_limited: true,
                paying_address: current.payer.clone(),
            });
            keepers.store.save_rate_limit(limit);

            tracing::info!(
                "Bucket {} suspended: rate {} above limit {}",
                bucket_name,
                current.total_rate(),
                new_limit
            );
            return Ok(RateLimitState::Suspended);
        }

        keepers.store.save_rate_limit(limit);
        Ok(RateLimitState::Limited)
    }

    /// Gate a mutation that would bring the bucket's total rate to
    /// `new_total`.
    ///
    /// Without a persisted limit only self-funded buckets pass.
    pub fn check_under_limit(
        view: KeeperView<'_>,
        payment_account: &Address,
        bucket_owner: &Address,
        bucket_name: &str,
        new_total: Decimal,
    ) -> BillingResult<()> {
        let key = RateLimitKey::new(payment_account.clone(), bucket_owner.clone(), bucket_name);
        match view.store.rate_limit(&key) {
            None if view.ledger.is_account_owner(payment_account, bucket_owner) => Ok(()),
            None => Err(BillingError::RateLimitNotSet {
                bucket: bucket_name.to_string(),
                account: payment_account.to_string(),
            }),
            Some(limit) if new_total <= limit.flow_rate_limit => Ok(()),
            Some(limit) => Err(BillingError::RateLimitExceeded {
                bucket: bucket_name.to_string(),
                rate: new_total,
                limit: limit.flow_rate_limit,
            }),
        }
    }
}
