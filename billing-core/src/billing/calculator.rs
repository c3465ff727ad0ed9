//! Billing Calculator
//!
//! Converts a bucket's billed footprint into the flow list its payer owes:
//! 1. Family flow: read quota × read price + billed bytes × primary price
//! 2. One flow per bound GVG: bytes × redundancy factor × secondary price
//! 3. Tax flow: tax rate × (1 + 2)
//!
//! Every component is truncated toward zero. Zero-rate flows are omitted.
//! Pure: nothing is written, callers decide whether to apply the result.

use crate::config::BillingConfig;
use crate::error::{BillingError, BillingResult};
use crate::ports::KeeperView;
use crate::pricing::PriceResolver;
use crate::types::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Rate of `units` at `price`, truncated toward zero
pub fn rate_of(price: Decimal, units: u64) -> BillingResult<Decimal> {
    price
        .checked_mul(Decimal::from(units))
        .map(|rate| rate.trunc())
        .ok_or_else(|| {
            BillingError::invariant("rate_overflow", format!("{} x {} overflows", price, units))
        })
}

/// Tax owed on `user_rate`, truncated toward zero
pub fn tax_of(tax_rate: Decimal, user_rate: Decimal) -> BillingResult<Decimal> {
    tax_rate
        .checked_mul(user_rate)
        .map(|tax| tax.trunc())
        .ok_or_else(|| {
            BillingError::invariant("rate_overflow", format!("{} x {} overflows", tax_rate, user_rate))
        })
}

/// Sum of `rates`, failing instead of overflowing
pub fn sum_rates<I>(rates: I) -> BillingResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    rates.into_iter().try_fold(Decimal::ZERO, |total, rate| {
        total.checked_add(rate).ok_or_else(|| {
            BillingError::invariant("rate_overflow", format!("{} + {} overflows", total, rate))
        })
    })
}

/// Billing calculator
#[derive(Clone, Debug)]
pub struct BillingCalculator {
    /// Destination of tax flows
    tax_pool_address: Address,
}

impl BillingCalculator {
    /// Create calculator from config
    pub fn new(config: &BillingConfig) -> Self {
        Self {
            tax_pool_address: config.tax_pool_address.clone(),
        }
    }

    /// Compute the bill of a charge snapshot, priced at its own price time
    pub fn compute_bill(
        &self,
        state: &BucketChargeState,
        view: KeeperView<'_>,
    ) -> BillingResult<BucketBill> {
        let resolver = PriceResolver::new(view.providers, view.ledger);
        let snapshot = resolver.resolve(state.primary_sp_id, state.price_time)?;

        let family = view
            .groups
            .family(state.primary_sp_id, state.family_id)
            .ok_or(BillingError::FamilyNotFound {
                sp_id: state.primary_sp_id.get(),
                family_id: state.family_id.get(),
            })?;

        let mut flows = Vec::new();

        // Read + primary store, both to the family
        let read_rate = rate_of(snapshot.prices.read_price, state.charged_read_quota)?;
        let primary_rate = rate_of(snapshot.prices.primary_store_price, state.total_charge_size)?;
        let family_rate = sum_rates([read_rate, primary_rate])?;
        if !family_rate.is_zero() {
            flows.push(Flow::new(family.virtual_payment_address.clone(), family_rate));
        }

        // Secondary store, one flow per distinct GVG
        let mut per_gvg: BTreeMap<GvgId, u64> = BTreeMap::new();
        for binding in &state.bindings {
            let size = per_gvg.entry(binding.gvg_id).or_insert(0);
            *size = size.checked_add(binding.charge_size).ok_or_else(|| {
                BillingError::invariant("rate_overflow", format!("gvg {} size overflows", binding.gvg_id))
            })?;
        }
        for (gvg_id, charge_size) in per_gvg {
            let gvg = view
                .groups
                .gvg(gvg_id)
                .ok_or(BillingError::GvgNotFound { gvg_id: gvg_id.get() })?;
            let units = charge_size.checked_mul(gvg.redundancy_factor()).ok_or_else(|| {
                BillingError::invariant("rate_overflow", format!("gvg {} size overflows", gvg_id))
            })?;
            let rate = rate_of(snapshot.prices.secondary_store_price, units)?;
            if !rate.is_zero() {
                flows.push(Flow::new(gvg.virtual_payment_address, rate));
            }
        }

        // Tax on everything above
        let user_rate = sum_rates(flows.iter().map(|f| f.rate))?;
        let tax = tax_of(snapshot.params.validator_tax_rate, user_rate)?;
        // Total rate must stay representable
        sum_rates([user_rate, tax])?;
        if !tax.is_zero() {
            flows.push(Flow::new(self.tax_pool_address.clone(), tax));
        }

        let bill = BucketBill {
            bucket_id: state.bucket_id,
            payer: state.payment_account.clone(),
            flows,
        };

        debug!(
            "Bill of bucket {} at {}: {} flows, total rate {}",
            state.bucket_id,
            state.price_time,
            bill.flows.len(),
            bill.total_rate()
        );

        Ok(bill)
    }

    /// Compute the bill of a bucket from its stored snapshot; empty when the
    /// bucket has never been charged
    pub fn stored_bill(&self, bucket: &Bucket, view: KeeperView<'_>) -> BillingResult<BucketBill> {
        match view.store.charge_state(bucket.id) {
            Some(state) => self.compute_bill(&state, view),
            None => Ok(BucketBill::empty(bucket.id, bucket.payment_account.clone())),
        }
    }
}
