//! Price & Params Resolver
//!
//! Looks up the time-versioned unit prices of a storage provider and the
//! payment params in effect at one instant. Lookup failures are returned
//! exactly as the collaborator raised them: no bill is ever computed from
//! fallback prices.

use crate::error::BillingResult;
use crate::ports::{PaymentLedger, StorageProviderRegistry};
use crate::types::*;

/// Price resolver over the SP registry and payment params
#[derive(Clone, Copy)]
pub struct PriceResolver<'a> {
    providers: &'a dyn StorageProviderRegistry,
    ledger: &'a dyn PaymentLedger,
}

impl<'a> PriceResolver<'a> {
    pub fn new(providers: &'a dyn StorageProviderRegistry, ledger: &'a dyn PaymentLedger) -> Self {
        Self { providers, ledger }
    }

    /// Prices of `sp_id` and params, both as of `as_of`
    pub fn resolve(&self, sp_id: SpId, as_of: Timestamp) -> BillingResult<PriceSnapshot> {
        let prices = self.providers.unit_prices(sp_id, as_of)?;
        let params = self.ledger.versioned_params(as_of)?;
        Ok(PriceSnapshot {
            as_of,
            prices,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BillingError;
    use crate::store::{MemoryLedger, MemoryProviders};
    use rust_decimal::Decimal;

    #[test]
    fn test_resolve_picks_latest_before() {
        let mut providers = MemoryProviders::new();
        providers.set_prices(
            SpId::new(1),
            100,
            UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ONE),
        );
        providers.set_prices(
            SpId::new(1),
            200,
            UnitPrices::new(Decimal::TWO, Decimal::TWO, Decimal::TWO),
        );
        let mut ledger = MemoryLedger::new();
        ledger.set_params(
            0,
            VersionedParams {
                reserve_time: 10,
                validator_tax_rate: Decimal::ZERO,
            },
        );

        let resolver = PriceResolver::new(&providers, &ledger);
        assert_eq!(resolver.resolve(SpId::new(1), 150).unwrap().prices.read_price, Decimal::ONE);
        assert_eq!(resolver.resolve(SpId::new(1), 200).unwrap().prices.read_price, Decimal::TWO);
    }

    #[test]
    fn test_resolve_fails_closed() {
        let providers = MemoryProviders::new();
        let ledger = MemoryLedger::new();
        let resolver = PriceResolver::new(&providers, &ledger);

        let err = resolver.resolve(SpId::new(9), 5).unwrap_err();
        assert_eq!(err, BillingError::PriceNotFound { sp_id: 9, as_of: 5 });
    }
}
