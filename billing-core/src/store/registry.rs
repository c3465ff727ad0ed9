//! Memory Registries
//!
//! Storage-provider registry with a price history per SP, and the
//! virtual-group registry deriving GVG capacity from staked deposit.

use crate::error::{BillingError, BillingResult};
use crate::ports::{StorageProviderRegistry, VirtualGroupRegistry};
use crate::types::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit prices of one SP in effect from `update_time` on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpPriceEntry {
    pub sp_id: SpId,
    pub update_time: Timestamp,
    pub prices: UnitPrices,
}

/// In-memory storage-provider registry
#[derive(Clone, Debug, Default)]
pub struct MemoryProviders {
    providers: BTreeMap<SpId, StorageProvider>,
    prices: BTreeMap<SpId, BTreeMap<Timestamp, UnitPrices>>,
}

impl MemoryProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, provider: StorageProvider) {
        self.providers.insert(provider.id, provider);
    }

    /// Set the prices of `sp_id` in effect from `update_time` on
    pub fn set_prices(&mut self, sp_id: SpId, update_time: Timestamp, prices: UnitPrices) {
        self.prices.entry(sp_id).or_default().insert(update_time, prices);
    }

    pub fn list_providers(&self) -> Vec<StorageProvider> {
        self.providers.values().cloned().collect()
    }

    /// Whole price history, ordered by (SP, time)
    pub fn list_prices(&self) -> Vec<SpPriceEntry> {
        self.prices
            .iter()
            .flat_map(|(sp_id, history)| {
                history.iter().map(move |(time, prices)| SpPriceEntry {
                    sp_id: *sp_id,
                    update_time: *time,
                    prices: prices.clone(),
                })
            })
            .collect()
    }
}

impl StorageProviderRegistry for MemoryProviders {
    fn unit_prices(&self, sp_id: SpId, as_of: Timestamp) -> BillingResult<UnitPrices> {
        self.prices
            .get(&sp_id)
            .and_then(|history| history.range(..=as_of).next_back())
            .map(|(_, prices)| prices.clone())
            .ok_or(BillingError::PriceNotFound {
                sp_id: sp_id.get(),
                as_of,
            })
    }
}

/// In-memory virtual-group registry
#[derive(Clone, Debug)]
pub struct MemoryGroups {
    families: BTreeMap<FamilyId, GvgFamily>,
    gvgs: BTreeMap<GvgId, Gvg>,
    /// Deposit required per stored byte; zero disables the capacity check
    staking_per_byte: Decimal,
}

impl Default for MemoryGroups {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

impl MemoryGroups {
    pub fn new(staking_per_byte: Decimal) -> Self {
        Self {
            families: BTreeMap::new(),
            gvgs: BTreeMap::new(),
            staking_per_byte,
        }
    }

    pub fn staking_per_byte(&self) -> Decimal {
        self.staking_per_byte
    }

    pub fn set_staking_per_byte(&mut self, staking_per_byte: Decimal) {
        self.staking_per_byte = staking_per_byte;
    }

    pub fn save_family(&mut self, family: GvgFamily) {
        self.families.insert(family.id, family);
    }

    pub fn list_families(&self) -> Vec<GvgFamily> {
        self.families.values().cloned().collect()
    }

    /// Bytes `gvg` may store given its deposit. A non-positive quotient
    /// allows nothing; a positive one past `u64` is unbounded.
    pub fn capacity(&self, gvg: &Gvg) -> u64 {
        if self.staking_per_byte.is_zero() {
            return u64::MAX;
        }
        match gvg.total_deposit.checked_div(self.staking_per_byte) {
            Some(quotient) if quotient <= Decimal::ZERO => 0,
            Some(quotient) => quotient.floor().to_u64().unwrap_or(u64::MAX),
            None if gvg.total_deposit > Decimal::ZERO && self.staking_per_byte > Decimal::ZERO => u64::MAX,
            None => 0,
        }
    }
}

impl VirtualGroupRegistry for MemoryGroups {
    fn family(&self, sp_id: SpId, family_id: FamilyId) -> Option<GvgFamily> {
        self.families
            .get(&family_id)
            .filter(|f| f.primary_sp_id == sp_id)
            .cloned()
    }

    fn gvg(&self, gvg_id: GvgId) -> Option<Gvg> {
        self.gvgs.get(&gvg_id).cloned()
    }

    fn list_gvgs(&self) -> Vec<Gvg> {
        self.gvgs.values().cloned().collect()
    }

    fn reserve_capacity(&self, gvg_id: GvgId, extra_bytes: u64) -> BillingResult<Gvg> {
        let gvg = self
            .gvgs
            .get(&gvg_id)
            .ok_or(BillingError::GvgNotFound { gvg_id: gvg_id.get() })?;
        let available = self.capacity(gvg).saturating_sub(gvg.stored_size);
        if extra_bytes > available {
            return Err(BillingError::GvgCapacityExceeded {
                gvg_id: gvg_id.get(),
                requested: extra_bytes,
                available,
            });
        }
        Ok(gvg.clone())
    }

    fn save_gvg(&mut self, gvg: Gvg) {
        self.gvgs.insert(gvg.id, gvg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gvg(deposit: i64, stored: u64) -> Gvg {
        Gvg {
            id: GvgId::new(1),
            family_id: FamilyId::new(1),
            primary_sp_id: SpId::new(1),
            secondary_sp_ids: vec![SpId::new(2), SpId::new(3)],
            stored_size: stored,
            virtual_payment_address: Address::new("gvg"),
            total_deposit: Decimal::from(deposit),
        }
    }

    #[test]
    fn test_capacity_from_deposit() {
        let mut groups = MemoryGroups::new(Decimal::new(2, 0));
        groups.save_gvg(gvg(1001, 400));

        // floor(1001 / 2) = 500, 100 left
        assert!(groups.reserve_capacity(GvgId::new(1), 100).is_ok());
        let err = groups.reserve_capacity(GvgId::new(1), 101).unwrap_err();
        assert_eq!(
            err,
            BillingError::GvgCapacityExceeded {
                gvg_id: 1,
                requested: 101,
                available: 100
            }
        );
    }

    #[test]
    fn test_negative_deposit_has_no_capacity() {
        let mut groups = MemoryGroups::new(Decimal::ONE);
        groups.save_gvg(gvg(-1, 0));

        assert_eq!(groups.capacity(&gvg(-1, 0)), 0);
        let err = groups.reserve_capacity(GvgId::new(1), 1_000_000_000).unwrap_err();
        assert_eq!(
            err,
            BillingError::GvgCapacityExceeded {
                gvg_id: 1,
                requested: 1_000_000_000,
                available: 0
            }
        );
    }

    #[test]
    fn test_capacity_quotient_overflow() {
        // 1e12 / 1e-27 does not fit a Decimal
        let mut groups = MemoryGroups::new(Decimal::new(1, 27));
        groups.save_gvg(gvg(1_000_000_000_000, 0));
        assert_eq!(groups.capacity(&gvg(1_000_000_000_000, 0)), u64::MAX);
        assert!(groups.reserve_capacity(GvgId::new(1), 1_000_000_000).is_ok());

        // 2 / 1e-27 fits but exceeds u64
        assert_eq!(groups.capacity(&gvg(2, 0)), u64::MAX);

        let groups = MemoryGroups::new(Decimal::new(-1, 27));
        assert_eq!(groups.capacity(&gvg(1_000_000_000_000, 0)), 0);
    }

    #[test]
    fn test_family_scoped_to_primary_sp() {
        let mut groups = MemoryGroups::default();
        groups.save_family(GvgFamily {
            id: FamilyId::new(1),
            primary_sp_id: SpId::new(1),
            gvg_ids: vec![],
            virtual_payment_address: Address::new("fam"),
        });
        assert!(groups.family(SpId::new(1), FamilyId::new(1)).is_some());
        assert!(groups.family(SpId::new(2), FamilyId::new(1)).is_none());
    }

    #[test]
    fn test_price_history_lookup() {
        let mut providers = MemoryProviders::new();
        providers.set_prices(SpId::new(1), 10, UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ONE));
        assert!(providers.unit_prices(SpId::new(1), 9).is_err());
        assert!(providers.unit_prices(SpId::new(1), 10).is_ok());
        assert_eq!(providers.list_prices().len(), 1);
    }
}
