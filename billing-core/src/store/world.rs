//! Memory World
//!
//! Bundles the four in-memory ports with a config. `transact` gives the
//! all-or-nothing commit the host chain provides per transaction: writes to
//! the store, ledger and group registry are discarded when the closure
//! fails.

use super::{MemoryGroups, MemoryLedger, MemoryProviders, MemoryStore};
use crate::config::BillingConfig;
use crate::error::BillingResult;
use crate::ports::{BillingStore, KeeperView, Keepers, VirtualGroupRegistry};
use crate::types::*;
use rust_decimal::Decimal;

/// First SP id handed to generated secondaries
const SECONDARY_SP_BASE: u32 = 1000;

/// In-memory ports plus config
#[derive(Clone, Debug)]
pub struct MemoryWorld {
    pub config: BillingConfig,
    pub store: MemoryStore,
    pub ledger: MemoryLedger,
    pub providers: MemoryProviders,
    pub groups: MemoryGroups,
}

impl MemoryWorld {
    pub fn new(config: BillingConfig) -> Self {
        Self {
            config,
            store: MemoryStore::new(),
            ledger: MemoryLedger::new(),
            providers: MemoryProviders::new(),
            groups: MemoryGroups::default(),
        }
    }

    /// Mutable handles over the live state (no rollback)
    pub fn keepers(&mut self) -> Keepers<'_> {
        Keepers::new(
            &mut self.store,
            &mut self.ledger,
            &self.providers,
            &mut self.groups,
        )
    }

    /// Read-only handles
    pub fn view(&self) -> KeeperView<'_> {
        KeeperView {
            store: &self.store,
            ledger: &self.ledger,
            providers: &self.providers,
            groups: &self.groups,
        }
    }

    /// Run `f` against scratch copies and commit them only on success
    pub fn transact<T, F>(&mut self, f: F) -> BillingResult<T>
    where
        F: FnOnce(&mut Keepers<'_>) -> BillingResult<T>,
    {
        let mut store = self.store.clone();
        let mut ledger = self.ledger.clone();
        let mut groups = self.groups.clone();

        let result = {
            let mut keepers = Keepers::new(&mut store, &mut ledger, &self.providers, &mut groups);
            f(&mut keepers)
        };

        if result.is_ok() {
            self.store = store;
            self.ledger = ledger;
            self.groups = groups;
        }
        result
    }

    /// Register an empty family
    pub fn add_family(&mut self, id: FamilyId, primary_sp_id: SpId, address: Address) {
        self.groups.save_family(GvgFamily {
            id,
            primary_sp_id,
            gvg_ids: Vec::new(),
            virtual_payment_address: address,
        });
    }

    /// Register a GVG with `secondaries` generated secondary SPs and append
    /// it to its family. Does nothing when the family is unknown.
    pub fn add_gvg(&mut self, id: GvgId, family_id: FamilyId, secondaries: u32, address: Address) {
        let Some(mut family) = self
            .groups
            .list_families()
            .into_iter()
            .find(|f| f.id == family_id)
        else {
            return;
        };

        let base = SECONDARY_SP_BASE + id.get() * 100;
        self.groups.save_gvg(Gvg {
            id,
            family_id,
            primary_sp_id: family.primary_sp_id,
            secondary_sp_ids: (0..secondaries).map(|i| SpId::new(base + i)).collect(),
            stored_size: 0,
            virtual_payment_address: address,
            total_deposit: Decimal::ZERO,
        });
        if !family.contains(id) {
            family.gvg_ids.push(id);
            self.groups.save_family(family);
        }
    }

    /// Set the staked deposit of a GVG
    pub fn set_gvg_deposit(&mut self, id: GvgId, deposit: Decimal) {
        if let Some(mut gvg) = self.groups.gvg(id) {
            gvg.total_deposit = deposit;
            self.groups.save_gvg(gvg);
        }
    }

    pub fn add_bucket(&mut self, bucket: Bucket) {
        self.store.save_bucket(bucket);
    }
}
