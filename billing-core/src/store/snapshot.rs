//! World Snapshot
//!
//! Point-in-time export of every record the billing core and its
//! collaborators hold. Audits load a snapshot into a fresh [`MemoryWorld`]
//! and never touch live state.

use super::{
    MemoryGroups, MemoryLedger, MemoryProviders, MemoryStore, MemoryWorld, OutFlowEntry,
    PaymentAccountEntry, SpPriceEntry,
};
use crate::config::BillingConfig;
use crate::error::BillingResult;
use crate::ports::{BillingStore, PaymentLedger, VirtualGroupRegistry};
use crate::types::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Serializable point-in-time world
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub config: BillingConfig,

    // Billing store
    #[serde(default)]
    pub buckets: Vec<Bucket>,
    #[serde(default)]
    pub charge_states: Vec<BucketChargeState>,
    #[serde(default)]
    pub local_bindings: Vec<LocalBinding>,
    #[serde(default)]
    pub rate_limits: Vec<RateLimit>,
    #[serde(default)]
    pub rate_limit_statuses: Vec<RateLimitStatus>,
    #[serde(default)]
    pub lock_records: Vec<LockRecord>,

    // Registries
    #[serde(default)]
    pub storage_providers: Vec<StorageProvider>,
    #[serde(default)]
    pub prices: Vec<SpPriceEntry>,
    #[serde(default)]
    pub families: Vec<GvgFamily>,
    #[serde(default)]
    pub gvgs: Vec<Gvg>,
    #[serde(default)]
    pub staking_per_byte: Decimal,

    // Payment ledger
    #[serde(default)]
    pub params: Vec<ParamsEntry>,
    #[serde(default)]
    pub stream_records: Vec<StreamRecord>,
    #[serde(default)]
    pub flows: Vec<OutFlowEntry>,
    #[serde(default)]
    pub payment_accounts: Vec<PaymentAccountEntry>,
}

impl WorldSnapshot {
    pub fn from_json(json: &str) -> BillingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> BillingResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl MemoryWorld {
    /// Export every record
    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> WorldSnapshot {
        WorldSnapshot {
            taken_at,
            config: self.config.clone(),
            buckets: self.store.list_buckets(),
            charge_states: self.store.list_charge_states(),
            local_bindings: self.store.list_all_bindings(),
            rate_limits: self.store.list_rate_limits(),
            rate_limit_statuses: self.store.list_rate_limit_statuses(),
            lock_records: self.store.list_lock_records(),
            storage_providers: self.providers.list_providers(),
            prices: self.providers.list_prices(),
            families: self.groups.list_families(),
            gvgs: self.groups.list_gvgs(),
            staking_per_byte: self.groups.staking_per_byte(),
            params: self.ledger.list_params(),
            stream_records: self.ledger.list_stream_records(),
            flows: self.ledger.list_all_flows(),
            payment_accounts: self.ledger.list_payment_accounts(),
        }
    }

    /// Load a snapshot; the config is validated first
    pub fn from_snapshot(snapshot: WorldSnapshot) -> BillingResult<Self> {
        snapshot.config.validate()?;

        let mut store = MemoryStore::new();
        for bucket in snapshot.buckets {
            store.save_bucket(bucket);
        }
        for state in snapshot.charge_states {
            store.save_charge_state(state);
        }
        for binding in snapshot.local_bindings {
            store.save_local_binding(binding);
        }
        for limit in snapshot.rate_limits {
            store.save_rate_limit(limit);
        }
        for status in snapshot.rate_limit_statuses {
            store.save_rate_limit_status(status);
        }
        for record in snapshot.lock_records {
            store.save_lock_record(record);
        }

        let mut providers = MemoryProviders::new();
        for provider in snapshot.storage_providers {
            providers.add_provider(provider);
        }
        for entry in snapshot.prices {
            providers.set_prices(entry.sp_id, entry.update_time, entry.prices);
        }

        let mut groups = MemoryGroups::new(snapshot.staking_per_byte);
        for family in snapshot.families {
            groups.save_family(family);
        }
        for gvg in snapshot.gvgs {
            groups.save_gvg(gvg);
        }

        let ledger = MemoryLedger::from_parts(
            snapshot.stream_records,
            snapshot.flows,
            snapshot.payment_accounts,
            snapshot.params,
        );

        Ok(Self {
            config: snapshot.config,
            store,
            ledger,
            providers,
            groups,
        })
    }
}
