//! Storage Billing Core - Flows, Rate Limits and Virtual-Group Capacity
//!
//! Deterministic accounting engine of a decentralized object-storage
//! network. It computes which payment flows each bucket owes, gates them
//! behind per-bucket rate limits, routes payloads to redundancy groups and
//! reserves one-time fees for objects pending seal.
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`PriceResolver`] | Time-versioned unit prices and payment params |
//! | [`BillingCalculator`] | Charge footprint -> ordered flow list |
//! | [`RateLimiter`] | UNLIMITED / LIMITED / SUSPENDED per bucket |
//! | [`VirtualGroupBinder`] | Local bindings, GVG counters, rebind on migration |
//! | [`LockFeeManager`] | Lock / unlock of pre-seal deposits |
//! | [`ChargeKeeper`] | Lifecycle entry points combining all of the above |
//!
//! The reconciliation auditor lives in the `billing-verifier` crate.
//!
//! # Collaborators
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CRUD / permission layer, migration             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 Billing Core (This Crate)                   │
//! │   ChargeKeeper -> Calculator / RateLimiter / Binder / Lock  │
//! ├──────────────┬──────────────┬──────────────┬────────────────┤
//! │ BillingStore │ PaymentLedger│ SP registry  │ VG registry    │
//! └──────────────┴──────────────┴──────────────┴────────────────┘
//! ```
//!
//! Collaborators are reached only through the traits in [`ports`]; the
//! [`store`] module provides in-memory implementations.

pub mod billing;
pub mod binder;
pub mod charge;
pub mod config;
pub mod error;
pub mod lockfee;
pub mod ports;
pub mod pricing;
pub mod ratelimit;
pub mod store;
pub mod types;

// Re-export error types
pub use error::{BillingError, BillingResult, ErrorClass};

// Re-export all types
pub use types::*;

pub use billing::{apply_bill_changes, BillingCalculator};
pub use binder::{BindingEvent, RebindPlan, VirtualGroupBinder};
pub use charge::{ChargeKeeper, SealOutcome};
pub use config::BillingConfig;
pub use lockfee::LockFeeManager;
pub use ports::{
    BillingStore, KeeperView, Keepers, PaymentLedger, StorageProviderRegistry,
    VirtualGroupRegistry,
};
pub use pricing::PriceResolver;
pub use ratelimit::RateLimiter;
pub use store::{MemoryGroups, MemoryLedger, MemoryProviders, MemoryStore, MemoryWorld, WorldSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_keeper_builds() {
        let keeper = ChargeKeeper::new(BillingConfig::default()).unwrap();
        assert_eq!(keeper.config().max_local_bindings_per_bucket, 10);
    }
}
