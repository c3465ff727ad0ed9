//! In-Memory Ports
//!
//! Reference implementations of every collaborator port, used by tests and
//! by snapshot-backed audits:
//! - [`MemoryStore`]: the shared billing key-value store
//! - [`MemoryLedger`]: streaming-payment ledger
//! - [`MemoryProviders`] / [`MemoryGroups`]: SP and virtual-group registries
//! - [`MemoryWorld`]: all of the above plus config, with rollback
//! - [`WorldSnapshot`]: serializable point-in-time export

mod ledger;
mod memory;
mod registry;
mod snapshot;
mod world;

pub use ledger::{MemoryLedger, OutFlowEntry, PaymentAccountEntry};
pub use memory::MemoryStore;
pub use registry::{MemoryGroups, MemoryProviders, SpPriceEntry};
pub use snapshot::WorldSnapshot;
pub use world::MemoryWorld;
