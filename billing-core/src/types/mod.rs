//! Billing Types

pub mod bucket;
pub mod common;
pub mod flow;
pub mod group;
pub mod lock;
pub mod price;
pub mod rate_limit;

pub use bucket::*;
pub use common::*;
pub use flow::*;
pub use group::*;
pub use lock::*;
pub use price::*;
pub use rate_limit::*;
