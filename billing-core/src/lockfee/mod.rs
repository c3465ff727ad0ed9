//! Lock Fees
//!
//! One-time deposit held for an object between creation and seal. On seal
//! the deposit is released and replaced by the object's continuous flow.

mod manager;

pub use manager::*;
