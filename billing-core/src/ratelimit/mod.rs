//! Rate Limiting
//!
//! Per-bucket ceiling on the total outgoing flow rate, keyed by
//! (payment account, bucket owner, bucket name).

mod machine;

pub use machine::*;
