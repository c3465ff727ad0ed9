//! Lock Records

use super::common::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One-time deposit reserved for an object pending seal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Object ID
    pub object_id: ObjectId,
    /// Bucket the object belongs to
    pub bucket_id: BucketId,
    /// Account the deposit was locked on
    pub payer: Address,
    /// Primary SP whose prices applied
    pub primary_sp_id: SpId,
    /// Payload size of the object
    pub payload_size: u64,
    /// Time at which prices were resolved
    pub priced_at: Timestamp,
    /// Locked amount
    pub amount: Decimal,
}
