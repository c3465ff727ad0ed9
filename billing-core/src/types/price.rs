//! Unit Prices and Versioned Params

use super::common::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit prices of a storage provider, per byte per second
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrices {
    /// Price of one byte of charged read quota
    pub read_price: Decimal,
    /// Price of one byte stored on the primary SP
    pub primary_store_price: Decimal,
    /// Price of one byte stored on one secondary SP
    pub secondary_store_price: Decimal,
}

impl UnitPrices {
    pub fn new(read_price: Decimal, primary_store_price: Decimal, secondary_store_price: Decimal) -> Self {
        Self {
            read_price,
            primary_store_price,
            secondary_store_price,
        }
    }
}

/// Time-versioned payment params
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedParams {
    /// Seconds of flow reserved up front for an object pending seal
    pub reserve_time: u64,
    /// Share of every user flow paid to the tax pool
    pub validator_tax_rate: Decimal,
}

/// Versioned params in effect from `update_time` on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamsEntry {
    pub update_time: Timestamp,
    pub params: VersionedParams,
}

/// Everything a bill needs at one instant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub as_of: Timestamp,
    pub prices: UnitPrices,
    pub params: VersionedParams,
}
