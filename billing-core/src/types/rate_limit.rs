//! Rate Limit Records

use super::common::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Key of a persisted rate limit: (payment account, bucket owner, bucket name)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RateLimitKey {
    pub payment_account: Address,
    pub bucket_owner: Address,
    pub bucket_name: String,
}

impl RateLimitKey {
    pub fn new(payment_account: Address, bucket_owner: Address, bucket_name: impl Into<String>) -> Self {
        Self {
            payment_account,
            bucket_owner,
            bucket_name: bucket_name.into(),
        }
    }
}

impl std::fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.payment_account, self.bucket_owner, self.bucket_name
        )
    }
}

/// Ceiling on a bucket's total outgoing flow rate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub key: RateLimitKey,
    pub flow_rate_limit: Decimal,
}

/// Present only while a bucket's flows are suspended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub bucket_name: String,
    pub is_limited: bool,
    /// Payer whose flows were removed
    pub paying_address: Address,
}

/// Observable state of the rate-limit machine for one bucket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateLimitState {
    /// No limit persisted
    Unlimited,
    /// Limit persisted, flows applied
    Limited,
    /// Flows removed from the ledger
    Suspended,
}
