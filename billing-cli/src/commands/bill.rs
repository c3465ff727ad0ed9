//! Bill Command

use billing_core::{BucketBill, BucketChargeState, BucketId, BucketStatus, RateLimitState};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

/// Bill inspection options
#[derive(Args, Debug)]
pub struct BillArgs {
    /// Bucket name
    #[arg(short, long)]
    pub bucket: String,

    /// Price the bucket's current footprint at this unix time instead of
    /// showing the applied bill
    #[arg(long, value_name = "TIMESTAMP")]
    pub at: Option<i64>,
}

/// What `bill` prints
#[derive(Clone, Debug, Serialize)]
pub struct BillView {
    pub bucket_id: BucketId,
    pub bucket_name: String,
    pub status: BucketStatus,
    pub rate_limit: RateLimitState,
    /// Time the flows were priced at
    pub priced_at: Option<i64>,
    pub charge_state: Option<BucketChargeState>,
    pub bill: BucketBill,
    pub total_rate: Decimal,
}
