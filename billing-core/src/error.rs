//! Billing Error Codes Registry
//!
//! Error code format: BILL-{area}-{sequence}
//! - BILL-PRE: Precondition violations (owner, status, missing records)
//! - BILL-CAP: Capacity and limitation errors
//! - BILL-PRICE: Price and parameter lookup failures
//! - BILL-LEDGER: Payment ledger rejections
//!
//! Every error aborts the enclosing transaction. None of them is retried.

use rust_decimal::Decimal;
use thiserror::Error;

/// Billing result type
pub type BillingResult<T> = Result<T, BillingError>;

/// Billing error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    // ============================================================
    // Precondition Errors (BILL-PRE-*)
    // ============================================================
    /// [BILL-PRE-001] Operator does not own the payment account
    #[error("[BILL-PRE-001] {operator} is not the owner of payment account {account}")]
    NotAccountOwner { account: String, operator: String },

    /// [BILL-PRE-002] Bucket not found
    #[error("[BILL-PRE-002] Bucket {bucket} not found")]
    BucketNotFound { bucket: String },

    /// [BILL-PRE-003] Bucket in wrong status
    #[error("[BILL-PRE-003] Bucket {bucket} is {actual}, expected {expected}")]
    InvalidBucketStatus {
        bucket: String,
        actual: String,
        expected: String,
    },

    /// [BILL-PRE-004] Family not found
    #[error("[BILL-PRE-004] Virtual group family {family_id} of SP {sp_id} not found")]
    FamilyNotFound { sp_id: u32, family_id: u32 },

    /// [BILL-PRE-005] Global virtual group not found
    #[error("[BILL-PRE-005] Global virtual group {gvg_id} not found")]
    GvgNotFound { gvg_id: u32 },

    /// [BILL-PRE-006] Local binding not found
    #[error("[BILL-PRE-006] Local binding {binding_id} not found in bucket {bucket_id}")]
    BindingNotFound { bucket_id: u64, binding_id: u32 },

    /// [BILL-PRE-007] Global virtual group does not belong to the bucket's family
    #[error("[BILL-PRE-007] Global virtual group {gvg_id} is not a member of family {family_id}")]
    GvgNotInFamily { gvg_id: u32, family_id: u32 },

    /// [BILL-PRE-008] Family has no global virtual group to bind to
    #[error("[BILL-PRE-008] Family {family_id} has no global virtual group")]
    EmptyFamily { family_id: u32 },

    /// [BILL-PRE-009] Lock record not found
    #[error("[BILL-PRE-009] No locked fee for object {object_id}")]
    LockNotFound { object_id: u64 },

    /// [BILL-PRE-010] Object already holds a locked fee
    #[error("[BILL-PRE-010] Object {object_id} already holds a locked fee")]
    LockAlreadyExists { object_id: u64 },

    /// [BILL-PRE-011] Operator does not own the bucket
    #[error("[BILL-PRE-011] {operator} is not the owner of bucket {bucket}")]
    NotBucketOwner { bucket: String, operator: String },

    /// [BILL-PRE-012] Storage provider not found
    #[error("[BILL-PRE-012] Storage provider {sp_id} not found")]
    StorageProviderNotFound { sp_id: u32 },

    // ============================================================
    // Capacity / Limitation Errors (BILL-CAP-*)
    // ============================================================
    /// [BILL-CAP-001] GVG lacks capacity
    #[error("[BILL-CAP-001] Global virtual group {gvg_id} cannot take {requested} bytes, {available} available")]
    GvgCapacityExceeded {
        gvg_id: u32,
        requested: u64,
        available: u64,
    },

    /// [BILL-CAP-002] Too many local bindings in bucket
    #[error("[BILL-CAP-002] Bucket {bucket_id} already has the maximum of {max} local bindings")]
    BindingLimitExceeded { bucket_id: u64, max: u32 },

    /// [BILL-CAP-003] Rebind mapping does not cover the bucket's GVG set
    #[error("[BILL-CAP-003] Rebind mapping for bucket {bucket_id} is incomplete: missing {missing:?}, unexpected {unexpected:?}")]
    IncompleteRebindMapping {
        bucket_id: u64,
        missing: Vec<u32>,
        unexpected: Vec<u32>,
    },

    /// [BILL-CAP-004] Rebind mapping sends two GVGs to the same destination
    #[error("[BILL-CAP-004] Rebind mapping for bucket {bucket_id} targets GVG {gvg_id} more than once")]
    DuplicateRebindTarget { bucket_id: u64, gvg_id: u32 },

    /// [BILL-CAP-005] Flow rate above the persisted limit
    #[error("[BILL-CAP-005] Flow rate {rate} of bucket {bucket} exceeds limit {limit}")]
    RateLimitExceeded {
        bucket: String,
        rate: Decimal,
        limit: Decimal,
    },

    /// [BILL-CAP-006] No limit persisted for a bucket paid by a foreign account
    #[error("[BILL-CAP-006] Flow rate limit is not set for bucket {bucket} paid by {account}")]
    RateLimitNotSet { bucket: String, account: String },

    /// [BILL-CAP-007] Size counter would underflow
    #[error("[BILL-CAP-007] Cannot release {requested} bytes from {target}, only {available} tracked")]
    SizeUnderflow {
        target: String,
        requested: u64,
        available: u64,
    },

    // ============================================================
    // Price / Params Errors (BILL-PRICE-*)
    // ============================================================
    /// [BILL-PRICE-001] No unit price in effect
    #[error("[BILL-PRICE-001] No storage price for SP {sp_id} at time {as_of}")]
    PriceNotFound { sp_id: u32, as_of: i64 },

    /// [BILL-PRICE-002] No versioned params in effect
    #[error("[BILL-PRICE-002] No versioned payment params at time {as_of}")]
    ParamsNotFound { as_of: i64 },

    // ============================================================
    // Ledger Errors (BILL-LEDGER-*)
    // ============================================================
    /// [BILL-LEDGER-001] Static balance would go negative
    #[error("[BILL-LEDGER-001] Insufficient balance in {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: String,
        required: Decimal,
        available: Decimal,
    },

    /// [BILL-LEDGER-002] Stream record is frozen
    #[error("[BILL-LEDGER-002] Stream record {account} is frozen")]
    AccountFrozen { account: String },

    /// [BILL-LEDGER-003] Lock balance would go negative
    #[error("[BILL-LEDGER-003] Cannot unlock {requested} from {account}, only {locked} locked")]
    LockUnderflow {
        account: String,
        requested: Decimal,
        locked: Decimal,
    },

    // ============================================================
    // General Errors
    // ============================================================
    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Invariant violation
    #[error("Invariant violation: {invariant} - {details}")]
    InvariantViolation { invariant: String, details: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Error class, used by hosts to decide how a failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Wrong operator/owner, missing record, wrong status
    Precondition,
    /// Capacity, binding cap, rebind mapping, rate limit
    Limitation,
    /// Price or param lookup failed
    Pricing,
    /// Payment ledger rejected the change
    Ledger,
    /// Broken invariant or bad input
    Internal,
}

impl BillingError {
    /// Classify the error
    pub fn class(&self) -> ErrorClass {
        use BillingError::*;
        match self {
            NotAccountOwner { .. }
            | BucketNotFound { .. }
            | InvalidBucketStatus { .. }
            | FamilyNotFound { .. }
            | GvgNotFound { .. }
            | BindingNotFound { .. }
            | GvgNotInFamily { .. }
            | EmptyFamily { .. }
            | LockNotFound { .. }
            | LockAlreadyExists { .. }
            | NotBucketOwner { .. }
            | StorageProviderNotFound { .. } => ErrorClass::Precondition,
            GvgCapacityExceeded { .. }
            | BindingLimitExceeded { .. }
            | IncompleteRebindMapping { .. }
            | DuplicateRebindTarget { .. }
            | RateLimitExceeded { .. }
            | RateLimitNotSet { .. }
            | SizeUnderflow { .. } => ErrorClass::Limitation,
            PriceNotFound { .. } | ParamsNotFound { .. } => ErrorClass::Pricing,
            InsufficientBalance { .. } | AccountFrozen { .. } | LockUnderflow { .. } => {
                ErrorClass::Ledger
            }
            InvalidConfig { .. } | InvariantViolation { .. } | SerializationError(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Create an invariant violation
    pub fn invariant(invariant: impl Into<String>, details: impl Into<String>) -> Self {
        BillingError::InvariantViolation {
            invariant: invariant.into(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let err = BillingError::BindingLimitExceeded {
            bucket_id: 7,
            max: 10,
        };
        assert!(err.to_string().starts_with("[BILL-CAP-002]"));

        let err = BillingError::PriceNotFound { sp_id: 1, as_of: 99 };
        assert!(err.to_string().contains("SP 1"));
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            BillingError::BucketNotFound {
                bucket: "b".into()
            }
            .class(),
            ErrorClass::Precondition
        );
        assert_eq!(
            BillingError::RateLimitExceeded {
                bucket: "b".into(),
                rate: Decimal::ONE,
                limit: Decimal::ZERO,
            }
            .class(),
            ErrorClass::Limitation
        );
        assert_eq!(
            BillingError::ParamsNotFound { as_of: 0 }.class(),
            ErrorClass::Pricing
        );
        assert_eq!(
            BillingError::AccountFrozen {
                account: "a".into()
            }
            .class(),
            ErrorClass::Ledger
        );
    }
}
