//! Verifier Error Types

use thiserror::Error;

/// Verifier result type
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Verifier error
///
/// Divergences are findings, not errors: a reconciliation pass only fails
/// when it cannot produce a report at all.
#[derive(Error, Debug, Clone)]
pub enum VerifierError {
    /// Invalid audit configuration
    #[error("Invalid audit config: {0}")]
    InvalidConfig(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Billing core error
    #[error("Billing error: {0}")]
    BillingError(String),

    /// Computation error
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<billing_core::BillingError> for VerifierError {
    fn from(err: billing_core::BillingError) -> Self {
        VerifierError::BillingError(err.to_string())
    }
}

impl From<serde_json::Error> for VerifierError {
    fn from(err: serde_json::Error) -> Self {
        VerifierError::InternalError(err.to_string())
    }
}
