//! CLI Error Types
//!
//! Error types for the billing CLI application.

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Reconciliation found hard divergences
    #[error("Reconciliation found {count} divergences (digest {digest})")]
    Divergence { count: usize, digest: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Record not found in the snapshot
    #[error("Not found: {id}")]
    NotFound { id: String },

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Verifier error
    #[error("Verifier error: {0}")]
    VerifierError(#[from] billing_verifier::VerifierError),

    /// Billing core error
    #[error("Billing error: {0}")]
    BillingError(#[from] billing_core::BillingError),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        CliError::NotFound { id: id.into() }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::Divergence { .. } => 2,
            CliError::InvalidArgument { .. } => 3,
            CliError::NotFound { .. } => 4,
            CliError::IoError(_) => 5,
            CliError::JsonError(_) => 6,
            CliError::VerifierError(_) => 11,
            CliError::BillingError(_) => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("No snapshot given");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("No snapshot given"));
    }

    #[test]
    fn test_divergence_exit_code() {
        let err = CliError::Divergence {
            count: 3,
            digest: "ab".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("3 divergences"));
    }

    #[test]
    fn test_billing_error_passthrough() {
        let err: CliError = billing_core::BillingError::ParamsNotFound { as_of: 9 }.into();
        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().contains("BILL-PRICE-002"));
    }
}
