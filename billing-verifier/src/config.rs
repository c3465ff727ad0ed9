//! Audit Configuration

use crate::error::{VerifierError, VerifierResult};
use billing_core::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reconciliation settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Addresses with historically known divergences. Their findings are
    /// reported separately and do not fail the pass.
    #[serde(default)]
    pub known_addresses: BTreeSet<Address>,
    /// Largest absolute difference still treated as a match
    #[serde(default)]
    pub tolerance: Decimal,
}

impl AuditConfig {
    /// Allow-list an address
    pub fn with_known_address(mut self, address: Address) -> Self {
        self.known_addresses.insert(address);
        self
    }

    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn is_known(&self, address: &Address) -> bool {
        self.known_addresses.contains(address)
    }

    /// Whether `expected` and `actual` differ by more than the tolerance
    pub fn diverges(&self, expected: Decimal, actual: Decimal) -> bool {
        (expected - actual).abs() > self.tolerance
    }

    pub fn validate(&self) -> VerifierResult<()> {
        if self.tolerance.is_sign_negative() {
            return Err(VerifierError::InvalidConfig(format!(
                "tolerance must not be negative, got {}",
                self.tolerance
            )));
        }
        if let Some(empty) = self.known_addresses.iter().find(|a| a.is_empty()) {
            return Err(VerifierError::InvalidConfig(format!(
                "allow-list contains an empty address {:?}",
                empty.as_str()
            )));
        }
        Ok(())
    }
}
