//! Billing Configuration

use crate::error::{BillingError, BillingResult};
use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Default tax pool address
pub const DEFAULT_TAX_POOL_ADDRESS: &str = "0x0000000000000000000000000000000000001005";

/// Billing configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Maximum local bindings a bucket may own
    pub max_local_bindings_per_bucket: u32,
    /// Payloads smaller than this are billed as this many bytes
    pub min_charge_size: u64,
    /// Destination of tax flows
    pub tax_pool_address: Address,
    /// Secondary count used to quote lock fees before a GVG is chosen
    pub redundant_secondary_count: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            max_local_bindings_per_bucket: 10,
            min_charge_size: 128 * 1024,
            tax_pool_address: Address::new(DEFAULT_TAX_POOL_ADDRESS),
            redundant_secondary_count: 6,
        }
    }
}

impl BillingConfig {
    /// Set the binding cap
    pub fn with_max_local_bindings(mut self, max: u32) -> Self {
        self.max_local_bindings_per_bucket = max;
        self
    }

    /// Set the minimum charge size
    pub fn with_min_charge_size(mut self, size: u64) -> Self {
        self.min_charge_size = size;
        self
    }

    /// Set the tax pool address
    pub fn with_tax_pool_address(mut self, address: Address) -> Self {
        self.tax_pool_address = address;
        self
    }

    /// Billed size of a payload
    pub fn charge_size(&self, payload_size: u64) -> u64 {
        payload_size.max(self.min_charge_size)
    }

    /// Validate configuration
    pub fn validate(&self) -> BillingResult<()> {
        if self.max_local_bindings_per_bucket == 0 {
            return Err(BillingError::InvalidConfig {
                reason: "max_local_bindings_per_bucket must be positive".to_string(),
            });
        }
        if self.tax_pool_address.is_empty() {
            return Err(BillingError::InvalidConfig {
                reason: "tax_pool_address must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BillingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_local_bindings_per_bucket, 10);
    }

    #[test]
    fn test_charge_size_rounds_up() {
        let config = BillingConfig::default().with_min_charge_size(1024);
        assert_eq!(config.charge_size(0), 1024);
        assert_eq!(config.charge_size(100), 1024);
        assert_eq!(config.charge_size(4096), 4096);
    }

    #[test]
    fn test_invalid_config() {
        let config = BillingConfig::default().with_max_local_bindings(0);
        assert!(config.validate().is_err());

        let config = BillingConfig::default().with_tax_pool_address(Address::new(""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: BillingConfig =
            serde_json::from_str(r#"{"min_charge_size": 1}"#).unwrap();
        assert_eq!(config.min_charge_size, 1);
        assert_eq!(config.redundant_secondary_count, 6);
    }
}
