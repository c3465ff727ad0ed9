//! Audit Command

use billing_core::Address;
use billing_verifier::AuditConfig;
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Reconciliation options
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Audit config file (JSON) (env: BILLING_AUDIT_CONFIG)
    #[arg(long = "audit-config", env = "BILLING_AUDIT_CONFIG")]
    pub audit_config: Option<PathBuf>,

    /// Allow-list an address with a known divergence (repeatable)
    #[arg(long = "allow", value_name = "ADDR")]
    pub allow: Vec<String>,

    /// Largest difference still treated as a match
    #[arg(long)]
    pub tolerance: Option<Decimal>,
}

impl AuditArgs {
    /// Layer the command line over a base config
    pub fn apply(&self, mut config: AuditConfig) -> AuditConfig {
        for address in &self.allow {
            config = config.with_known_address(Address::new(address.clone()));
        }
        if let Some(tolerance) = self.tolerance {
            config = config.with_tolerance(tolerance);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: AuditArgs,
    }

    #[test]
    fn test_repeated_allow() {
        let cli = TestCli::try_parse_from(["test", "--allow", "0xa", "--allow", "0xb", "--tolerance", "0.5"]).unwrap();
        let config = cli.args.apply(AuditConfig::default());
        assert!(config.is_known(&Address::new("0xa")));
        assert!(config.is_known(&Address::new("0xb")));
        assert_eq!(config.tolerance, Decimal::new(5, 1));
    }

    #[test]
    fn test_flags_extend_base_config() {
        let cli = TestCli::try_parse_from(["test", "--allow", "0xb"]).unwrap();
        let base = AuditConfig::default()
            .with_known_address(Address::new("0xa"))
            .with_tolerance(Decimal::ONE);
        let config = cli.args.apply(base);
        assert_eq!(config.known_addresses.len(), 2);
        assert_eq!(config.tolerance, Decimal::ONE);
    }
}
