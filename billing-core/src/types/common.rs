//! Basic Types
//!
//! Naming conventions:
//! - `_id` suffix: Primary key identifiers
//! - `_address` / `_account` suffix: Ledger addresses
//! - `_time` suffix: Unix seconds

use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds (block time)
pub type Timestamp = i64;

// ============================================================
// ID Types (newtype pattern, non-interchangeable)
// ============================================================

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            pub fn new(id: $inner) -> Self {
                Self(id)
            }

            pub fn get(&self) -> $inner {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Bucket ID
    BucketId,
    u64
);
numeric_id!(
    /// Object ID
    ObjectId,
    u64
);
numeric_id!(
    /// Storage provider ID
    SpId,
    u32
);
numeric_id!(
    /// Global virtual group (redundancy group) ID
    GvgId,
    u32
);
numeric_id!(
    /// Global virtual group family ID
    FamilyId,
    u32
);
numeric_id!(
    /// Local binding (local virtual group) ID, unique within a bucket
    BindingId,
    u32
);

/// Ledger address (account, payment account or virtual payment address)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_ordered_and_transparent() {
        assert!(GvgId::new(1) < GvgId::new(2));
        assert_eq!(serde_json::to_string(&BucketId::new(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&Address::new("0xabc")).unwrap(), "\"0xabc\"");
    }

    #[test]
    fn test_address_display() {
        let addr = Address::from("0xfeed");
        assert_eq!(addr.to_string(), "0xfeed");
        assert!(!addr.is_empty());
    }
}
