//! Billing
//!
//! Bill computation and the ledger delta between two bills.

mod calculator;

pub use calculator::*;

use crate::error::BillingResult;
use crate::ports::PaymentLedger;
use crate::types::*;

/// Replace `prev` with `new` in the ledger.
///
/// With an unchanged payer only the per-destination delta is applied, and
/// nothing is applied when the bills are equal. With a changed payer the old
/// payer's flows are reversed and the new payer's added.
pub fn apply_bill_changes(
    ledger: &mut dyn PaymentLedger,
    prev: &BucketBill,
    new: &BucketBill,
) -> BillingResult<()> {
    if prev.payer == new.payer {
        let delta = merge_flows(
            prev.flows
                .iter()
                .map(Flow::negated)
                .chain(new.flows.iter().cloned()),
        );
        if !delta.is_empty() {
            ledger.apply_flows(&new.payer, &delta)?;
        }
        return Ok(());
    }

    let reversed = merge_flows(prev.flows.iter().map(Flow::negated));
    if !reversed.is_empty() {
        ledger.apply_flows(&prev.payer, &reversed)?;
    }
    let added = merge_flows(new.flows.iter().cloned());
    if !added.is_empty() {
        ledger.apply_flows(&new.payer, &added)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedger;
    use rust_decimal::Decimal;

    fn bill(payer: &str, flows: &[(&str, i64)]) -> BucketBill {
        BucketBill {
            bucket_id: BucketId::new(1),
            payer: Address::new(payer),
            flows: flows
                .iter()
                .map(|(to, rate)| Flow::new(Address::new(*to), Decimal::from(*rate)))
                .collect(),
        }
    }

    #[test]
    fn test_same_payer_applies_delta() {
        let mut ledger = MemoryLedger::new();
        apply_bill_changes(
            &mut ledger,
            &BucketBill::empty(BucketId::new(1), Address::new("p")),
            &bill("p", &[("f", 10), ("t", 1)]),
        )
        .unwrap();
        apply_bill_changes(
            &mut ledger,
            &bill("p", &[("f", 10), ("t", 1)]),
            &bill("p", &[("f", 30), ("t", 3)]),
        )
        .unwrap();

        assert_eq!(ledger.netflow_rate(&Address::new("p")), Decimal::from(-33));
        assert_eq!(ledger.netflow_rate(&Address::new("f")), Decimal::from(30));
    }

    #[test]
    fn test_equal_bills_touch_nothing() {
        let mut ledger = MemoryLedger::new();
        let b = bill("p", &[("f", 10)]);
        apply_bill_changes(&mut ledger, &b, &b).unwrap();
        assert!(ledger.list_stream_records().is_empty());
    }

    #[test]
    fn test_payer_change_moves_flows() {
        let mut ledger = MemoryLedger::new();
        let old = bill("p1", &[("f", 10)]);
        apply_bill_changes(&mut ledger, &BucketBill::empty(BucketId::new(1), Address::new("p1")), &old).unwrap();
        apply_bill_changes(&mut ledger, &old, &bill("p2", &[("f", 10)])).unwrap();

        assert_eq!(ledger.netflow_rate(&Address::new("p1")), Decimal::ZERO);
        assert_eq!(ledger.netflow_rate(&Address::new("p2")), Decimal::from(-10));
        assert_eq!(ledger.netflow_rate(&Address::new("f")), Decimal::from(10));
        assert!(ledger.list_outgoing_flows(&Address::new("p1")).is_empty());
    }
}
