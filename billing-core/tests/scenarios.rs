//! Billing scenarios and properties over the in-memory ports

use billing_core::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const SP: u32 = 1;
const FAMILY: u32 = 1;

fn addr(s: &str) -> Address {
    Address::new(s)
}

fn params(tax_rate: Decimal) -> VersionedParams {
    VersionedParams {
        reserve_time: 3600,
        validator_tax_rate: tax_rate,
    }
}

/// One SP with a family of two 6-secondary GVGs, a funded owner and the
/// given prices
fn world(prices: UnitPrices, tax_rate: Decimal) -> MemoryWorld {
    let mut world = MemoryWorld::new(BillingConfig::default().with_min_charge_size(1));
    world.providers.set_prices(SpId::new(SP), 0, prices);
    world.ledger.set_params(0, params(tax_rate));
    world.ledger.deposit(&addr("owner"), Decimal::from(1_000_000_000_000i64));
    world.add_family(FamilyId::new(FAMILY), SpId::new(SP), addr("family"));
    world.add_gvg(GvgId::new(1), FamilyId::new(FAMILY), 6, addr("gvg1"));
    world.add_gvg(GvgId::new(2), FamilyId::new(FAMILY), 6, addr("gvg2"));
    world
}

fn bucket(quota: u64) -> Bucket {
    Bucket::new(BucketId::new(1), "bucket", addr("owner"), SpId::new(SP), FamilyId::new(FAMILY))
        .with_read_quota(quota)
}

fn keeper(world: &MemoryWorld) -> ChargeKeeper {
    ChargeKeeper::new(world.config.clone()).unwrap()
}

/// Sum of the payer's outgoing flows as seen by the ledger
fn ledger_outflow(world: &MemoryWorld, payer: &str) -> Decimal {
    world
        .ledger
        .list_outgoing_flows(&addr(payer))
        .iter()
        .map(|f| f.rate)
        .sum()
}

#[test]
fn test_read_quota_only_bill() {
    let mut world = world(
        UnitPrices::new(Decimal::from(100), Decimal::from(7), Decimal::from(9)),
        Decimal::new(1, 2),
    );
    let keeper = keeper(&world);

    let bill = world
        .transact(|keepers| keeper.charge_new_bucket(keepers, bucket(100), 10))
        .unwrap();

    assert_eq!(bill.flows.len(), 2);
    assert_eq!(bill.flows[0], Flow::new(addr("family"), Decimal::from(10_000)));
    assert_eq!(bill.flows[1], Flow::new(addr(config::DEFAULT_TAX_POOL_ADDRESS), Decimal::from(100)));
    assert_eq!(bill.rate_to(&addr("gvg1")), Decimal::ZERO);
}

#[test]
fn test_secondary_flows_per_gvg() {
    let mut world = world(
        UnitPrices::new(Decimal::ZERO, Decimal::ZERO, Decimal::from(500)),
        Decimal::ZERO,
    );
    let keeper = keeper(&world);

    let bill = world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(0), 1)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(1)), 100)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(2)), 200)?;
            keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 2)
        })
        .unwrap();

    assert_eq!(bill.rate_to(&addr("gvg1")), Decimal::from(300_000));
    assert_eq!(bill.rate_to(&addr("gvg2")), Decimal::from(600_000));
    assert_eq!(bill.rate_to(&addr("family")), Decimal::ZERO);
    assert_eq!(ledger_outflow(&world, "owner"), Decimal::from(900_000));
}

#[test]
fn test_flows_convert_back_to_tracked_bytes() {
    let read = Decimal::from(3);
    let primary = Decimal::from(5);
    let secondary = Decimal::from(7);
    let mut world = world(UnitPrices::new(read, primary, secondary), Decimal::ZERO);
    let keeper = keeper(&world);

    let sizes = [(1, 1_000u64), (2, 2_500), (1, 300)];
    let bill = world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(40), 1)?;
            for (gvg, size) in sizes {
                keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(gvg)), size)?;
            }
            keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 2)
        })
        .unwrap();

    let bindings = world.store.local_bindings(BucketId::new(1));
    assert_eq!(bindings.len(), 2);
    for binding in &bindings {
        let gvg = world.groups.gvg(binding.gvg_id).unwrap();
        let rate = bill.rate_to(&gvg.virtual_payment_address);
        let bytes = rate / (secondary * Decimal::from(gvg.redundancy_factor()));
        assert_eq!(bytes, Decimal::from(binding.total_charge_size));
        assert_eq!(gvg.stored_size, binding.stored_size);
    }

    let state = world.store.charge_state(BucketId::new(1)).unwrap();
    let family_bytes = (bill.rate_to(&addr("family")) - read * Decimal::from(40)) / primary;
    assert_eq!(family_bytes, Decimal::from(state.total_charge_size));
    assert_eq!(state.total_charge_size, 3_800);
    assert!(state.is_consistent());
}

#[test]
fn test_refresh_without_change_is_idempotent() {
    let mut world = world(
        UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ONE),
        Decimal::new(5, 2),
    );
    let keeper = keeper(&world);
    world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(1_000), 1)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), None, 4_096)
        })
        .unwrap();

    let first = world
        .transact(|keepers| keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 2))
        .unwrap();
    let records = world.ledger.list_stream_records();
    let second = world
        .transact(|keepers| keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 3))
        .unwrap();

    assert_eq!(first.flows, second.flows);
    assert_eq!(world.ledger.list_stream_records(), records);
}

#[test]
fn test_price_change_applies_on_refresh() {
    let mut world = world(
        UnitPrices::new(Decimal::ONE, Decimal::ZERO, Decimal::ZERO),
        Decimal::ZERO,
    );
    let keeper = keeper(&world);
    world
        .transact(|keepers| keeper.charge_new_bucket(keepers, bucket(100), 1))
        .unwrap();

    world.providers.set_prices(
        SpId::new(SP),
        50,
        UnitPrices::new(Decimal::TWO, Decimal::ZERO, Decimal::ZERO),
    );
    // stored bill still priced at its own time
    assert_eq!(
        keeper.compute_bill(world.view(), BucketId::new(1)).unwrap().total_rate(),
        Decimal::from(100)
    );

    world
        .transact(|keepers| keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 60))
        .unwrap();
    assert_eq!(world.ledger.netflow_rate(&addr("family")), Decimal::from(200));
}

#[test]
fn test_rate_limit_equal_to_total_is_noop() {
    let mut world = world(
        UnitPrices::new(Decimal::from(100), Decimal::ZERO, Decimal::ZERO),
        Decimal::new(1, 2),
    );
    let keeper = keeper(&world);
    let bill = world
        .transact(|keepers| keeper.charge_new_bucket(keepers, bucket(100), 1))
        .unwrap();
    let records = world.ledger.list_stream_records();

    let state = world
        .transact(|keepers| {
            keeper.set_rate_limit(keepers, 2, &addr("owner"), &addr("owner"), &addr("owner"), "bucket", bill.total_rate())
        })
        .unwrap();

    assert_eq!(state, RateLimitState::Limited);
    assert!(!keeper.is_suspended(world.view(), "bucket"));
    assert_eq!(world.ledger.list_stream_records(), records);
}

#[test]
fn test_suspend_then_restore_exact_flows() {
    let mut world = world(
        UnitPrices::new(Decimal::from(100), Decimal::from(2), Decimal::from(3)),
        Decimal::new(1, 2),
    );
    let keeper = keeper(&world);
    world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(100), 1)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(1)), 1_000)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(2)), 2_000)?;
            keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 2)
        })
        .unwrap();
    let original = world.ledger.list_outgoing_flows(&addr("owner"));
    let total: Decimal = original.iter().map(|f| f.rate).sum();

    let set = |world: &mut MemoryWorld, limit: Decimal| {
        world
            .transact(|keepers| {
                keeper.set_rate_limit(keepers, 3, &addr("owner"), &addr("owner"), &addr("owner"), "bucket", limit)
            })
            .unwrap()
    };

    assert_eq!(set(&mut world, Decimal::ONE), RateLimitState::Suspended);
    assert!(world.ledger.list_outgoing_flows(&addr("owner")).is_empty());
    assert_eq!(world.ledger.netflow_rate(&addr("family")), Decimal::ZERO);
    assert_eq!(world.ledger.netflow_rate(&addr("gvg1")), Decimal::ZERO);

    assert_eq!(set(&mut world, total), RateLimitState::Limited);
    assert_eq!(world.ledger.list_outgoing_flows(&addr("owner")), original);
}

#[test]
fn test_contribution_is_all_or_nothing_across_limit_changes() {
    let mut world = world(
        UnitPrices::new(Decimal::from(10), Decimal::ONE, Decimal::ONE),
        Decimal::new(2, 2),
    );
    let keeper = keeper(&world);
    let bill = world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(50), 1)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), None, 700)?;
            keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 2)
        })
        .unwrap();
    let full = bill.total_rate();

    let limits = [full, full - Decimal::ONE, Decimal::ZERO, full * Decimal::TWO, Decimal::ONE, full, full + Decimal::ONE];
    for limit in limits {
        world
            .transact(|keepers| {
                keeper.set_rate_limit(keepers, 3, &addr("owner"), &addr("owner"), &addr("owner"), "bucket", limit)
            })
            .unwrap();

        let outflow = ledger_outflow(&world, "owner");
        let suspended = keeper.is_suspended(world.view(), "bucket");
        if suspended {
            assert_eq!(outflow, Decimal::ZERO, "limit {}", limit);
        } else {
            assert_eq!(outflow, full, "limit {}", limit);
        }
    }
}

#[test]
fn test_raising_past_limit_aborts_transaction() {
    let mut world = world(
        UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ZERO),
        Decimal::ZERO,
    );
    let keeper = keeper(&world);
    world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(10), 1)?;
            keeper.set_rate_limit(keepers, 1, &addr("owner"), &addr("owner"), &addr("owner"), "bucket", Decimal::from(50))?;
            keeper.lock(keepers, ObjectId::new(9), BucketId::new(1), 100, 1)
        })
        .unwrap();
    let before = world.clone();

    // sealing 100 bytes brings the rate to 110
    let err = world
        .transact(|keepers| keeper.unlock_and_charge(keepers, ObjectId::new(9), None, 2))
        .unwrap_err();

    assert!(matches!(err, BillingError::RateLimitExceeded { .. }));
    assert_eq!(err.class(), ErrorClass::Limitation);
    assert!(world.store.lock_record(ObjectId::new(9)).is_some());
    assert!(world.store.local_bindings(BucketId::new(1)).is_empty());
    assert_eq!(world.groups.gvg(GvgId::new(1)), before.groups.gvg(GvgId::new(1)));
    assert_eq!(world.ledger.list_stream_records(), before.ledger.list_stream_records());
}

#[test]
fn test_missing_price_fails_closed() {
    let mut world = world(
        UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ONE),
        Decimal::ZERO,
    );
    let keeper = keeper(&world);
    let mut foreign = bucket(10);
    foreign.primary_sp_id = SpId::new(42);

    let err = world
        .transact(|keepers| keeper.charge_new_bucket(keepers, foreign, 5))
        .unwrap_err();
    assert_eq!(err, BillingError::PriceNotFound { sp_id: 42, as_of: 5 });
    assert!(world.ledger.list_stream_records().iter().all(|r| r.netflow_rate.is_zero()));
}

#[test]
fn test_incomplete_migration_mapping_changes_no_counter() {
    let mut world = world(
        UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ONE),
        Decimal::ZERO,
    );
    world.providers.set_prices(SpId::new(2), 0, UnitPrices::new(Decimal::ONE, Decimal::ONE, Decimal::ONE));
    world.add_family(FamilyId::new(2), SpId::new(2), addr("family2"));
    world.add_gvg(GvgId::new(21), FamilyId::new(2), 6, addr("gvg21"));
    world.add_gvg(GvgId::new(22), FamilyId::new(2), 6, addr("gvg22"));

    let keeper = keeper(&world);
    world
        .transact(|keepers| {
            keeper.charge_new_bucket(keepers, bucket(0), 1)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(1)), 100)?;
            keeper.bind_new_payload(keepers, BucketId::new(1), Some(GvgId::new(2)), 200)?;
            keeper.apply_or_refresh_bill(keepers, BucketId::new(1), 2)?;
            keeper.start_migration(keepers, BucketId::new(1))
        })
        .unwrap();
    let before = world.clone();

    let mapping = BTreeMap::from([(GvgId::new(1), GvgId::new(21))]);
    let mut keepers = world.keepers();
    let err = keeper
        .complete_migration(&mut keepers, BucketId::new(1), SpId::new(2), FamilyId::new(2), &mapping, 3)
        .unwrap_err();
    assert!(matches!(err, BillingError::IncompleteRebindMapping { .. }));

    for gvg in [1, 2, 21, 22] {
        assert_eq!(
            world.groups.gvg(GvgId::new(gvg)).unwrap().stored_size,
            before.groups.gvg(GvgId::new(gvg)).unwrap().stored_size
        );
    }
    assert_eq!(world.store.bucket(BucketId::new(1)).unwrap().status, BucketStatus::Migrating);
    assert_eq!(world.ledger.list_stream_records(), before.ledger.list_stream_records());
}
