//! Property-based tests for the lot reconciliation engine.
//!
//! These tests use proptest to verify the engine's invariants across a wide
//! range of generated orders and lots, catching edge cases the unit tests
//! might miss.

use proptest::prelude::*;
use stockroom_api::entities::{inventory_lot, purchase_order_item};
use stockroom_api::services::reconciliation::{
    compute_reconciliation, filter_candidate_lots, LotCandidate,
};

// Strategies for generating test data

fn item_models(max_items: usize) -> impl Strategy<Value = Vec<purchase_order_item::Model>> {
    prop::collection::vec(
        ("[A-Z]{3}-[0-9]{3}", "[A-Za-z]{3,12}", 0i32..5_000),
        1..=max_items,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(idx, (code, name, quantity))| purchase_order_item::Model {
                id: idx as i32 + 1,
                purchase_order_id: 1,
                item_code: code,
                item_name: name,
                quantity,
            })
            .collect()
    })
}

fn items_with_lots(
) -> impl Strategy<Value = (Vec<purchase_order_item::Model>, Vec<inventory_lot::Model>)> {
    item_models(5).prop_flat_map(|items| {
        let item_count = items.len() as i32;
        let lots = prop::collection::vec((1..=item_count, "[A-Z]{2,6}", 1i32..2_000), 0..12)
            .prop_map(|specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(idx, (item_id, lot_number, quantity))| inventory_lot::Model {
                        id: idx as i32 + 1,
                        purchase_order_item_id: item_id,
                        lot_number,
                        quantity,
                    })
                    .collect::<Vec<_>>()
            });
        (Just(items), lots)
    })
}

fn candidate_strategy() -> impl Strategy<Value = LotCandidate> {
    (
        prop_oneof![
            Just(String::new()),
            "\\s{1,4}".prop_map(|s| s),
            "[A-Z]{1,8}[0-9]{0,4}".prop_map(|s| s),
        ],
        -100i32..500,
    )
        .prop_map(|(lot_number, quantity)| LotCandidate {
            lot_number,
            quantity,
        })
}

// Properties of the reconciliation computation

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn lot_totals_equal_the_sum_of_lot_quantities((items, lots) in items_with_lots()) {
        let report = compute_reconciliation(&items, &lots);

        for item_report in &report.items {
            let expected: i64 = lots
                .iter()
                .filter(|lot| lot.purchase_order_item_id == item_report.item_id)
                .map(|lot| i64::from(lot.quantity))
                .sum();
            prop_assert_eq!(item_report.lot_quantity_total, expected);
        }
    }

    #[test]
    fn all_match_iff_every_item_matches((items, lots) in items_with_lots()) {
        let report = compute_reconciliation(&items, &lots);

        let expected = report.items.iter().all(|item| item.matches);
        prop_assert_eq!(report.all_match, expected);

        for item_report in &report.items {
            prop_assert_eq!(
                item_report.matches,
                item_report.lot_quantity_total == i64::from(item_report.ordered_quantity)
            );
        }
    }

    #[test]
    fn report_preserves_item_order_and_arity((items, lots) in items_with_lots()) {
        let report = compute_reconciliation(&items, &lots);

        prop_assert_eq!(report.items.len(), items.len());
        for (item, item_report) in items.iter().zip(&report.items) {
            prop_assert_eq!(item.id, item_report.item_id);
            prop_assert_eq!(item.quantity, item_report.ordered_quantity);
        }
    }

    #[test]
    fn has_any_lots_iff_some_known_item_has_a_lot((items, lots) in items_with_lots()) {
        let report = compute_reconciliation(&items, &lots);

        let expected = lots
            .iter()
            .any(|lot| items.iter().any(|item| item.id == lot.purchase_order_item_id));
        prop_assert_eq!(report.has_any_lots, expected);
    }

    #[test]
    fn splitting_a_recorded_lot_preserves_item_totals(
        (items, lots) in items_with_lots(),
        split in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!lots.is_empty());
        let baseline = compute_reconciliation(&items, &lots);

        let mut split_lots = lots.clone();
        let target = split.index(split_lots.len());
        let original = split_lots[target].clone();
        let first_half = original.quantity / 2;
        split_lots[target].quantity = first_half;
        split_lots.push(inventory_lot::Model {
            id: split_lots.len() as i32 + 1,
            purchase_order_item_id: original.purchase_order_item_id,
            lot_number: format!("{}-B", original.lot_number),
            quantity: original.quantity - first_half,
        });

        let split_report = compute_reconciliation(&items, &split_lots);
        for (before, after) in baseline.items.iter().zip(&split_report.items) {
            prop_assert_eq!(before.lot_quantity_total, after.lot_quantity_total);
            prop_assert_eq!(before.matches, after.matches);
        }
        prop_assert_eq!(baseline.all_match, split_report.all_match);
    }

    #[test]
    fn compute_is_deterministic((items, lots) in items_with_lots()) {
        let first = compute_reconciliation(&items, &lots);
        let second = compute_reconciliation(&items, &lots);
        prop_assert_eq!(first, second);
    }
}

// Properties of candidate filtering

proptest! {
    #[test]
    fn filtering_keeps_exactly_the_valid_candidates(
        candidates in prop::collection::vec(candidate_strategy(), 0..20),
    ) {
        let kept = filter_candidate_lots(candidates.clone());

        for lot in &kept {
            prop_assert!(!lot.lot_number.trim().is_empty());
            prop_assert!(lot.quantity > 0);
        }

        let expected: Vec<LotCandidate> = candidates
            .into_iter()
            .filter(|lot| !lot.lot_number.trim().is_empty() && lot.quantity > 0)
            .collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn filtering_is_idempotent(
        candidates in prop::collection::vec(candidate_strategy(), 0..20),
    ) {
        let once = filter_candidate_lots(candidates);
        let twice = filter_candidate_lots(once.clone());
        prop_assert_eq!(once, twice);
    }
}
