//! Lot-quantity reconciliation.
//!
//! Pure computation over already-loaded rows: no I/O happens here. The write
//! side (`ReplaceLotsCommand`) and the receive transition both lean on these
//! functions, as does the order detail view.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{inventory_lot, purchase_order_item};

/// A lot candidate as submitted by the client, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LotCandidate {
    #[schema(example = "LOT-2024-001")]
    pub lot_number: String,
    #[schema(example = 40)]
    pub quantity: i32,
}

/// A persisted lot, as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LotSummary {
    pub id: i32,
    pub lot_number: String,
    pub quantity: i32,
}

impl From<&inventory_lot::Model> for LotSummary {
    fn from(lot: &inventory_lot::Model) -> Self {
        Self {
            id: lot.id,
            lot_number: lot.lot_number.clone(),
            quantity: lot.quantity,
        }
    }
}

/// Reconciliation outcome for a single order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ItemReconciliation {
    pub item_id: i32,
    pub item_code: String,
    pub item_name: String,
    pub ordered_quantity: i32,
    /// Sum of all lot quantities recorded against the item.
    pub lot_quantity_total: i64,
    /// True when the lot total equals the ordered quantity exactly.
    pub matches: bool,
    pub lots: Vec<LotSummary>,
}

/// Reconciliation outcome for a whole purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderReconciliation {
    pub items: Vec<ItemReconciliation>,
    /// Every item matches. Vacuously true for an order with no items.
    pub all_match: bool,
    /// At least one item has at least one lot recorded.
    pub has_any_lots: bool,
}

impl OrderReconciliation {
    /// First item whose lot total does not equal its ordered quantity,
    /// in item order.
    pub fn first_mismatch(&self) -> Option<&ItemReconciliation> {
        self.items.iter().find(|item| !item.matches)
    }
}

/// Reconciles recorded lots against ordered quantities.
///
/// Lots are grouped by their item id; lots referencing an item outside
/// `items` are ignored. The comparison is exact integer equality, so an item
/// with no lots only matches when its ordered quantity is zero.
pub fn compute_reconciliation(
    items: &[purchase_order_item::Model],
    lots: &[inventory_lot::Model],
) -> OrderReconciliation {
    let mut lots_by_item: HashMap<i32, Vec<&inventory_lot::Model>> = HashMap::new();
    for lot in lots {
        lots_by_item
            .entry(lot.purchase_order_item_id)
            .or_default()
            .push(lot);
    }

    let mut reports = Vec::with_capacity(items.len());
    let mut has_any_lots = false;

    for item in items {
        let item_lots: &[&inventory_lot::Model] = lots_by_item
            .get(&item.id)
            .map(|lots| lots.as_slice())
            .unwrap_or(&[]);
        if !item_lots.is_empty() {
            has_any_lots = true;
        }

        let lot_quantity_total: i64 = item_lots.iter().map(|lot| i64::from(lot.quantity)).sum();

        reports.push(ItemReconciliation {
            item_id: item.id,
            item_code: item.item_code.clone(),
            item_name: item.item_name.clone(),
            ordered_quantity: item.quantity,
            lot_quantity_total,
            matches: lot_quantity_total == i64::from(item.quantity),
            lots: item_lots.iter().map(|lot| LotSummary::from(*lot)).collect(),
        });
    }

    let all_match = reports.iter().all(|report| report.matches);

    OrderReconciliation {
        items: reports,
        all_match,
        has_any_lots,
    }
}

/// Drops candidates with a blank lot number or a non-positive quantity,
/// keeping the survivors in their submitted order.
pub fn filter_candidate_lots(candidates: Vec<LotCandidate>) -> Vec<LotCandidate> {
    candidates
        .into_iter()
        .filter(|lot| !lot.lot_number.trim().is_empty() && lot.quantity > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn item(id: i32, code: &str, name: &str, quantity: i32) -> purchase_order_item::Model {
        purchase_order_item::Model {
            id,
            purchase_order_id: 1,
            item_code: code.to_string(),
            item_name: name.to_string(),
            quantity,
        }
    }

    fn lot(id: i32, item_id: i32, lot_number: &str, quantity: i32) -> inventory_lot::Model {
        inventory_lot::Model {
            id,
            purchase_order_item_id: item_id,
            lot_number: lot_number.to_string(),
            quantity,
        }
    }

    #[test]
    fn single_lot_equal_to_ordered_quantity_matches() {
        let items = vec![item(1, "ITM-100", "Widget", 100)];
        let lots = vec![lot(1, 1, "L1", 100)];

        let report = compute_reconciliation(&items, &lots);

        assert!(report.all_match);
        assert!(report.has_any_lots);
        assert_eq!(report.items[0].lot_quantity_total, 100);
        assert!(report.items[0].matches);
    }

    #[test]
    fn split_lots_summing_to_ordered_quantity_match() {
        let items = vec![item(1, "ITM-100", "Widget", 100)];
        let lots = vec![lot(1, 1, "L1", 60), lot(2, 1, "L2", 40)];

        let report = compute_reconciliation(&items, &lots);

        assert!(report.all_match);
        assert_eq!(report.items[0].lot_quantity_total, 100);
        assert_eq!(report.items[0].lots.len(), 2);
    }

    #[test]
    fn short_lot_total_is_reported_with_its_actual_sum() {
        let items = vec![item(1, "ITM-100", "Widget", 100)];
        let lots = vec![lot(1, 1, "L1", 90)];

        let report = compute_reconciliation(&items, &lots);

        assert!(!report.all_match);
        let mismatch = report.first_mismatch().unwrap();
        assert_eq!(mismatch.item_name, "Widget");
        assert_eq!(mismatch.lot_quantity_total, 90);
        assert_eq!(mismatch.ordered_quantity, 100);
    }

    #[test]
    fn item_without_lots_fails_while_sibling_matches() {
        let items = vec![
            item(1, "ITM-100", "Widget", 50),
            item(2, "ITM-200", "Gadget", 25),
        ];
        let lots = vec![lot(1, 1, "L1", 50)];

        let report = compute_reconciliation(&items, &lots);

        assert!(!report.all_match);
        assert!(report.has_any_lots);
        assert!(report.items[0].matches);
        assert!(!report.items[1].matches);
        assert_eq!(report.items[1].lot_quantity_total, 0);
    }

    #[test]
    fn zero_ordered_quantity_with_no_lots_matches() {
        let items = vec![item(1, "ITM-100", "Widget", 0)];

        let report = compute_reconciliation(&items, &[]);

        assert!(report.all_match);
        assert!(!report.has_any_lots);
    }

    #[test]
    fn empty_item_list_is_vacuously_matched() {
        let report = compute_reconciliation(&[], &[]);

        assert!(report.all_match);
        assert!(!report.has_any_lots);
        assert!(report.items.is_empty());
        assert!(report.first_mismatch().is_none());
    }

    #[test]
    fn lots_for_unknown_items_are_ignored() {
        let items = vec![item(1, "ITM-100", "Widget", 10)];
        let lots = vec![lot(1, 99, "STRAY", 10)];

        let report = compute_reconciliation(&items, &lots);

        assert!(!report.has_any_lots);
        assert!(!report.items[0].matches);
        assert_eq!(report.items[0].lot_quantity_total, 0);
    }

    #[test]
    fn compute_is_pure() {
        let items = vec![
            item(1, "ITM-100", "Widget", 100),
            item(2, "ITM-200", "Gadget", 30),
        ];
        let lots = vec![lot(1, 1, "L1", 60), lot(2, 1, "L2", 40), lot(3, 2, "L3", 30)];

        let first = compute_reconciliation(&items, &lots);
        let second = compute_reconciliation(&items, &lots);

        assert_eq!(first, second);
        assert!(first.all_match);
    }

    #[test_case("LOT-1", 10, true ; "positive quantity and non-empty number survives")]
    #[test_case("", 5, false ; "empty lot number is dropped")]
    #[test_case("   ", 5, false ; "whitespace lot number is dropped")]
    #[test_case("LOT-1", 0, false ; "zero quantity is dropped")]
    #[test_case("LOT-1", -3, false ; "negative quantity is dropped")]
    fn candidate_filtering(lot_number: &str, quantity: i32, survives: bool) {
        let candidates = vec![LotCandidate {
            lot_number: lot_number.to_string(),
            quantity,
        }];

        let kept = filter_candidate_lots(candidates);

        assert_eq!(!kept.is_empty(), survives);
    }

    #[test]
    fn filtering_preserves_submission_order() {
        let candidates = vec![
            LotCandidate {
                lot_number: "A".to_string(),
                quantity: 1,
            },
            LotCandidate {
                lot_number: "".to_string(),
                quantity: 5,
            },
            LotCandidate {
                lot_number: "B".to_string(),
                quantity: 2,
            },
            LotCandidate {
                lot_number: "C".to_string(),
                quantity: -1,
            },
        ];

        let kept = filter_candidate_lots(candidates);

        let numbers: Vec<&str> = kept.iter().map(|lot| lot.lot_number.as_str()).collect();
        assert_eq!(numbers, vec!["A", "B"]);
    }
}
