//! Purchase order workflow tests
//!
//! Covers the order state machine, the per-item receipt cap across partial
//! receipts, order totals, and supplier on-time metric folding.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    apply_order_receipt, fold_on_time_rate, format_po_number, order_totals, PurchaseOrderItem,
    PurchaseOrderStatus, ReceiptLine,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(ordered: i64, cost: &str) -> PurchaseOrderItem {
    PurchaseOrderItem::new(Uuid::new_v4(), "Sukari 1kg".to_string(), ordered, dec(cost))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_order_totals() {
        let items = vec![item(10, "45.50"), item(3, "120")];
        let (subtotal, total) = order_totals(&items);
        assert_eq!(subtotal, dec("815"));
        assert_eq!(total, subtotal);
    }

    #[test]
    fn test_po_number_format() {
        assert_eq!(format_po_number(2026, 1), "PO-2026-0001");
        assert_eq!(format_po_number(2026, 999), "PO-2026-0999");
    }

    /// Receipt completes the order only when every line is complete
    #[test]
    fn test_receipt_completion_per_item() {
        let mut items = vec![item(10, "45.50"), item(4, "120")];
        let first = items[0].product_id;
        let second = items[1].product_id;

        let done = apply_order_receipt(
            &mut items,
            &[ReceiptLine {
                product_id: first,
                quantity_received: 10,
                defective_quantity: 0,
            }],
        )
        .unwrap();
        assert!(!done);

        let done = apply_order_receipt(
            &mut items,
            &[ReceiptLine {
                product_id: second,
                quantity_received: 4,
                defective_quantity: 1,
            }],
        )
        .unwrap();
        assert!(done);
        assert_eq!(items[1].defective_quantity, 1);
    }

    /// Over-receipt is rejected without mutating the line
    #[test]
    fn test_receipt_capped_by_ordered() {
        let mut items = vec![item(10, "45.50")];
        let pid = items[0].product_id;
        items[0].quantity_received = 8;

        let err = apply_order_receipt(
            &mut items,
            &[ReceiptLine {
                product_id: pid,
                quantity_received: 3,
                defective_quantity: 0,
            }],
        )
        .unwrap_err();
        assert_eq!(err, "received quantity exceeds ordered quantity");
        assert_eq!(items[0].quantity_received, 8);
    }

    /// Defective units are a subset of the received units
    #[test]
    fn test_defective_bounded_by_received() {
        let mut items = vec![item(10, "45.50")];
        let pid = items[0].product_id;

        let err = apply_order_receipt(
            &mut items,
            &[ReceiptLine {
                product_id: pid,
                quantity_received: 2,
                defective_quantity: 3,
            }],
        )
        .unwrap_err();
        assert_eq!(err, "defective quantity cannot exceed received quantity");
    }

    #[test]
    fn test_on_time_rate_folding() {
        // first completed order
        assert_eq!(fold_on_time_rate(Decimal::ZERO, 0, true), dec("100"));
        // 4 on-time orders, fifth late
        assert_eq!(fold_on_time_rate(dec("100"), 4, false), dec("80"));
        // recovery
        assert_eq!(fold_on_time_rate(dec("80"), 5, true), dec("100") * dec("5") / dec("6"));
    }
}

// ============================================================================
// State machine tests
// ============================================================================

#[cfg(test)]
mod state_machine_tests {
    use super::*;
    use PurchaseOrderStatus::*;

    const ALL: [PurchaseOrderStatus; 10] = [
        Draft,
        Pending,
        Approved,
        Sent,
        Acknowledged,
        PartiallyReceived,
        Received,
        Cancelled,
        Rejected,
        Delayed,
    ];

    #[test]
    fn test_main_line() {
        let line = [
            Draft,
            Pending,
            Approved,
            Sent,
            Acknowledged,
            PartiallyReceived,
            Received,
        ];
        for pair in line.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_submit_only_from_draft() {
        for s in ALL {
            assert_eq!(s.can_transition_to(Pending), s == Draft, "{s:?}");
        }
    }

    #[test]
    fn test_reject_only_from_pending() {
        for s in ALL {
            assert_eq!(s.can_transition_to(Rejected), s == Pending, "{s:?}");
        }
    }

    #[test]
    fn test_cancel_window() {
        for s in ALL {
            let expected = matches!(s, Draft | Pending | Approved | Sent);
            assert_eq!(s.can_transition_to(Cancelled), expected, "{s:?}");
        }
    }

    #[test]
    fn test_receivable_states() {
        for s in ALL {
            let expected = matches!(s, Sent | Acknowledged | PartiallyReceived | Delayed);
            assert_eq!(s.is_receivable(), expected, "{s:?}");
        }
    }

    #[test]
    fn test_delayed_resolves_through_receipt() {
        assert!(Sent.can_transition_to(Delayed));
        assert!(Acknowledged.can_transition_to(Delayed));
        assert!(Delayed.can_transition_to(PartiallyReceived));
        assert!(Delayed.can_transition_to(Received));
        assert!(!Delayed.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_states() {
        for s in [Received, Cancelled, Rejected] {
            assert!(s.is_terminal());
            for to in ALL {
                assert!(!s.can_transition_to(to), "{s:?} -> {to:?}");
            }
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// quantity_received never exceeds quantity_ordered across any
        /// sequence of partial receive calls
        #[test]
        fn prop_received_never_exceeds_ordered(
            ordered in 1i64..=100,
            attempts in prop::collection::vec((1i64..=40, 0i64..=5), 1..12)
        ) {
            let mut items = vec![item(ordered, "10")];
            let pid = items[0].product_id;

            for (qty, defective) in attempts {
                let _ = apply_order_receipt(
                    &mut items,
                    &[ReceiptLine {
                        product_id: pid,
                        quantity_received: qty,
                        defective_quantity: defective.min(qty),
                    }],
                );
                prop_assert!(items[0].quantity_received <= ordered);
                prop_assert!(items[0].defective_quantity <= items[0].quantity_received);
            }
        }

        /// Completion is reported exactly when the cumulative receipts cover
        /// the ordered quantity
        #[test]
        fn prop_completion_boundary(
            ordered in 1i64..=60,
            chunks in prop::collection::vec(1i64..=20, 1..10)
        ) {
            let mut items = vec![item(ordered, "10")];
            let pid = items[0].product_id;
            let mut delivered = 0i64;

            for chunk in chunks {
                let result = apply_order_receipt(
                    &mut items,
                    &[ReceiptLine {
                        product_id: pid,
                        quantity_received: chunk,
                        defective_quantity: 0,
                    }],
                );
                if delivered + chunk <= ordered {
                    delivered += chunk;
                    prop_assert_eq!(result.unwrap(), delivered == ordered);
                } else {
                    prop_assert!(result.is_err());
                }
            }
        }

        /// The folded on-time rate always stays within 0..=100
        #[test]
        fn prop_on_time_rate_bounded(
            orders in prop::collection::vec(any::<bool>(), 1..40)
        ) {
            let mut rate = Decimal::ZERO;
            let mut total = 0i32;
            for on_time in orders {
                rate = fold_on_time_rate(rate, total, on_time);
                total += 1;
                prop_assert!(rate >= Decimal::ZERO);
                prop_assert!(rate <= Decimal::from(100));
            }
        }

        /// Subtotal equals the sum over line totals
        #[test]
        fn prop_totals_additive(
            quantities in prop::collection::vec((1i64..=50, 1i64..=10_000), 1..8)
        ) {
            let items: Vec<PurchaseOrderItem> = quantities
                .iter()
                .map(|(q, cents)| {
                    PurchaseOrderItem::new(
                        Uuid::new_v4(),
                        "Bidhaa".to_string(),
                        *q,
                        Decimal::new(*cents, 2),
                    )
                })
                .collect();
            let (subtotal, total) = order_totals(&items);
            let expected: Decimal = items.iter().map(|i| i.line_total()).sum();
            prop_assert_eq!(subtotal, expected);
            prop_assert_eq!(total, expected);
        }
    }
}
