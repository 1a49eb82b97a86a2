//! Stock ledger tests
//!
//! Covers the core ledger properties:
//! - replaying any movement sequence yields the signed sum, never negative
//! - outbound movements beyond available stock are rejected without effect
//! - reservation arithmetic and weighted average cost

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{
    weighted_average_cost, MovementType, StockDirection, StockError, StockSnapshot,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Every movement type except adjustment has a fixed direction
    #[test]
    fn test_movement_type_directions() {
        let inbound = [
            MovementType::Purchase,
            MovementType::TransferIn,
            MovementType::Return,
            MovementType::Initial,
        ];
        let outbound = [
            MovementType::Sale,
            MovementType::TransferOut,
            MovementType::Wastage,
            MovementType::Damage,
            MovementType::Theft,
        ];

        for t in inbound {
            assert_eq!(t.direction(), Some(StockDirection::In), "{t:?}");
        }
        for t in outbound {
            assert_eq!(t.direction(), Some(StockDirection::Out), "{t:?}");
        }
        assert_eq!(MovementType::Adjustment.direction(), None);
    }

    /// Scenario from the ledger contract: stock=10, sell 7, then try to sell 5
    #[test]
    fn test_sale_sequence_rejects_overdraw() {
        let s = StockSnapshot {
            current: 10,
            reserved: 0,
        };

        let s = s.apply(StockDirection::Out, 7, false).unwrap();
        assert_eq!(s.current, 3);

        let err = s.apply(StockDirection::Out, 5, false).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                available: 3,
                requested: 5
            }
        );
        // the failed movement must leave the level untouched
        assert_eq!(s.current, 3);
    }

    /// Two movements that would individually succeed but jointly overdraw:
    /// applied in sequence, exactly one succeeds
    #[test]
    fn test_joint_overdraw_applies_exactly_once() {
        let s = StockSnapshot {
            current: 10,
            reserved: 0,
        };

        let first = s.apply(StockDirection::Out, 7, false);
        assert!(first.is_ok());
        let second = first.unwrap().apply(StockDirection::Out, 7, false);
        assert!(matches!(second, Err(StockError::Insufficient { .. })));
    }

    /// The adjustment override is the only way below zero
    #[test]
    fn test_adjustment_override() {
        let s = StockSnapshot {
            current: 2,
            reserved: 0,
        };
        assert!(s.apply(StockDirection::Out, 5, false).is_err());
        let adjusted = s.apply(StockDirection::Out, 5, true).unwrap();
        assert_eq!(adjusted.current, -3);
    }

    /// Reservations reduce what outbound movements can draw indirectly by
    /// reducing the reservable amount, not the current stock
    #[test]
    fn test_reservation_keeps_current_stock() {
        let s = StockSnapshot {
            current: 10,
            reserved: 0,
        };
        let s = s.reserve(6).unwrap();
        assert_eq!(s.current, 10);
        assert_eq!(s.available(), 4);

        // releasing and moving out drains both sides
        let s = s.release(6).unwrap();
        let s = s.apply(StockDirection::Out, 6, false).unwrap();
        assert_eq!(s.current, 4);
        assert_eq!(s.available(), 4);
    }

    #[test]
    fn test_weighted_average_cost() {
        // 100 units @ 20 + 50 units @ 30 = 3500 over 150 units
        let avg = weighted_average_cost(100, dec("20"), 50, dec("30"));
        assert!(avg > dec("23.3") && avg < dec("23.4"));

        // first purchase sets the average outright
        assert_eq!(weighted_average_cost(0, Decimal::ZERO, 10, dec("15")), dec("15"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = i64> {
        1i64..=1000
    }

    fn direction_strategy() -> impl Strategy<Value = StockDirection> {
        prop_oneof![Just(StockDirection::In), Just(StockDirection::Out)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Replaying a movement sequence on a fresh level yields the signed
        /// sum of the applied movements, and stock never goes negative
        #[test]
        fn prop_replay_equals_signed_sum(
            movements in prop::collection::vec(
                (direction_strategy(), quantity_strategy()),
                0..40
            )
        ) {
            let mut snapshot = StockSnapshot::ZERO;
            let mut signed_sum: i64 = 0;

            for (direction, quantity) in &movements {
                match snapshot.apply(*direction, *quantity, false) {
                    Ok(next) => {
                        snapshot = next;
                        signed_sum += match direction {
                            StockDirection::In => *quantity,
                            StockDirection::Out => -*quantity,
                        };
                    }
                    Err(e) => {
                        // rejected movements must not change state
                        let is_insufficient = matches!(e, StockError::Insufficient { .. });
                        prop_assert!(is_insufficient);
                    }
                }
                prop_assert!(snapshot.current >= 0);
                prop_assert_eq!(snapshot.current, signed_sum);
            }
        }

        /// An outbound movement is rejected exactly when it would overdraw
        #[test]
        fn prop_outbound_rejection_boundary(
            current in 0i64..=1000,
            quantity in quantity_strategy()
        ) {
            let s = StockSnapshot { current, reserved: 0 };
            let result = s.apply(StockDirection::Out, quantity, false);
            if quantity <= current {
                prop_assert_eq!(result.unwrap().current, current - quantity);
            } else {
                prop_assert!(result.is_err());
            }
        }

        /// Reserve then release is an identity on the snapshot
        #[test]
        fn prop_reserve_release_roundtrip(
            current in 1i64..=1000,
            quantity in quantity_strategy()
        ) {
            let s = StockSnapshot { current, reserved: 0 };
            if quantity <= current {
                let held = s.reserve(quantity).unwrap();
                prop_assert_eq!(held.available(), current - quantity);
                let released = held.release(quantity).unwrap();
                prop_assert_eq!(released, s);
            } else {
                prop_assert!(s.reserve(quantity).is_err());
            }
        }

        /// The weighted average always lies between the old average and the
        /// incoming unit cost
        #[test]
        fn prop_weighted_average_bounded(
            on_hand in 1i64..=1000,
            added in 1i64..=1000,
            avg_cents in 1i64..=100_000,
            cost_cents in 1i64..=100_000
        ) {
            let avg = Decimal::new(avg_cents, 2);
            let cost = Decimal::new(cost_cents, 2);
            let folded = weighted_average_cost(on_hand, avg, added, cost);

            let (lo, hi) = if avg <= cost { (avg, cost) } else { (cost, avg) };
            prop_assert!(folded >= lo);
            prop_assert!(folded <= hi);
        }
    }
}
