//! Branch registry tests
//!
//! Covers branch input validation and the guarded-deletion decision logic.

use proptest::prelude::*;

use shared::models::{BranchStatus, DayHours};
use shared::validation::{
    validate_capacity, validate_kenyan_phone, validate_name, validate_opening_hours,
};

// ============================================================================
// Deletion guard helpers (mirror the service's checks)
// ============================================================================

/// Soft delete is blocked while transfers are still open against the branch
fn can_deactivate(open_transfers: i64) -> bool {
    open_transfers == 0
}

/// Hard delete is only allowed with no history at all
fn can_hard_delete(transfer_history: i64, inventory_rows: i64) -> bool {
    transfer_history == 0 && inventory_rows == 0
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_branch_status_roundtrip() {
        for status in [
            BranchStatus::Active,
            BranchStatus::Inactive,
            BranchStatus::UnderMaintenance,
            BranchStatus::TemporarilyClosed,
        ] {
            assert_eq!(BranchStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BranchStatus::from_str("open"), None);
    }

    #[test]
    fn test_only_active_branches_are_operational() {
        assert!(BranchStatus::Active.is_operational());
        assert!(!BranchStatus::Inactive.is_operational());
        assert!(!BranchStatus::UnderMaintenance.is_operational());
        assert!(!BranchStatus::TemporarilyClosed.is_operational());
    }

    #[test]
    fn test_opening_hours_week_shape() {
        let week: Vec<DayHours> = (0..7).map(|_| DayHours::open("08:00", "18:00")).collect();
        assert!(validate_opening_hours(&week).is_ok());

        assert!(validate_opening_hours(&week[..6]).is_err());
        let eight: Vec<DayHours> = (0..8).map(|_| DayHours::closed()).collect();
        assert!(validate_opening_hours(&eight).is_err());
    }

    #[test]
    fn test_opening_hours_closed_days() {
        let mut week: Vec<DayHours> = (0..6).map(|_| DayHours::open("09:00", "17:00")).collect();
        week.push(DayHours::closed());
        assert!(validate_opening_hours(&week).is_ok());
        assert!(week[6].is_closed());
    }

    #[test]
    fn test_opening_hours_must_be_ordered() {
        let mut week: Vec<DayHours> = (0..6).map(|_| DayHours::closed()).collect();
        week.push(DayHours::open("17:00", "09:00"));
        assert!(validate_opening_hours(&week).is_err());

        let mut week: Vec<DayHours> = (0..6).map(|_| DayHours::closed()).collect();
        week.push(DayHours::open("09:00", "09:00"));
        assert!(validate_opening_hours(&week).is_err());
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_kenyan_phone("0712345678").is_ok());
        assert!(validate_kenyan_phone("+254712345678").is_ok());
        assert!(validate_kenyan_phone("0812345678").is_err());
        assert!(validate_kenyan_phone("12345").is_err());
    }

    #[test]
    fn test_name_and_capacity_validation() {
        assert!(validate_name("Westlands").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_capacity(50).is_ok());
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(-1).is_err());
    }

    /// Deactivation is blocked by open transfers, not by history
    #[test]
    fn test_deactivation_guard() {
        assert!(can_deactivate(0));
        assert!(!can_deactivate(1));
    }

    /// Hard delete requires a branch nothing ever touched
    #[test]
    fn test_hard_delete_guard() {
        assert!(can_hard_delete(0, 0));
        assert!(!can_hard_delete(3, 0));
        assert!(!can_hard_delete(0, 2));
        assert!(!can_hard_delete(3, 2));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn hhmm_strategy() -> impl Strategy<Value = String> {
        (0u8..24, 0u8..60).prop_map(|(h, m)| format!("{:02}:{:02}", h, m))
    }

    proptest! {
        /// Any week where each open day has open < close validates
        #[test]
        fn prop_ordered_hours_validate(
            times in prop::collection::vec((hhmm_strategy(), hhmm_strategy()), 7)
        ) {
            let week: Vec<DayHours> = times
                .iter()
                .map(|(a, b)| {
                    if a < b {
                        DayHours::open(a, b)
                    } else if b < a {
                        DayHours::open(b, a)
                    } else {
                        DayHours::closed()
                    }
                })
                .collect();
            prop_assert!(validate_opening_hours(&week).is_ok());
        }

        /// A deletable branch is always deactivatable
        #[test]
        fn prop_hard_delete_implies_deactivate(
            open in 0i64..=5,
            history in 0i64..=5,
            inventory in 0i64..=5
        ) {
            // open transfers are part of transfer history
            let history = history + open;
            if can_hard_delete(history, inventory) && open == 0 {
                prop_assert!(can_deactivate(open));
            }
        }
    }
}
