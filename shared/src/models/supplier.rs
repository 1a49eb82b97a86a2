//! Supplier models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier of goods, with denormalized delivery performance metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    /// Percentage of completed orders delivered on or before their expected date
    pub on_time_delivery_rate: Decimal,
    pub total_orders: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fold one completed order into the running on-time delivery rate.
///
/// `total_orders` is the count before this order is added.
pub fn fold_on_time_rate(current_rate: Decimal, total_orders: i32, on_time: bool) -> Decimal {
    let prior = Decimal::from(total_orders.max(0));
    let hits = prior * current_rate / Decimal::from(100);
    let hits = if on_time { hits + Decimal::ONE } else { hits };
    hits * Decimal::from(100) / (prior + Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_order_sets_rate_outright() {
        assert_eq!(
            fold_on_time_rate(Decimal::ZERO, 0, true),
            Decimal::from(100)
        );
        assert_eq!(fold_on_time_rate(Decimal::ZERO, 0, false), Decimal::ZERO);
    }

    #[test]
    fn rate_moves_toward_outcome() {
        // 4 orders at 100%, fifth late => 80%
        let rate = fold_on_time_rate(Decimal::from(100), 4, false);
        assert_eq!(rate, Decimal::from(80));

        // 4 orders at 75% (3 hits), fifth on time => 80%
        let rate = fold_on_time_rate(Decimal::from(75), 4, true);
        assert_eq!(rate, Decimal::from(80));
    }
}
