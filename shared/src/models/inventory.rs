//! Stock ledger and inventory level models
//!
//! Stock levels are never written directly: every change goes through a
//! `StockMovement` applied with [`StockSnapshot::apply`], so the ledger can
//! always be replayed to verify the materialized level.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    In,
    Out,
}

impl StockDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(StockDirection::In),
            "out" => Some(StockDirection::Out),
            _ => None,
        }
    }
}

/// Types of stock movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Sale,
    Purchase,
    TransferIn,
    TransferOut,
    Adjustment,
    Wastage,
    Return,
    Damage,
    Theft,
    Initial,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "sale",
            MovementType::Purchase => "purchase",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Adjustment => "adjustment",
            MovementType::Wastage => "wastage",
            MovementType::Return => "return",
            MovementType::Damage => "damage",
            MovementType::Theft => "theft",
            MovementType::Initial => "initial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(MovementType::Sale),
            "purchase" => Some(MovementType::Purchase),
            "transfer_in" => Some(MovementType::TransferIn),
            "transfer_out" => Some(MovementType::TransferOut),
            "adjustment" => Some(MovementType::Adjustment),
            "wastage" => Some(MovementType::Wastage),
            "return" => Some(MovementType::Return),
            "damage" => Some(MovementType::Damage),
            "theft" => Some(MovementType::Theft),
            "initial" => Some(MovementType::Initial),
            _ => None,
        }
    }

    /// Fixed direction for the type, or `None` for adjustments where the
    /// caller supplies it explicitly.
    pub fn direction(&self) -> Option<StockDirection> {
        match self {
            MovementType::Purchase
            | MovementType::TransferIn
            | MovementType::Return
            | MovementType::Initial => Some(StockDirection::In),
            MovementType::Sale
            | MovementType::TransferOut
            | MovementType::Wastage
            | MovementType::Damage
            | MovementType::Theft => Some(StockDirection::Out),
            MovementType::Adjustment => None,
        }
    }
}

/// Lifecycle status of a ledger entry; the only mutable field of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Pending,
    Approved,
    Cancelled,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Pending => "pending",
            MovementStatus::Approved => "approved",
            MovementStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MovementStatus::Pending),
            "approved" => Some(MovementStatus::Approved),
            "cancelled" => Some(MovementStatus::Cancelled),
            _ => None,
        }
    }
}

/// What kind of document a movement refers back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Sale,
    PurchaseOrder,
    Transfer,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Sale => "sale",
            ReferenceType::PurchaseOrder => "purchase_order",
            ReferenceType::Transfer => "transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(ReferenceType::Sale),
            "purchase_order" => Some(ReferenceType::PurchaseOrder),
            "transfer" => Some(ReferenceType::Transfer),
            _ => None,
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub movement_type: MovementType,
    pub direction: StockDirection,
    /// Always positive; direction carries the sign
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub status: MovementStatus,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Materialized stock level for a (product, branch) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub current_stock: i64,
    pub reserved_stock: i64,
    pub available_stock: i64,
    pub min_stock_level: i64,
    pub reorder_point: i64,
    pub average_cost_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl InventoryLevel {
    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot {
            current: self.current_stock,
            reserved: self.reserved_stock,
        }
    }

    /// At or below the reorder point
    pub fn needs_reorder(&self) -> bool {
        self.available_stock <= self.reorder_point
    }

    /// At or below the hard minimum
    pub fn is_critical(&self) -> bool {
        self.available_stock <= self.min_stock_level
    }
}

/// Errors from pure stock arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,
    #[error("insufficient stock: available {available}, requested {requested}")]
    Insufficient { available: i64, requested: i64 },
    #[error("cannot release {requested} units, only {reserved} reserved")]
    ReleaseExceedsReserved { reserved: i64, requested: i64 },
}

/// The numeric core of an inventory level, detached from identity so the
/// arithmetic can be exercised without a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub current: i64,
    pub reserved: i64,
}

impl StockSnapshot {
    pub const ZERO: StockSnapshot = StockSnapshot {
        current: 0,
        reserved: 0,
    };

    pub fn available(&self) -> i64 {
        self.current - self.reserved
    }

    /// Apply a movement of `quantity` units in `direction`.
    ///
    /// Outbound movements that would drive current stock negative are
    /// rejected unless `allow_negative` is set (adjustment override).
    pub fn apply(
        &self,
        direction: StockDirection,
        quantity: i64,
        allow_negative: bool,
    ) -> Result<StockSnapshot, StockError> {
        if quantity <= 0 {
            return Err(StockError::NonPositiveQuantity);
        }
        let current = match direction {
            StockDirection::In => self.current + quantity,
            StockDirection::Out => {
                let next = self.current - quantity;
                if next < 0 && !allow_negative {
                    return Err(StockError::Insufficient {
                        available: self.current,
                        requested: quantity,
                    });
                }
                next
            }
        };
        Ok(StockSnapshot {
            current,
            reserved: self.reserved,
        })
    }

    /// Put `quantity` units on hold; requires that much unreserved stock.
    pub fn reserve(&self, quantity: i64) -> Result<StockSnapshot, StockError> {
        if quantity <= 0 {
            return Err(StockError::NonPositiveQuantity);
        }
        if self.available() < quantity {
            return Err(StockError::Insufficient {
                available: self.available(),
                requested: quantity,
            });
        }
        Ok(StockSnapshot {
            current: self.current,
            reserved: self.reserved + quantity,
        })
    }

    /// Release a hold taken with [`reserve`](Self::reserve).
    pub fn release(&self, quantity: i64) -> Result<StockSnapshot, StockError> {
        if quantity <= 0 {
            return Err(StockError::NonPositiveQuantity);
        }
        if quantity > self.reserved {
            return Err(StockError::ReleaseExceedsReserved {
                reserved: self.reserved,
                requested: quantity,
            });
        }
        Ok(StockSnapshot {
            current: self.current,
            reserved: self.reserved - quantity,
        })
    }
}

/// Fold a purchase of `added_qty` units at `unit_cost` into a weighted
/// average cost over the stock already on hand.
pub fn weighted_average_cost(
    on_hand: i64,
    current_avg: Decimal,
    added_qty: i64,
    unit_cost: Decimal,
) -> Decimal {
    let on_hand = Decimal::from(on_hand.max(0));
    let added = Decimal::from(added_qty);
    let total_qty = on_hand + added;
    if total_qty <= Decimal::ZERO {
        return current_avg;
    }
    (on_hand * current_avg + added * unit_cost) / total_qty
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn apply_inbound_increments() {
        let s = StockSnapshot::ZERO
            .apply(StockDirection::In, 10, false)
            .unwrap();
        assert_eq!(s.current, 10);
        assert_eq!(s.available(), 10);
    }

    #[test]
    fn apply_outbound_rejects_overdraw() {
        let s = StockSnapshot {
            current: 3,
            reserved: 0,
        };
        let err = s.apply(StockDirection::Out, 5, false).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                available: 3,
                requested: 5
            }
        );
    }

    #[test]
    fn adjustment_override_allows_negative() {
        let s = StockSnapshot {
            current: 3,
            reserved: 0,
        };
        let s = s.apply(StockDirection::Out, 5, true).unwrap();
        assert_eq!(s.current, -2);
    }

    #[test]
    fn reserve_respects_available_not_current() {
        let s = StockSnapshot {
            current: 10,
            reserved: 8,
        };
        assert!(s.reserve(3).is_err());
        assert_eq!(s.reserve(2).unwrap().reserved, 10);
    }

    #[test]
    fn release_cannot_exceed_reserved() {
        let s = StockSnapshot {
            current: 10,
            reserved: 4,
        };
        assert!(s.release(5).is_err());
        assert_eq!(s.release(4).unwrap().reserved, 0);
    }

    #[test]
    fn zero_quantity_rejected_everywhere() {
        let s = StockSnapshot {
            current: 10,
            reserved: 2,
        };
        assert!(s.apply(StockDirection::In, 0, false).is_err());
        assert!(s.reserve(0).is_err());
        assert!(s.release(0).is_err());
    }

    #[test]
    fn movement_type_directions() {
        assert_eq!(MovementType::Purchase.direction(), Some(StockDirection::In));
        assert_eq!(MovementType::Sale.direction(), Some(StockDirection::Out));
        assert_eq!(MovementType::Theft.direction(), Some(StockDirection::Out));
        assert_eq!(MovementType::Initial.direction(), Some(StockDirection::In));
        assert_eq!(MovementType::Adjustment.direction(), None);
    }

    #[test]
    fn weighted_average_cost_folds() {
        // 100 units @ 20 + 50 units @ 30 => 23.33...
        let avg = weighted_average_cost(100, Decimal::from(20), 50, Decimal::from(30));
        assert!(avg > Decimal::from_str("23.3").unwrap());
        assert!(avg < Decimal::from_str("23.4").unwrap());
    }

    #[test]
    fn weighted_average_cost_first_purchase() {
        let avg = weighted_average_cost(0, Decimal::ZERO, 10, Decimal::from(15));
        assert_eq!(avg, Decimal::from(15));
    }
}
