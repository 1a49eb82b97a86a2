//! Purchase order models and state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a purchase order
///
/// Main line: `DRAFT -> PENDING -> APPROVED -> SENT -> ACKNOWLEDGED ->
/// PARTIALLY_RECEIVED -> RECEIVED`. Side branches: CANCELLED from
/// DRAFT/PENDING/APPROVED/SENT, REJECTED from PENDING, DELAYED from
/// SENT/ACKNOWLEDGED. A DELAYED order can still be received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
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
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "draft",
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Approved => "approved",
            PurchaseOrderStatus::Sent => "sent",
            PurchaseOrderStatus::Acknowledged => "acknowledged",
            PurchaseOrderStatus::PartiallyReceived => "partially_received",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
            PurchaseOrderStatus::Rejected => "rejected",
            PurchaseOrderStatus::Delayed => "delayed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PurchaseOrderStatus::Draft),
            "pending" => Some(PurchaseOrderStatus::Pending),
            "approved" => Some(PurchaseOrderStatus::Approved),
            "sent" => Some(PurchaseOrderStatus::Sent),
            "acknowledged" => Some(PurchaseOrderStatus::Acknowledged),
            "partially_received" => Some(PurchaseOrderStatus::PartiallyReceived),
            "received" => Some(PurchaseOrderStatus::Received),
            "cancelled" => Some(PurchaseOrderStatus::Cancelled),
            "rejected" => Some(PurchaseOrderStatus::Rejected),
            "delayed" => Some(PurchaseOrderStatus::Delayed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received
                | PurchaseOrderStatus::Cancelled
                | PurchaseOrderStatus::Rejected
        )
    }

    /// Goods can be booked in from these states
    pub fn is_receivable(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Sent
                | PurchaseOrderStatus::Acknowledged
                | PurchaseOrderStatus::PartiallyReceived
                | PurchaseOrderStatus::Delayed
        )
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Draft
                | PurchaseOrderStatus::Pending
                | PurchaseOrderStatus::Approved
                | PurchaseOrderStatus::Sent
        )
    }

    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;
        match (self, next) {
            (Draft, Pending) => true,
            (Pending, Approved) | (Pending, Rejected) => true,
            (Approved, Sent) => true,
            (Sent, Acknowledged) => true,
            (Sent, Delayed) | (Acknowledged, Delayed) => true,
            (from, PartiallyReceived) | (from, Received) => from.is_receivable(),
            (from, Cancelled) => from.is_cancellable(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single product line on a purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_ordered: i64,
    /// Accumulates across partial receipts, never above the ordered quantity
    pub quantity_received: i64,
    /// Subset of the received quantity flagged defective
    pub defective_quantity: i64,
    pub unit_cost: Decimal,
}

impl PurchaseOrderItem {
    pub fn new(
        product_id: Uuid,
        product_name: String,
        quantity_ordered: i64,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            product_id,
            product_name,
            quantity_ordered,
            quantity_received: 0,
            defective_quantity: 0,
            unit_cost,
        }
    }

    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity_ordered) * self.unit_cost
    }

    pub fn outstanding(&self) -> i64 {
        self.quantity_ordered - self.quantity_received
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }
}

/// A supplier purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub branch_id: Uuid,
    pub items: Vec<PurchaseOrderItem>,
    pub status: PurchaseOrderStatus,
    pub expected_delivery_date: NaiveDate,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub rejection_reason: Option<String>,
}

impl PurchaseOrder {
    pub fn all_items_received(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(PurchaseOrderItem::is_fully_received)
    }
}

/// A received line within one receive call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub product_id: Uuid,
    pub quantity_received: i64,
    #[serde(default)]
    pub defective_quantity: i64,
}

/// Accumulate one receive call into the order items.
///
/// Per item the cumulative received quantity may never exceed the ordered
/// quantity, and defective units may never exceed the units received in the
/// same call. Returns `true` when every item is now fully received.
pub fn apply_order_receipt(
    items: &mut [PurchaseOrderItem],
    lines: &[ReceiptLine],
) -> Result<bool, &'static str> {
    if lines.is_empty() {
        return Err("at least one received item is required");
    }
    for line in lines {
        if line.quantity_received <= 0 {
            return Err("received quantity must be positive");
        }
        if line.defective_quantity < 0 || line.defective_quantity > line.quantity_received {
            return Err("defective quantity cannot exceed received quantity");
        }
        let item = items
            .iter_mut()
            .find(|i| i.product_id == line.product_id)
            .ok_or("received product is not on the order")?;
        if item.quantity_received + line.quantity_received > item.quantity_ordered {
            return Err("received quantity exceeds ordered quantity");
        }
        item.quantity_received += line.quantity_received;
        item.defective_quantity += line.defective_quantity;
    }
    Ok(!items.is_empty() && items.iter().all(PurchaseOrderItem::is_fully_received))
}

/// Sum of line totals; tax handling is left to the invoicing layer, so the
/// order total equals the subtotal.
pub fn order_totals(items: &[PurchaseOrderItem]) -> (Decimal, Decimal) {
    let subtotal: Decimal = items.iter().map(PurchaseOrderItem::line_total).sum();
    (subtotal, subtotal)
}

/// Format a sequential purchase order number, e.g. `PO-2026-0042`
pub fn format_po_number(year: i32, sequence: i32) -> String {
    format!("PO-{}-{:04}", year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(ordered: i64, received: i64, cost: i64) -> PurchaseOrderItem {
        PurchaseOrderItem {
            product_id: Uuid::new_v4(),
            product_name: "Test".to_string(),
            quantity_ordered: ordered,
            quantity_received: received,
            defective_quantity: 0,
            unit_cost: Decimal::from(cost),
        }
    }

    #[test]
    fn main_line_transitions() {
        use PurchaseOrderStatus::*;
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
    fn no_skipping_forward_from_draft() {
        use PurchaseOrderStatus::*;
        assert!(!Draft.can_transition_to(Approved));
        assert!(!Draft.can_transition_to(Sent));
        assert!(!Draft.can_transition_to(Received));
    }

    #[test]
    fn cancel_only_from_documented_states() {
        use PurchaseOrderStatus::*;
        for s in [Draft, Pending, Approved, Sent] {
            assert!(s.can_transition_to(Cancelled), "{s:?}");
        }
        for s in [Acknowledged, PartiallyReceived, Received, Cancelled, Rejected, Delayed] {
            assert!(!s.can_transition_to(Cancelled), "{s:?}");
        }
    }

    #[test]
    fn delayed_remains_receivable() {
        use PurchaseOrderStatus::*;
        assert!(Delayed.is_receivable());
        assert!(Delayed.can_transition_to(Received));
        assert!(Delayed.can_transition_to(PartiallyReceived));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use PurchaseOrderStatus::*;
        let all = [
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
        for from in [Received, Cancelled, Rejected] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn receipt_caps_at_ordered_quantity() {
        let mut items = vec![item(10, 8, 5)];
        let pid = items[0].product_id;
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

    #[test]
    fn receipt_defective_bounded_by_received() {
        let mut items = vec![item(10, 0, 5)];
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
    fn receipt_completion_needs_every_item() {
        let mut items = vec![item(10, 0, 5), item(4, 0, 2)];
        let first = items[0].product_id;
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

        let second = items[1].product_id;
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

    #[test]
    fn totals_sum_line_totals() {
        let items = vec![item(10, 0, 5), item(3, 0, 7)];
        let (subtotal, total) = order_totals(&items);
        assert_eq!(subtotal, Decimal::from(71));
        assert_eq!(total, subtotal);
    }

    #[test]
    fn po_number_format() {
        assert_eq!(format_po_number(2026, 3), "PO-2026-0003");
    }
}
