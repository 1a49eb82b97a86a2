//! Inter-branch transfer models and state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a branch transfer
///
/// Legal transitions:
/// `REQUESTED -> APPROVED -> IN_TRANSIT -> RECEIVED`,
/// `REQUESTED -> REJECTED`, `REQUESTED/APPROVED -> CANCELLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Requested,
    Approved,
    InTransit,
    Received,
    Rejected,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Requested => "requested",
            TransferStatus::Approved => "approved",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Received => "received",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(TransferStatus::Requested),
            "approved" => Some(TransferStatus::Approved),
            "in_transit" => Some(TransferStatus::InTransit),
            "received" => Some(TransferStatus::Received),
            "rejected" => Some(TransferStatus::Rejected),
            "cancelled" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Received | TransferStatus::Rejected | TransferStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Requested, TransferStatus::Approved)
                | (TransferStatus::Requested, TransferStatus::Rejected)
                | (TransferStatus::Requested, TransferStatus::Cancelled)
                | (TransferStatus::Approved, TransferStatus::InTransit)
                | (TransferStatus::Approved, TransferStatus::Cancelled)
                | (TransferStatus::InTransit, TransferStatus::Received)
        )
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl TransferPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferPriority::Low => "low",
            TransferPriority::Normal => "normal",
            TransferPriority::High => "high",
            TransferPriority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TransferPriority::Low),
            "normal" => Some(TransferPriority::Normal),
            "high" => Some(TransferPriority::High),
            "urgent" => Some(TransferPriority::Urgent),
            _ => None,
        }
    }
}

/// A single product line on a transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub requested_quantity: i64,
    /// Set at approval time, never above the requested quantity
    pub approved_quantity: Option<i64>,
    /// Accumulates across partial receipts, never above the approved quantity
    pub received_quantity: i64,
}

impl TransferItem {
    pub fn new(product_id: Uuid, product_name: String, requested_quantity: i64) -> Self {
        Self {
            product_id,
            product_name,
            requested_quantity,
            approved_quantity: None,
            received_quantity: 0,
        }
    }

    /// Units approved but not yet received
    pub fn outstanding(&self) -> i64 {
        self.approved_quantity.unwrap_or(0) - self.received_quantity
    }

    pub fn is_fully_received(&self) -> bool {
        match self.approved_quantity {
            Some(approved) => self.received_quantity >= approved,
            None => false,
        }
    }
}

/// An inter-branch stock transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchTransfer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transfer_number: String,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub items: Vec<TransferItem>,
    pub status: TransferStatus,
    pub priority: TransferPriority,
    pub notes: Option<String>,
    pub tracking_reference: Option<String>,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl BranchTransfer {
    pub fn all_items_received(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(TransferItem::is_fully_received)
    }
}

/// A received line within one receive call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceiptLine {
    pub product_id: Uuid,
    pub received_quantity: i64,
}

/// Accumulate one receive call into the transfer items.
///
/// Each line must match an approved item and must not push the cumulative
/// received quantity past the approved quantity. Returns `true` when every
/// item on the transfer is now fully received.
pub fn apply_transfer_receipt(
    items: &mut [TransferItem],
    lines: &[TransferReceiptLine],
) -> Result<bool, &'static str> {
    if lines.is_empty() {
        return Err("at least one received item is required");
    }
    for line in lines {
        if line.received_quantity <= 0 {
            return Err("received quantity must be positive");
        }
        let item = items
            .iter_mut()
            .find(|i| i.product_id == line.product_id)
            .ok_or("received product is not on the transfer")?;
        let approved = item
            .approved_quantity
            .ok_or("item has no approved quantity")?;
        if item.received_quantity + line.received_quantity > approved {
            return Err("received quantity exceeds approved quantity");
        }
        item.received_quantity += line.received_quantity;
    }
    Ok(!items.is_empty() && items.iter().all(TransferItem::is_fully_received))
}

/// Format a sequential transfer number, e.g. `TRF-2026-0042`
pub fn format_transfer_number(year: i32, sequence: i32) -> String {
    format!("TRF-{}-{:04}", year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(requested: i64, approved: Option<i64>, received: i64) -> TransferItem {
        TransferItem {
            product_id: Uuid::new_v4(),
            product_name: "Test".to_string(),
            requested_quantity: requested,
            approved_quantity: approved,
            received_quantity: received,
        }
    }

    #[test]
    fn transition_table_admits_documented_edges_only() {
        use TransferStatus::*;
        let all = [Requested, Approved, InTransit, Received, Rejected, Cancelled];
        let legal = [
            (Requested, Approved),
            (Requested, Rejected),
            (Requested, Cancelled),
            (Approved, InTransit),
            (Approved, Cancelled),
            (InTransit, Received),
        ];
        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use TransferStatus::*;
        for from in [Received, Rejected, Cancelled] {
            assert!(from.is_terminal());
            for to in [Requested, Approved, InTransit, Received, Rejected, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn receipt_accumulates_and_reports_completion() {
        let mut items = vec![item(10, Some(6), 0)];
        let pid = items[0].product_id;
        let done = apply_transfer_receipt(
            &mut items,
            &[TransferReceiptLine {
                product_id: pid,
                received_quantity: 4,
            }],
        )
        .unwrap();
        assert!(!done);
        assert_eq!(items[0].received_quantity, 4);

        let done = apply_transfer_receipt(
            &mut items,
            &[TransferReceiptLine {
                product_id: pid,
                received_quantity: 2,
            }],
        )
        .unwrap();
        assert!(done);
    }

    #[test]
    fn receipt_rejects_overdelivery() {
        let mut items = vec![item(10, Some(6), 5)];
        let pid = items[0].product_id;
        let err = apply_transfer_receipt(
            &mut items,
            &[TransferReceiptLine {
                product_id: pid,
                received_quantity: 2,
            }],
        )
        .unwrap_err();
        assert_eq!(err, "received quantity exceeds approved quantity");
        // rejected call must not mutate
        assert_eq!(items[0].received_quantity, 5);
    }

    #[test]
    fn receipt_rejects_unknown_product() {
        let mut items = vec![item(10, Some(6), 0)];
        let err = apply_transfer_receipt(
            &mut items,
            &[TransferReceiptLine {
                product_id: Uuid::new_v4(),
                received_quantity: 1,
            }],
        )
        .unwrap_err();
        assert_eq!(err, "received product is not on the transfer");
    }

    #[test]
    fn transfer_number_format() {
        assert_eq!(format_transfer_number(2026, 7), "TRF-2026-0007");
        assert_eq!(format_transfer_number(2026, 12345), "TRF-2026-12345");
    }
}
