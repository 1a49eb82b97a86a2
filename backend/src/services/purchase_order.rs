//! Purchase order workflow service
//!
//! DRAFT -> PENDING -> APPROVED -> SENT -> ACKNOWLEDGED ->
//! PARTIALLY_RECEIVED -> RECEIVED, with CANCELLED/REJECTED/DELAYED side
//! branches. Receiving writes a PURCHASE ledger entry per received line in
//! the same transaction as the status change, folds unit costs into the
//! branch's average cost, and updates supplier delivery metrics on full
//! receipt.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{InventoryService, RecordMovementInput};
use crate::services::notification::{NotificationKind, NotificationService};
use crate::services::product::ProductService;
use crate::services::supplier::SupplierService;
use crate::services::transfer::next_document_sequence;
use shared::models::{
    apply_order_receipt, format_po_number, order_totals, MovementType, PurchaseOrder,
    PurchaseOrderItem, PurchaseOrderStatus, ReceiptLine, ReferenceType,
};
use shared::validation::validate_positive_quantity;

/// Purchase order workflow service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
    inventory: InventoryService,
    products: ProductService,
    suppliers: SupplierService,
    notifications: NotificationService,
}

/// Input for creating a purchase order
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub branch_id: Uuid,
    pub items: Vec<OrderedItemInput>,
    pub expected_delivery_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderedItemInput {
    pub product_id: Uuid,
    pub quantity_ordered: i64,
    pub unit_cost: Decimal,
}

/// Input for receiving order items
#[derive(Debug, Deserialize)]
pub struct ReceiveOrderInput {
    pub items: Vec<ReceiptLine>,
}

/// Input carrying a reason for reject/cancel
#[derive(Debug, Deserialize)]
pub struct ReasonInput {
    pub reason: String,
}

/// Filter for listing purchase orders
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    po_number: String,
    supplier_id: Uuid,
    branch_id: Uuid,
    items: serde_json::Value,
    status: String,
    expected_delivery_date: NaiveDate,
    subtotal: Decimal,
    total: Decimal,
    notes: Option<String>,
    created_by: Uuid,
    approved_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    rejection_reason: Option<String>,
}

impl OrderRow {
    fn into_model(self) -> AppResult<PurchaseOrder> {
        let items: Vec<PurchaseOrderItem> = serde_json::from_value(self.items)
            .map_err(|e| AppError::Internal(format!("malformed order items: {}", e)))?;
        Ok(PurchaseOrder {
            id: self.id,
            user_id: self.user_id,
            po_number: self.po_number,
            supplier_id: self.supplier_id,
            branch_id: self.branch_id,
            items,
            status: PurchaseOrderStatus::from_str(&self.status)
                .ok_or_else(|| AppError::Internal("unknown order status".into()))?,
            expected_delivery_date: self.expected_delivery_date,
            subtotal: self.subtotal,
            total: self.total,
            notes: self.notes,
            created_by: self.created_by,
            approved_by: self.approved_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            received_at: self.received_at,
            cancellation_reason: self.cancellation_reason,
            rejection_reason: self.rejection_reason,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, po_number, supplier_id, branch_id, items, status, \
                             expected_delivery_date, subtotal, total, notes, created_by, \
                             approved_by, created_at, updated_at, received_at, \
                             cancellation_reason, rejection_reason";

impl PurchaseOrderService {
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self {
            inventory: InventoryService::new(db.clone()),
            products: ProductService::new(db.clone()),
            suppliers: SupplierService::new(db.clone()),
            db,
            notifications,
        }
    }

    /// Create a draft purchase order
    pub async fn create(
        &self,
        user_id: Uuid,
        created_by: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrder> {
        if input.items.is_empty() {
            return Err(AppError::validation("items", "At least one item is required"));
        }
        for item in &input.items {
            validate_positive_quantity(item.quantity_ordered)
                .map_err(|e| AppError::validation("quantity_ordered", e))?;
            if item.unit_cost <= Decimal::ZERO {
                return Err(AppError::validation(
                    "unit_cost",
                    "Unit cost must be positive",
                ));
            }
        }
        if input.expected_delivery_date <= Utc::now().date_naive() {
            return Err(AppError::validation(
                "expected_delivery_date",
                "Expected delivery date must be in the future",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if !input.items.iter().all(|i| seen.insert(i.product_id)) {
            return Err(AppError::validation("items", "Duplicate product on order"));
        }

        // Supplier and branch must exist and belong to the tenant
        self.suppliers.get(user_id, input.supplier_id).await?;
        let branch_owner = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM branches WHERE id = $1",
        )
        .bind(input.branch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch".to_string()))?;
        if branch_owner != user_id {
            return Err(AppError::AccessDenied("Branch".to_string()));
        }

        let ids: Vec<Uuid> = input.items.iter().map(|i| i.product_id).collect();
        let refs = self.products.resolve_refs(user_id, &ids).await?;

        let items: Vec<PurchaseOrderItem> = input
            .items
            .iter()
            .map(|i| {
                let name = refs
                    .iter()
                    .find(|r| r.id == i.product_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_default();
                PurchaseOrderItem::new(i.product_id, name, i.quantity_ordered, i.unit_cost)
            })
            .collect();
        let (subtotal, total) = order_totals(&items);
        let items_json =
            serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let sequence = next_document_sequence(&mut tx, user_id, "purchase_order").await?;
        let po_number = format_po_number(Utc::now().year(), sequence);

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO purchase_orders (
                user_id, po_number, supplier_id, branch_id, items, status,
                expected_delivery_date, subtotal, total, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&po_number)
        .bind(input.supplier_id)
        .bind(input.branch_id)
        .bind(items_json)
        .bind(PurchaseOrderStatus::Draft.as_str())
        .bind(input.expected_delivery_date)
        .bind(subtotal)
        .bind(total)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Submit a draft for approval
    pub async fn submit(&self, user_id: Uuid, order_id: Uuid) -> AppResult<PurchaseOrder> {
        let order = self
            .transition(user_id, order_id, PurchaseOrderStatus::Pending, "submit", None)
            .await?;
        self.notifications.dispatch(
            user_id,
            NotificationKind::PurchaseOrderSubmitted,
            format!("Purchase order {} awaiting approval", order.po_number),
            format!("Total {} for {} item line(s)", order.total, order.items.len()),
            Some(("purchase_order", order.id)),
        );
        Ok(order)
    }

    /// Approve a pending order
    pub async fn approve(
        &self,
        user_id: Uuid,
        approver: Uuid,
        order_id: Uuid,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;
        let order = self.lock_order(&mut tx, user_id, order_id).await?;
        self.require_transition(&order, PurchaseOrderStatus::Approved, "approve")?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET status = $1, approved_by = $2, updated_at = NOW()
            WHERE id = $3 AND user_id = $4
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(PurchaseOrderStatus::Approved.as_str())
        .bind(approver)
        .bind(order_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Reject a pending order
    pub async fn reject(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: ReasonInput,
    ) -> AppResult<PurchaseOrder> {
        self.transition(
            user_id,
            order_id,
            PurchaseOrderStatus::Rejected,
            "reject",
            Some(("rejection_reason", input.reason)),
        )
        .await
    }

    /// Send an approved order to the supplier
    pub async fn send(&self, user_id: Uuid, order_id: Uuid) -> AppResult<PurchaseOrder> {
        self.transition(user_id, order_id, PurchaseOrderStatus::Sent, "send", None)
            .await
    }

    /// Record the supplier's acknowledgement
    pub async fn acknowledge(&self, user_id: Uuid, order_id: Uuid) -> AppResult<PurchaseOrder> {
        self.transition(
            user_id,
            order_id,
            PurchaseOrderStatus::Acknowledged,
            "acknowledge",
            None,
        )
        .await
    }

    /// Flag an overdue order as delayed; it can still be received
    pub async fn mark_delayed(&self, user_id: Uuid, order_id: Uuid) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;
        let order = self.lock_order(&mut tx, user_id, order_id).await?;
        self.require_transition(&order, PurchaseOrderStatus::Delayed, "delay")?;
        if order.expected_delivery_date >= Utc::now().date_naive() {
            return Err(AppError::validation(
                "expected_delivery_date",
                "Order is not yet past its expected delivery date",
            ));
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(PurchaseOrderStatus::Delayed.as_str())
        .bind(order_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Cancel an order that has not been acknowledged or received
    pub async fn cancel(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: ReasonInput,
    ) -> AppResult<PurchaseOrder> {
        self.transition(
            user_id,
            order_id,
            PurchaseOrderStatus::Cancelled,
            "cancel",
            Some(("cancellation_reason", input.reason)),
        )
        .await
    }

    /// Receive goods against the order.
    ///
    /// Each received line is capped by its ordered quantity across all
    /// partial receipts and books a PURCHASE movement in this transaction.
    /// The order becomes RECEIVED when every item is complete, otherwise
    /// PARTIALLY_RECEIVED. On full receipt the supplier's delivery metrics
    /// are folded in.
    pub async fn receive(
        &self,
        user_id: Uuid,
        received_by: Uuid,
        order_id: Uuid,
        input: ReceiveOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;
        let order = self.lock_order(&mut tx, user_id, order_id).await?;

        if !order.status.is_receivable() {
            return Err(AppError::invalid_transition(format!(
                "Cannot receive order in status {}",
                order.status
            )));
        }

        let mut items = order.items.clone();
        let fully_received = apply_order_receipt(&mut items, &input.items)
            .map_err(|e| AppError::validation("items", e))?;

        for line in &input.items {
            let unit_cost = items
                .iter()
                .find(|i| i.product_id == line.product_id)
                .map(|i| i.unit_cost);
            self.inventory
                .ensure_level_in_tx(&mut tx, user_id, line.product_id, order.branch_id)
                .await?;
            self.inventory
                .record_movement_in_tx(
                    &mut tx,
                    user_id,
                    received_by,
                    &RecordMovementInput {
                        product_id: line.product_id,
                        branch_id: order.branch_id,
                        movement_type: MovementType::Purchase,
                        quantity: line.quantity_received,
                        direction: None,
                        allow_negative: false,
                        unit_cost,
                        reference_type: Some(ReferenceType::PurchaseOrder),
                        reference_id: Some(order.id),
                        notes: None,
                    },
                )
                .await?;
        }

        let next_status = if fully_received {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::PartiallyReceived
        };

        if fully_received {
            let on_time = Utc::now().date_naive() <= order.expected_delivery_date;
            self.suppliers
                .record_completed_order_in_tx(&mut tx, user_id, order.supplier_id, on_time)
                .await?;
        }

        let items_json =
            serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET items = $1, status = $2, updated_at = NOW(),
                received_at = CASE WHEN $3 THEN NOW() ELSE received_at END
            WHERE id = $4 AND user_id = $5
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(items_json)
        .bind(next_status.as_str())
        .bind(fully_received)
        .bind(order_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let order = row.into_model()?;
        if fully_received {
            self.notifications.dispatch(
                user_id,
                NotificationKind::PurchaseOrderReceived,
                format!("Purchase order {} fully received", order.po_number),
                "All ordered items have been booked into stock".to_string(),
                Some(("purchase_order", order.id)),
            );
        }

        Ok(order)
    }

    /// List orders with optional filters, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: PurchaseOrderFilter,
    ) -> AppResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM purchase_orders
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR supplier_id = $3)
              AND ($4::uuid IS NULL OR branch_id = $4)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.supplier_id)
        .bind(filter.branch_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(OrderRow::into_model).collect()
    }

    /// Get an order, enforcing tenant ownership
    pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM purchase_orders
            WHERE id = $1
            "#
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        if row.user_id != user_id {
            return Err(AppError::AccessDenied("Purchase order".to_string()));
        }

        row.into_model()
    }

    /// Generic single-status transition with an optional reason column
    async fn transition(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        next: PurchaseOrderStatus,
        action: &str,
        reason: Option<(&str, String)>,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;
        let order = self.lock_order(&mut tx, user_id, order_id).await?;
        self.require_transition(&order, next, action)?;

        let row = match reason {
            Some((column, value)) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    r#"
                    UPDATE purchase_orders
                    SET status = $1, {column} = $2, updated_at = NOW()
                    WHERE id = $3 AND user_id = $4
                    RETURNING {ORDER_COLUMNS}
                    "#
                ))
                .bind(next.as_str())
                .bind(value)
                .bind(order_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    r#"
                    UPDATE purchase_orders
                    SET status = $1, updated_at = NOW()
                    WHERE id = $2 AND user_id = $3
                    RETURNING {ORDER_COLUMNS}
                    "#
                ))
                .bind(next.as_str())
                .bind(order_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        row.into_model()
    }

    async fn lock_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM purchase_orders
            WHERE id = $1
            FOR UPDATE
            "#
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        if row.user_id != user_id {
            return Err(AppError::AccessDenied("Purchase order".to_string()));
        }

        row.into_model()
    }

    fn require_transition(
        &self,
        order: &PurchaseOrder,
        next: PurchaseOrderStatus,
        action: &str,
    ) -> AppResult<()> {
        if !order.status.can_transition_to(next) {
            return Err(AppError::invalid_transition(format!(
                "Cannot {} order in status {}",
                action, order.status
            )));
        }
        Ok(())
    }
}
