//! Inter-branch transfer workflow service
//!
//! State machine: REQUESTED -> APPROVED -> IN_TRANSIT -> RECEIVED, with
//! REJECTED from REQUESTED and CANCELLED from REQUESTED/APPROVED.
//!
//! Stock handling: approval places a reservation on the source branch so the
//! approved goods cannot be sold out from under the transfer; the actual
//! TRANSFER_OUT / TRANSFER_IN ledger pair is written at receipt time, per
//! received line, in the same transaction as the status change. Partial
//! receipts repeat that until every item is fully received.

use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{InventoryService, RecordMovementInput};
use crate::services::notification::{NotificationKind, NotificationService};
use crate::services::product::ProductService;
use shared::models::{
    apply_transfer_receipt, format_transfer_number, BranchStatus, BranchTransfer, MovementType,
    ReferenceType, TransferItem, TransferPriority, TransferReceiptLine, TransferStatus,
};
use shared::validation::{validate_positive_quantity, validate_transfer_branches};

/// Transfer workflow service
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
    inventory: InventoryService,
    products: ProductService,
    notifications: NotificationService,
}

/// Input for creating a transfer
#[derive(Debug, Deserialize)]
pub struct CreateTransferInput {
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub items: Vec<RequestedItemInput>,
    #[serde(default)]
    pub priority: TransferPriority,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RequestedItemInput {
    pub product_id: Uuid,
    pub requested_quantity: i64,
}

/// Input for approving a transfer; items left out are approved in full
#[derive(Debug, Deserialize)]
pub struct ApproveTransferInput {
    #[serde(default)]
    pub items: Vec<ApprovedItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovedItemInput {
    pub product_id: Uuid,
    pub approved_quantity: i64,
}

/// Input for shipping a transfer
#[derive(Debug, Deserialize)]
pub struct ShipTransferInput {
    pub tracking_reference: Option<String>,
}

/// Input for receiving transfer items
#[derive(Debug, Deserialize)]
pub struct ReceiveTransferInput {
    pub items: Vec<TransferReceiptLine>,
}

/// Input carrying a reason for reject/cancel
#[derive(Debug, Deserialize)]
pub struct ReasonInput {
    pub reason: String,
}

/// Filter for listing transfers
#[derive(Debug, Default, Deserialize)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: Uuid,
    user_id: Uuid,
    transfer_number: String,
    from_branch_id: Uuid,
    to_branch_id: Uuid,
    items: serde_json::Value,
    status: String,
    priority: String,
    notes: Option<String>,
    tracking_reference: Option<String>,
    requested_by: Uuid,
    requested_at: DateTime<Utc>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    received_by: Option<Uuid>,
    received_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    cancellation_reason: Option<String>,
}

impl TransferRow {
    fn into_model(self) -> AppResult<BranchTransfer> {
        let items: Vec<TransferItem> = serde_json::from_value(self.items)
            .map_err(|e| AppError::Internal(format!("malformed transfer items: {}", e)))?;
        Ok(BranchTransfer {
            id: self.id,
            user_id: self.user_id,
            transfer_number: self.transfer_number,
            from_branch_id: self.from_branch_id,
            to_branch_id: self.to_branch_id,
            items,
            status: TransferStatus::from_str(&self.status)
                .ok_or_else(|| AppError::Internal("unknown transfer status".into()))?,
            priority: TransferPriority::from_str(&self.priority)
                .ok_or_else(|| AppError::Internal("unknown transfer priority".into()))?,
            notes: self.notes,
            tracking_reference: self.tracking_reference,
            requested_by: self.requested_by,
            requested_at: self.requested_at,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            shipped_at: self.shipped_at,
            received_by: self.received_by,
            received_at: self.received_at,
            rejection_reason: self.rejection_reason,
            cancellation_reason: self.cancellation_reason,
        })
    }
}

const TRANSFER_COLUMNS: &str = "id, user_id, transfer_number, from_branch_id, to_branch_id, \
                                items, status, priority, notes, tracking_reference, \
                                requested_by, requested_at, approved_by, approved_at, \
                                shipped_at, received_by, received_at, rejection_reason, \
                                cancellation_reason";

impl TransferService {
    pub fn new(db: PgPool, notifications: NotificationService) -> Self {
        Self {
            inventory: InventoryService::new(db.clone()),
            products: ProductService::new(db.clone()),
            db,
            notifications,
        }
    }

    /// Create a transfer request
    pub async fn create(
        &self,
        user_id: Uuid,
        requested_by: Uuid,
        input: CreateTransferInput,
    ) -> AppResult<BranchTransfer> {
        validate_transfer_branches(input.from_branch_id, input.to_branch_id)
            .map_err(|e| AppError::validation("to_branch_id", e))?;

        if input.items.is_empty() {
            return Err(AppError::validation("items", "At least one item is required"));
        }
        for item in &input.items {
            validate_positive_quantity(item.requested_quantity)
                .map_err(|e| AppError::validation("requested_quantity", e))?;
        }
        let mut seen = std::collections::HashSet::new();
        if !input.items.iter().all(|i| seen.insert(i.product_id)) {
            return Err(AppError::validation(
                "items",
                "Duplicate product on transfer",
            ));
        }

        self.require_operational_branch(user_id, input.from_branch_id)
            .await?;
        self.require_operational_branch(user_id, input.to_branch_id)
            .await?;

        let ids: Vec<Uuid> = input.items.iter().map(|i| i.product_id).collect();
        let refs = self.products.resolve_refs(user_id, &ids).await?;

        let items: Vec<TransferItem> = input
            .items
            .iter()
            .map(|i| {
                let name = refs
                    .iter()
                    .find(|r| r.id == i.product_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_default();
                TransferItem::new(i.product_id, name, i.requested_quantity)
            })
            .collect();
        let items_json =
            serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let sequence = next_document_sequence(&mut tx, user_id, "transfer").await?;
        let transfer_number = format_transfer_number(Utc::now().year(), sequence);

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            INSERT INTO branch_transfers (
                user_id, transfer_number, from_branch_id, to_branch_id, items,
                status, priority, notes, requested_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&transfer_number)
        .bind(input.from_branch_id)
        .bind(input.to_branch_id)
        .bind(items_json)
        .bind(TransferStatus::Requested.as_str())
        .bind(input.priority.as_str())
        .bind(&input.notes)
        .bind(requested_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let transfer = row.into_model()?;
        self.notifications.dispatch(
            user_id,
            NotificationKind::TransferRequested,
            format!("Transfer {} requested", transfer.transfer_number),
            format!(
                "{} item line(s) requested for transfer between branches",
                transfer.items.len()
            ),
            Some(("transfer", transfer.id)),
        );

        Ok(transfer)
    }

    /// Approve a transfer. The approver must not be the requester, and each
    /// approved quantity is capped by the requested quantity. Approved stock
    /// is reserved on the source branch in the same transaction.
    pub async fn approve(
        &self,
        user_id: Uuid,
        approver: Uuid,
        transfer_id: Uuid,
        input: ApproveTransferInput,
    ) -> AppResult<BranchTransfer> {
        let mut tx = self.db.begin().await?;
        let transfer = self.lock_transfer(&mut tx, user_id, transfer_id).await?;

        self.require_transition(&transfer, TransferStatus::Approved, "approve")?;
        if approver == transfer.requested_by {
            return Err(AppError::validation(
                "approved_by",
                "A transfer cannot be approved by its requester",
            ));
        }

        let mut items = transfer.items.clone();
        for item in &mut items {
            let approved = input
                .items
                .iter()
                .find(|l| l.product_id == item.product_id)
                .map(|l| l.approved_quantity)
                .unwrap_or(item.requested_quantity);
            validate_positive_quantity(approved)
                .map_err(|e| AppError::validation("approved_quantity", e))?;
            if approved > item.requested_quantity {
                return Err(AppError::validation(
                    "approved_quantity",
                    "Approved quantity cannot exceed requested quantity",
                ));
            }
            item.approved_quantity = Some(approved);
        }
        for line in &input.items {
            if !items.iter().any(|i| i.product_id == line.product_id) {
                return Err(AppError::validation(
                    "items",
                    "Approved product is not on the transfer",
                ));
            }
        }

        // Hold the approved quantities at the source so they cannot be sold
        // while the transfer is underway
        for item in &items {
            self.inventory
                .shift_reservation_in_tx(
                    &mut tx,
                    user_id,
                    item.product_id,
                    transfer.from_branch_id,
                    item.approved_quantity.unwrap_or(0),
                )
                .await?;
        }

        let items_json =
            serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?;
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            UPDATE branch_transfers
            SET items = $1, status = $2, approved_by = $3, approved_at = NOW()
            WHERE id = $4 AND user_id = $5
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(items_json)
        .bind(TransferStatus::Approved.as_str())
        .bind(approver)
        .bind(transfer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let transfer = row.into_model()?;
        self.notifications.dispatch(
            user_id,
            NotificationKind::TransferApproved,
            format!("Transfer {} approved", transfer.transfer_number),
            "Approved stock has been reserved at the source branch".to_string(),
            Some(("transfer", transfer.id)),
        );

        Ok(transfer)
    }

    /// Reject a requested transfer
    pub async fn reject(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        input: ReasonInput,
    ) -> AppResult<BranchTransfer> {
        let mut tx = self.db.begin().await?;
        let transfer = self.lock_transfer(&mut tx, user_id, transfer_id).await?;
        self.require_transition(&transfer, TransferStatus::Rejected, "reject")?;

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            UPDATE branch_transfers
            SET status = $1, rejection_reason = $2
            WHERE id = $3 AND user_id = $4
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(TransferStatus::Rejected.as_str())
        .bind(&input.reason)
        .bind(transfer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Mark an approved transfer as shipped
    pub async fn ship(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        input: ShipTransferInput,
    ) -> AppResult<BranchTransfer> {
        let mut tx = self.db.begin().await?;
        let transfer = self.lock_transfer(&mut tx, user_id, transfer_id).await?;
        self.require_transition(&transfer, TransferStatus::InTransit, "ship")?;

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            UPDATE branch_transfers
            SET status = $1, tracking_reference = $2, shipped_at = NOW()
            WHERE id = $3 AND user_id = $4
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(TransferStatus::InTransit.as_str())
        .bind(&input.tracking_reference)
        .bind(transfer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// Receive transfer items at the destination.
    ///
    /// For every received line the source TRANSFER_OUT and destination
    /// TRANSFER_IN are written in this same transaction; the transfer reaches
    /// RECEIVED only when every item is fully received, otherwise it stays
    /// IN_TRANSIT for further partial receipts.
    pub async fn receive(
        &self,
        user_id: Uuid,
        received_by: Uuid,
        transfer_id: Uuid,
        input: ReceiveTransferInput,
    ) -> AppResult<BranchTransfer> {
        let mut tx = self.db.begin().await?;
        let transfer = self.lock_transfer(&mut tx, user_id, transfer_id).await?;

        if transfer.status != TransferStatus::InTransit {
            return Err(AppError::invalid_transition(format!(
                "Cannot receive transfer in status {}",
                transfer.status
            )));
        }

        let mut items = transfer.items.clone();
        let fully_received = apply_transfer_receipt(&mut items, &input.items)
            .map_err(|e| AppError::validation("items", e))?;

        for line in &input.items {
            // Release the hold, then move the stock out of the source...
            self.inventory
                .shift_reservation_in_tx(
                    &mut tx,
                    user_id,
                    line.product_id,
                    transfer.from_branch_id,
                    -line.received_quantity,
                )
                .await?;
            self.inventory
                .record_movement_in_tx(
                    &mut tx,
                    user_id,
                    received_by,
                    &RecordMovementInput {
                        product_id: line.product_id,
                        branch_id: transfer.from_branch_id,
                        movement_type: MovementType::TransferOut,
                        quantity: line.received_quantity,
                        direction: None,
                        allow_negative: false,
                        unit_cost: None,
                        reference_type: Some(ReferenceType::Transfer),
                        reference_id: Some(transfer.id),
                        notes: None,
                    },
                )
                .await?;

            // ...and into the destination
            self.inventory
                .ensure_level_in_tx(&mut tx, user_id, line.product_id, transfer.to_branch_id)
                .await?;
            self.inventory
                .record_movement_in_tx(
                    &mut tx,
                    user_id,
                    received_by,
                    &RecordMovementInput {
                        product_id: line.product_id,
                        branch_id: transfer.to_branch_id,
                        movement_type: MovementType::TransferIn,
                        quantity: line.received_quantity,
                        direction: None,
                        allow_negative: false,
                        unit_cost: None,
                        reference_type: Some(ReferenceType::Transfer),
                        reference_id: Some(transfer.id),
                        notes: None,
                    },
                )
                .await?;
        }

        let items_json =
            serde_json::to_value(&items).map_err(|e| AppError::Internal(e.to_string()))?;
        let row = if fully_received {
            sqlx::query_as::<_, TransferRow>(&format!(
                r#"
                UPDATE branch_transfers
                SET items = $1, status = $2, received_by = $3, received_at = NOW()
                WHERE id = $4 AND user_id = $5
                RETURNING {TRANSFER_COLUMNS}
                "#
            ))
            .bind(items_json)
            .bind(TransferStatus::Received.as_str())
            .bind(received_by)
            .bind(transfer_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, TransferRow>(&format!(
                r#"
                UPDATE branch_transfers
                SET items = $1
                WHERE id = $2 AND user_id = $3
                RETURNING {TRANSFER_COLUMNS}
                "#
            ))
            .bind(items_json)
            .bind(transfer_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        let transfer = row.into_model()?;
        if fully_received {
            self.notifications.dispatch(
                user_id,
                NotificationKind::TransferReceived,
                format!("Transfer {} received", transfer.transfer_number),
                "All items have arrived at the destination branch".to_string(),
                Some(("transfer", transfer.id)),
            );
        }

        Ok(transfer)
    }

    /// Cancel a requested or approved transfer, releasing any reservation
    pub async fn cancel(
        &self,
        user_id: Uuid,
        transfer_id: Uuid,
        input: ReasonInput,
    ) -> AppResult<BranchTransfer> {
        let mut tx = self.db.begin().await?;
        let transfer = self.lock_transfer(&mut tx, user_id, transfer_id).await?;
        self.require_transition(&transfer, TransferStatus::Cancelled, "cancel")?;

        if transfer.status == TransferStatus::Approved {
            for item in &transfer.items {
                let held = item.approved_quantity.unwrap_or(0);
                if held > 0 {
                    self.inventory
                        .shift_reservation_in_tx(
                            &mut tx,
                            user_id,
                            item.product_id,
                            transfer.from_branch_id,
                            -held,
                        )
                        .await?;
                }
            }
        }

        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            UPDATE branch_transfers
            SET status = $1, cancellation_reason = $2
            WHERE id = $3 AND user_id = $4
            RETURNING {TRANSFER_COLUMNS}
            "#
        ))
        .bind(TransferStatus::Cancelled.as_str())
        .bind(&input.reason)
        .bind(transfer_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_model()
    }

    /// List transfers, optionally filtered by status or endpoint branch
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: TransferFilter,
    ) -> AppResult<Vec<BranchTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM branch_transfers
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR from_branch_id = $3 OR to_branch_id = $3)
            ORDER BY requested_at DESC
            "#
        ))
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.branch_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TransferRow::into_model).collect()
    }

    /// Get a transfer, enforcing tenant ownership
    pub async fn get(&self, user_id: Uuid, transfer_id: Uuid) -> AppResult<BranchTransfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM branch_transfers
            WHERE id = $1
            "#
        ))
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        if row.user_id != user_id {
            return Err(AppError::AccessDenied("Transfer".to_string()));
        }

        row.into_model()
    }

    /// Fetch and lock a transfer inside the caller's transaction so the
    /// status check and the status write cannot race another request.
    async fn lock_transfer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        transfer_id: Uuid,
    ) -> AppResult<BranchTransfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM branch_transfers
            WHERE id = $1
            FOR UPDATE
            "#
        ))
        .bind(transfer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        if row.user_id != user_id {
            return Err(AppError::AccessDenied("Transfer".to_string()));
        }

        row.into_model()
    }

    fn require_transition(
        &self,
        transfer: &BranchTransfer,
        next: TransferStatus,
        action: &str,
    ) -> AppResult<()> {
        if !transfer.status.can_transition_to(next) {
            return Err(AppError::invalid_transition(format!(
                "Cannot {} transfer in status {}",
                action, transfer.status
            )));
        }
        Ok(())
    }

    async fn require_operational_branch(&self, user_id: Uuid, branch_id: Uuid) -> AppResult<()> {
        let row = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT user_id, status FROM branches WHERE id = $1",
        )
        .bind(branch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch".to_string()))?;

        if row.0 != user_id {
            return Err(AppError::AccessDenied("Branch".to_string()));
        }
        let status = BranchStatus::from_str(&row.1)
            .ok_or_else(|| AppError::Internal("unknown branch status".into()))?;
        if !status.is_operational() {
            return Err(AppError::validation(
                "branch_id",
                "Branch is not active",
            ));
        }
        Ok(())
    }
}

/// Advance and return the per-tenant, per-year sequence for a document type
pub(crate) async fn next_document_sequence(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    doc_type: &str,
) -> AppResult<i32> {
    let year = Utc::now().year();
    let sequence = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO document_counters (user_id, doc_type, year, last_sequence)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (user_id, doc_type, year)
        DO UPDATE SET last_sequence = document_counters.last_sequence + 1
        RETURNING last_sequence
        "#,
    )
    .bind(user_id)
    .bind(doc_type)
    .bind(year)
    .fetch_one(&mut **tx)
    .await?;
    Ok(sequence)
}
