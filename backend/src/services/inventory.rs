//! Inventory service: the stock-movement ledger and materialized levels
//!
//! Every stock change is one transaction: lock the level row, run the pure
//! arithmetic, append the ledger entry, write the new level. Two concurrent
//! movements against the same (product, branch) therefore serialize on the
//! row lock and can never both read stale stock.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{
    weighted_average_cost, InventoryLevel, MovementStatus, MovementType, ReferenceType,
    StockDirection, StockError, StockMovement, StockSnapshot,
};
use shared::types::Pagination;
use shared::validation::validate_positive_quantity;

/// Retry cap for transient transaction conflicts
const MAX_CONFLICT_RETRIES: u32 = 3;

/// Inventory service for the stock ledger and per-branch levels
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for recording a stock movement
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMovementInput {
    pub product_id: Uuid,
    pub branch_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i64,
    /// Required for adjustments, ignored for types with a fixed direction
    pub direction: Option<StockDirection>,
    /// Adjustment-only override letting stock go negative
    #[serde(default)]
    pub allow_negative: bool,
    /// Folded into the weighted average cost on inbound purchase-like types
    pub unit_cost: Option<Decimal>,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Input for updating level thresholds
#[derive(Debug, Deserialize)]
pub struct UpdateThresholdsInput {
    pub min_stock_level: Option<i64>,
    pub reorder_point: Option<i64>,
}

/// Filter for listing movements
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub branch_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl MovementFilter {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(50),
        }
    }
}

/// A level at or below its reorder point
#[derive(Debug, Clone, Serialize)]
pub struct LowStockEntry {
    #[serde(flatten)]
    pub level: InventoryLevel,
    pub product_name: String,
    pub branch_name: String,
    /// At or below the hard minimum, not just the reorder point
    pub critical: bool,
}

/// Database row for a ledger entry
#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    branch_id: Uuid,
    movement_type: String,
    direction: String,
    quantity: i64,
    previous_stock: i64,
    new_stock: i64,
    status: String,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_model(self) -> AppResult<StockMovement> {
        Ok(StockMovement {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            branch_id: self.branch_id,
            movement_type: MovementType::from_str(&self.movement_type)
                .ok_or_else(|| AppError::Internal("unknown movement type in ledger".into()))?,
            direction: StockDirection::from_str(&self.direction)
                .ok_or_else(|| AppError::Internal("unknown direction in ledger".into()))?,
            quantity: self.quantity,
            previous_stock: self.previous_stock,
            new_stock: self.new_stock,
            status: MovementStatus::from_str(&self.status)
                .ok_or_else(|| AppError::Internal("unknown movement status in ledger".into()))?,
            reference_type: self
                .reference_type
                .as_deref()
                .and_then(ReferenceType::from_str),
            reference_id: self.reference_id,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

/// Database row for an inventory level
#[derive(Debug, sqlx::FromRow)]
struct LevelRow {
    product_id: Uuid,
    branch_id: Uuid,
    current_stock: i64,
    reserved_stock: i64,
    min_stock_level: i64,
    reorder_point: i64,
    average_cost_price: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<LevelRow> for InventoryLevel {
    fn from(row: LevelRow) -> Self {
        InventoryLevel {
            product_id: row.product_id,
            branch_id: row.branch_id,
            current_stock: row.current_stock,
            reserved_stock: row.reserved_stock,
            available_stock: row.current_stock - row.reserved_stock,
            min_stock_level: row.min_stock_level,
            reorder_point: row.reorder_point,
            average_cost_price: row.average_cost_price,
            updated_at: row.updated_at,
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NonPositiveQuantity => {
                AppError::validation("quantity", "Quantity must be positive")
            }
            StockError::Insufficient {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            StockError::ReleaseExceedsReserved { .. } => AppError::Internal(err.to_string()),
        }
    }
}

/// Postgres serialization failure or deadlock, worth retrying
fn is_transient_conflict(err: &AppError) -> bool {
    if let AppError::DatabaseError(sqlx::Error::Database(db)) = err {
        matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
    } else {
        false
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a stock movement as its own transaction.
    ///
    /// Transient serialization conflicts are retried with exponential backoff
    /// before surfacing a conflict to the caller.
    pub async fn record_movement(
        &self,
        user_id: Uuid,
        created_by: Uuid,
        input: RecordMovementInput,
    ) -> AppResult<StockMovement> {
        let mut attempt = 0;
        loop {
            let mut tx = self.db.begin().await?;
            let result = self
                .record_movement_in_tx(&mut tx, user_id, created_by, &input)
                .await;

            match result {
                Ok(movement) => match tx.commit().await {
                    Ok(()) => return Ok(movement),
                    Err(e) => {
                        let err = AppError::from(e);
                        if is_transient_conflict(&err) && attempt < MAX_CONFLICT_RETRIES {
                            attempt += 1;
                            tokio::time::sleep(backoff(attempt)).await;
                            continue;
                        }
                        return Err(conflict_or(err));
                    }
                },
                Err(err) => {
                    // rollback happens on drop
                    if is_transient_conflict(&err) && attempt < MAX_CONFLICT_RETRIES {
                        attempt += 1;
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(conflict_or(err));
                }
            }
        }
    }

    /// Record a stock movement inside a caller-held transaction.
    ///
    /// Used by the transfer and purchase-order workflows so the workflow
    /// status change and its ledger entries commit or roll back together.
    pub async fn record_movement_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        created_by: Uuid,
        input: &RecordMovementInput,
    ) -> AppResult<StockMovement> {
        validate_positive_quantity(input.quantity)
            .map_err(|e| AppError::validation("quantity", e))?;

        let direction = match input.movement_type.direction() {
            Some(fixed) => fixed,
            None => input.direction.ok_or_else(|| {
                AppError::validation("direction", "Adjustments must specify a direction")
            })?,
        };
        // The negative-stock override only exists for adjustments
        let allow_negative =
            input.allow_negative && input.movement_type == MovementType::Adjustment;

        // Lock the level row for the whole read-modify-write
        let level = sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT product_id, branch_id, current_stock, reserved_stock,
                   min_stock_level, reorder_point, average_cost_price, updated_at
            FROM inventory_levels
            WHERE user_id = $1 AND product_id = $2 AND branch_id = $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(input.product_id)
        .bind(input.branch_id)
        .fetch_optional(&mut **tx)
        .await?;

        let level = match level {
            Some(row) => InventoryLevel::from(row),
            None if input.movement_type == MovementType::Initial => {
                self.create_level_in_tx(tx, user_id, input.product_id, input.branch_id)
                    .await?
            }
            None => return Err(AppError::NotFound("Inventory level".to_string())),
        };

        let before = level.snapshot();
        let after = before.apply(direction, input.quantity, allow_negative)?;

        let movement = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO stock_movements (
                user_id, product_id, branch_id, movement_type, direction, quantity,
                previous_stock, new_stock, status, reference_type, reference_id,
                notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, user_id, product_id, branch_id, movement_type, direction,
                      quantity, previous_stock, new_stock, status, reference_type,
                      reference_id, notes, created_by, created_at
            "#,
        )
        .bind(user_id)
        .bind(input.product_id)
        .bind(input.branch_id)
        .bind(input.movement_type.as_str())
        .bind(direction.as_str())
        .bind(input.quantity)
        .bind(before.current)
        .bind(after.current)
        .bind(MovementStatus::Approved.as_str())
        .bind(input.reference_type.map(|r| r.as_str()))
        .bind(input.reference_id)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;

        // Purchases fold their unit cost into the running average
        let average_cost_price = match (direction, input.unit_cost) {
            (StockDirection::In, Some(unit_cost)) => weighted_average_cost(
                before.current,
                level.average_cost_price,
                input.quantity,
                unit_cost,
            ),
            _ => level.average_cost_price,
        };

        sqlx::query(
            r#"
            UPDATE inventory_levels
            SET current_stock = $1, available_stock = $2, average_cost_price = $3,
                updated_at = NOW()
            WHERE user_id = $4 AND product_id = $5 AND branch_id = $6
            "#,
        )
        .bind(after.current)
        .bind(after.available())
        .bind(average_cost_price)
        .bind(user_id)
        .bind(input.product_id)
        .bind(input.branch_id)
        .execute(&mut **tx)
        .await?;

        movement.into_model()
    }

    /// Adjust the reservation on a level row, already locked by the caller's
    /// transaction. Positive `delta` reserves, negative releases.
    pub async fn shift_reservation_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        product_id: Uuid,
        branch_id: Uuid,
        delta: i64,
    ) -> AppResult<()> {
        let level = sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT product_id, branch_id, current_stock, reserved_stock,
                   min_stock_level, reorder_point, average_cost_price, updated_at
            FROM inventory_levels
            WHERE user_id = $1 AND product_id = $2 AND branch_id = $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory level".to_string()))?;

        let before = InventoryLevel::from(level).snapshot();
        let after = if delta >= 0 {
            before.reserve(delta)?
        } else {
            before.release(-delta)?
        };

        sqlx::query(
            r#"
            UPDATE inventory_levels
            SET reserved_stock = $1, available_stock = $2, updated_at = NOW()
            WHERE user_id = $3 AND product_id = $4 AND branch_id = $5
            "#,
        )
        .bind(after.reserved)
        .bind(after.available())
        .bind(user_id)
        .bind(product_id)
        .bind(branch_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Make sure a zero level row exists before an inbound workflow movement
    /// (transfer receipt into a branch that never stocked the product).
    pub async fn ensure_level_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_levels (user_id, product_id, branch_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id, branch_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(branch_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn create_level_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        product_id: Uuid,
        branch_id: Uuid,
    ) -> AppResult<InventoryLevel> {
        let row = sqlx::query_as::<_, LevelRow>(
            r#"
            INSERT INTO inventory_levels (user_id, product_id, branch_id)
            VALUES ($1, $2, $3)
            RETURNING product_id, branch_id, current_stock, reserved_stock,
                      min_stock_level, reorder_point, average_cost_price, updated_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(branch_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.into())
    }

    /// Get the level for a (product, branch) pair
    pub async fn get_level(
        &self,
        user_id: Uuid,
        branch_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<InventoryLevel> {
        let row = sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT product_id, branch_id, current_stock, reserved_stock,
                   min_stock_level, reorder_point, average_cost_price, updated_at
            FROM inventory_levels
            WHERE user_id = $1 AND branch_id = $2 AND product_id = $3
            "#,
        )
        .bind(user_id)
        .bind(branch_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory level".to_string()))?;

        Ok(row.into())
    }

    /// List levels, optionally restricted to one branch
    pub async fn list_levels(
        &self,
        user_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> AppResult<Vec<InventoryLevel>> {
        let rows = sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT product_id, branch_id, current_stock, reserved_stock,
                   min_stock_level, reorder_point, average_cost_price, updated_at
            FROM inventory_levels
            WHERE user_id = $1 AND ($2::uuid IS NULL OR branch_id = $2)
            ORDER BY branch_id, product_id
            "#,
        )
        .bind(user_id)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Update min stock / reorder thresholds for a level
    pub async fn update_thresholds(
        &self,
        user_id: Uuid,
        branch_id: Uuid,
        product_id: Uuid,
        input: UpdateThresholdsInput,
    ) -> AppResult<InventoryLevel> {
        if let Some(v) = input.min_stock_level {
            if v < 0 {
                return Err(AppError::validation(
                    "min_stock_level",
                    "Threshold cannot be negative",
                ));
            }
        }
        if let Some(v) = input.reorder_point {
            if v < 0 {
                return Err(AppError::validation(
                    "reorder_point",
                    "Threshold cannot be negative",
                ));
            }
        }

        let row = sqlx::query_as::<_, LevelRow>(
            r#"
            UPDATE inventory_levels
            SET min_stock_level = COALESCE($1, min_stock_level),
                reorder_point = COALESCE($2, reorder_point),
                updated_at = NOW()
            WHERE user_id = $3 AND branch_id = $4 AND product_id = $5
            RETURNING product_id, branch_id, current_stock, reserved_stock,
                      min_stock_level, reorder_point, average_cost_price, updated_at
            "#,
        )
        .bind(input.min_stock_level)
        .bind(input.reorder_point)
        .bind(user_id)
        .bind(branch_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory level".to_string()))?;

        Ok(row.into())
    }

    /// List ledger entries with optional filters, newest first
    pub async fn list_movements(
        &self,
        user_id: Uuid,
        filter: MovementFilter,
    ) -> AppResult<Vec<StockMovement>> {
        let pagination = filter.pagination();
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, user_id, product_id, branch_id, movement_type, direction,
                   quantity, previous_stock, new_stock, status, reference_type,
                   reference_id, notes, created_by, created_at
            FROM stock_movements
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR branch_id = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
              AND ($4::varchar IS NULL OR movement_type = $4)
              AND ($5::date IS NULL OR created_at::date >= $5)
              AND ($6::date IS NULL OR created_at::date <= $6)
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(user_id)
        .bind(filter.branch_id)
        .bind(filter.product_id)
        .bind(filter.movement_type.map(|t| t.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_model).collect()
    }

    /// Levels at or below their reorder point, joined with display names
    pub async fn low_stock_report(&self, user_id: Uuid) -> AppResult<Vec<LowStockEntry>> {
        #[derive(sqlx::FromRow)]
        struct LowStockRow {
            product_id: Uuid,
            branch_id: Uuid,
            current_stock: i64,
            reserved_stock: i64,
            min_stock_level: i64,
            reorder_point: i64,
            average_cost_price: Decimal,
            updated_at: DateTime<Utc>,
            product_name: String,
            branch_name: String,
        }

        let rows = sqlx::query_as::<_, LowStockRow>(
            r#"
            SELECT il.product_id, il.branch_id, il.current_stock, il.reserved_stock,
                   il.min_stock_level, il.reorder_point, il.average_cost_price,
                   il.updated_at, p.name AS product_name, b.name AS branch_name
            FROM inventory_levels il
            JOIN products p ON p.id = il.product_id
            JOIN branches b ON b.id = il.branch_id
            WHERE il.user_id = $1
              AND il.current_stock - il.reserved_stock <= il.reorder_point
            ORDER BY il.current_stock - il.reserved_stock
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let level = InventoryLevel {
                    product_id: row.product_id,
                    branch_id: row.branch_id,
                    current_stock: row.current_stock,
                    reserved_stock: row.reserved_stock,
                    available_stock: row.current_stock - row.reserved_stock,
                    min_stock_level: row.min_stock_level,
                    reorder_point: row.reorder_point,
                    average_cost_price: row.average_cost_price,
                    updated_at: row.updated_at,
                };
                let critical = level.is_critical();
                LowStockEntry {
                    level,
                    product_name: row.product_name,
                    branch_name: row.branch_name,
                    critical,
                }
            })
            .collect())
    }

    /// Export the ledger as CSV, newest first, paging through every match
    pub async fn export_movements_csv(
        &self,
        user_id: Uuid,
        filter: MovementFilter,
    ) -> AppResult<String> {
        const EXPORT_PAGE_SIZE: u32 = 200;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "id",
                "created_at",
                "product_id",
                "branch_id",
                "movement_type",
                "direction",
                "quantity",
                "previous_stock",
                "new_stock",
                "status",
                "reference_type",
                "reference_id",
            ])
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut page = 1u32;
        loop {
            let batch = self
                .list_movements(
                    user_id,
                    MovementFilter {
                        page: Some(page),
                        per_page: Some(EXPORT_PAGE_SIZE),
                        ..filter.clone()
                    },
                )
                .await?;
            let batch_len = batch.len();

            for m in batch {
                writer
                    .write_record([
                        m.id.to_string(),
                        m.created_at.to_rfc3339(),
                        m.product_id.to_string(),
                        m.branch_id.to_string(),
                        m.movement_type.as_str().to_string(),
                        m.direction.as_str().to_string(),
                        m.quantity.to_string(),
                        m.previous_stock.to_string(),
                        m.new_stock.to_string(),
                        m.status.as_str().to_string(),
                        m.reference_type
                            .map(|r| r.as_str().to_string())
                            .unwrap_or_default(),
                        m.reference_id.map(|r| r.to_string()).unwrap_or_default(),
                    ])
                    .map_err(|e| AppError::Internal(e.to_string()))?;
            }

            if batch_len < EXPORT_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(25u64 << attempt)
}

fn conflict_or(err: AppError) -> AppError {
    if is_transient_conflict(&err) {
        AppError::conflict("Concurrent update, retries exhausted; please try again")
    } else {
        err
    }
}
