//! Supplier management service
//!
//! CRUD plus the denormalized delivery metrics the purchase-order workflow
//! folds into on every completed order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{fold_on_time_rate, Supplier};
use shared::validation::{validate_email, validate_kenyan_phone, validate_name};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    pub is_active: Option<bool>,
}

/// Delivery performance summary
#[derive(Debug, Serialize)]
pub struct SupplierPerformance {
    pub supplier_id: Uuid,
    pub name: String,
    pub total_orders: i32,
    pub on_time_delivery_rate: Decimal,
    pub open_orders: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    contact_person: Option<String>,
    email: Option<String>,
    phone: String,
    address: Option<String>,
    payment_terms: Option<String>,
    on_time_delivery_rate: Decimal,
    total_orders: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            contact_person: row.contact_person,
            email: row.email,
            phone: row.phone,
            address: row.address,
            payment_terms: row.payment_terms,
            on_time_delivery_rate: row.on_time_delivery_rate,
            total_orders: row.total_orders,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SUPPLIER_COLUMNS: &str = "id, user_id, name, contact_person, email, phone, address, \
                                payment_terms, on_time_delivery_rate, total_orders, is_active, \
                                created_at, updated_at";

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a supplier
    pub async fn create(&self, user_id: Uuid, input: CreateSupplierInput) -> AppResult<Supplier> {
        validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;
        validate_kenyan_phone(&input.phone).map_err(|e| AppError::validation("phone", e))?;
        if let Some(email) = &input.email {
            validate_email(email).map_err(|e| AppError::validation("email", e))?;
        }

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            INSERT INTO suppliers (user_id, name, contact_person, email, phone, address,
                                   payment_terms)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.payment_terms)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// List suppliers for a tenant
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS}
            FROM suppliers
            WHERE user_id = $1
            ORDER BY name
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a supplier, enforcing tenant ownership
    pub async fn get(&self, user_id: Uuid, supplier_id: Uuid) -> AppResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            SELECT {SUPPLIER_COLUMNS}
            FROM suppliers
            WHERE id = $1
            "#
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        if row.user_id != user_id {
            return Err(AppError::AccessDenied("Supplier".to_string()));
        }

        Ok(row.into())
    }

    /// Update a supplier
    pub async fn update(
        &self,
        user_id: Uuid,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get(user_id, supplier_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let phone = input.phone.unwrap_or(existing.phone);
        let email = input.email.or(existing.email);

        validate_name(&name).map_err(|e| AppError::validation("name", e))?;
        validate_kenyan_phone(&phone).map_err(|e| AppError::validation("phone", e))?;
        if let Some(email) = &email {
            validate_email(email).map_err(|e| AppError::validation("email", e))?;
        }

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            UPDATE suppliers
            SET name = $1, contact_person = $2, email = $3, phone = $4, address = $5,
                payment_terms = $6, is_active = $7, updated_at = NOW()
            WHERE id = $8 AND user_id = $9
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(name.trim())
        .bind(input.contact_person.or(existing.contact_person))
        .bind(&email)
        .bind(&phone)
        .bind(input.address.or(existing.address))
        .bind(input.payment_terms.or(existing.payment_terms))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(supplier_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Delivery performance with the current open-order count
    pub async fn performance(
        &self,
        user_id: Uuid,
        supplier_id: Uuid,
    ) -> AppResult<SupplierPerformance> {
        let supplier = self.get(user_id, supplier_id).await?;

        let open_orders = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM purchase_orders
            WHERE user_id = $1 AND supplier_id = $2
              AND status NOT IN ('received', 'cancelled', 'rejected')
            "#,
        )
        .bind(user_id)
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        Ok(SupplierPerformance {
            supplier_id: supplier.id,
            name: supplier.name,
            total_orders: supplier.total_orders,
            on_time_delivery_rate: supplier.on_time_delivery_rate,
            open_orders,
        })
    }

    /// Fold one completed order into the supplier's metrics, inside the
    /// caller's transaction (the PO receive path).
    pub async fn record_completed_order_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        supplier_id: Uuid,
        on_time: bool,
    ) -> AppResult<()> {
        let row = sqlx::query_as::<_, (Decimal, i32)>(
            r#"
            SELECT on_time_delivery_rate, total_orders
            FROM suppliers
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(supplier_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        let new_rate = fold_on_time_rate(row.0, row.1, on_time);

        sqlx::query(
            r#"
            UPDATE suppliers
            SET on_time_delivery_rate = $1, total_orders = total_orders + 1,
                updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            "#,
        )
        .bind(new_rate)
        .bind(supplier_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
