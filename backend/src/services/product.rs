//! Product catalog service
//!
//! The catalog exists so transfers and purchase orders can validate product
//! references and denormalize names into their item lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Product, ProductRef};
use shared::validation::{validate_name, validate_sku};

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: String,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    sku: String,
    unit_price: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            sku: row.sku,
            unit_price: row.unit_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create(&self, user_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;
        validate_sku(&input.sku).map_err(|e| AppError::validation("sku", e))?;

        if let Some(price) = input.unit_price {
            if price < Decimal::ZERO {
                return Err(AppError::validation(
                    "unit_price",
                    "Unit price cannot be negative",
                ));
            }
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE user_id = $1 AND sku = $2",
        )
        .bind(user_id)
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (user_id, name, sku, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, sku, unit_price, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.sku)
        .bind(input.unit_price)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// List all products for a tenant
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, user_id, name, sku, unit_price, created_at, updated_at
            FROM products
            WHERE user_id = $1
            ORDER BY name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a single product
    pub async fn get(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, user_id, name, sku, unit_price, created_at, updated_at
            FROM products
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// Resolve a set of product ids to refs, failing if any are unknown.
    /// Workflows call this before writing item lines.
    pub async fn resolve_refs(&self, user_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<ProductRef>> {
        let refs = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT id, name, sku
            FROM products
            WHERE user_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        if refs.len() != ids.iter().collect::<std::collections::HashSet<_>>().len() {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(refs
            .into_iter()
            .map(|(id, name, sku)| ProductRef { id, name, sku })
            .collect())
    }
}
