//! Branch registry service
//!
//! Plain CRUD with guarded deletion: a branch with pending transfers cannot
//! be deactivated, and a branch with any transfer history or inventory can
//! only be archived, never hard-deleted.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Branch, BranchStatus, ContactInfo, DayHours};
use shared::validation::{
    validate_capacity, validate_email, validate_kenyan_phone, validate_name,
    validate_opening_hours,
};

/// Branch registry service
#[derive(Clone)]
pub struct BranchService {
    db: PgPool,
}

/// Input for creating a branch
#[derive(Debug, Deserialize)]
pub struct CreateBranchInput {
    pub name: String,
    pub location: String,
    pub phone: String,
    pub email: Option<String>,
    pub opening_hours: Vec<DayHours>,
    pub manager_id: Option<Uuid>,
    pub capacity: i32,
}

/// Input for updating a branch; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateBranchInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub opening_hours: Option<Vec<DayHours>>,
    pub status: Option<BranchStatus>,
    pub manager_id: Option<Uuid>,
    pub capacity: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct BranchRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    location: String,
    phone: String,
    email: Option<String>,
    opening_hours: serde_json::Value,
    status: String,
    manager_id: Option<Uuid>,
    capacity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BranchRow {
    fn into_model(self) -> AppResult<Branch> {
        let opening_hours: Vec<DayHours> = serde_json::from_value(self.opening_hours)
            .map_err(|e| AppError::Internal(format!("malformed opening hours: {}", e)))?;
        Ok(Branch {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            location: self.location,
            contact: ContactInfo {
                phone: self.phone,
                email: self.email,
            },
            opening_hours,
            status: BranchStatus::from_str(&self.status)
                .ok_or_else(|| AppError::Internal("unknown branch status".into()))?,
            manager_id: self.manager_id,
            capacity: self.capacity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BRANCH_COLUMNS: &str = "id, user_id, name, location, phone, email, opening_hours, \
                              status, manager_id, capacity, created_at, updated_at";

impl BranchService {
    /// Create a new BranchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a branch
    pub async fn create(&self, user_id: Uuid, input: CreateBranchInput) -> AppResult<Branch> {
        validate_name(&input.name).map_err(|e| AppError::validation("name", e))?;
        validate_name(&input.location).map_err(|e| AppError::validation("location", e))?;
        validate_kenyan_phone(&input.phone).map_err(|e| AppError::validation("phone", e))?;
        if let Some(email) = &input.email {
            validate_email(email).map_err(|e| AppError::validation("email", e))?;
        }
        validate_opening_hours(&input.opening_hours)
            .map_err(|e| AppError::validation("opening_hours", e))?;
        validate_capacity(input.capacity).map_err(|e| AppError::validation("capacity", e))?;

        let hours = serde_json::to_value(&input.opening_hours)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let row = sqlx::query_as::<_, BranchRow>(&format!(
            r#"
            INSERT INTO branches (user_id, name, location, phone, email, opening_hours,
                                  status, manager_id, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BRANCH_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.location.trim())
        .bind(&input.phone)
        .bind(&input.email)
        .bind(hours)
        .bind(BranchStatus::Active.as_str())
        .bind(input.manager_id)
        .bind(input.capacity)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// List all branches for a tenant
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Branch>> {
        let rows = sqlx::query_as::<_, BranchRow>(&format!(
            r#"
            SELECT {BRANCH_COLUMNS}
            FROM branches
            WHERE user_id = $1
            ORDER BY name
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(BranchRow::into_model).collect()
    }

    /// Get a branch, enforcing tenant ownership
    pub async fn get(&self, user_id: Uuid, branch_id: Uuid) -> AppResult<Branch> {
        let row = sqlx::query_as::<_, BranchRow>(&format!(
            r#"
            SELECT {BRANCH_COLUMNS}
            FROM branches
            WHERE id = $1
            "#
        ))
        .bind(branch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch".to_string()))?;

        if row.user_id != user_id {
            return Err(AppError::AccessDenied("Branch".to_string()));
        }

        row.into_model()
    }

    /// Update a branch
    pub async fn update(
        &self,
        user_id: Uuid,
        branch_id: Uuid,
        input: UpdateBranchInput,
    ) -> AppResult<Branch> {
        let existing = self.get(user_id, branch_id).await?;

        let name = input.name.unwrap_or(existing.name);
        let location = input.location.unwrap_or(existing.location);
        let phone = input.phone.unwrap_or(existing.contact.phone);
        let email = input.email.or(existing.contact.email);
        let opening_hours = input.opening_hours.unwrap_or(existing.opening_hours);
        let status = input.status.unwrap_or(existing.status);
        let manager_id = input.manager_id.or(existing.manager_id);
        let capacity = input.capacity.unwrap_or(existing.capacity);

        validate_name(&name).map_err(|e| AppError::validation("name", e))?;
        validate_name(&location).map_err(|e| AppError::validation("location", e))?;
        validate_kenyan_phone(&phone).map_err(|e| AppError::validation("phone", e))?;
        if let Some(email) = &email {
            validate_email(email).map_err(|e| AppError::validation("email", e))?;
        }
        validate_opening_hours(&opening_hours)
            .map_err(|e| AppError::validation("opening_hours", e))?;
        validate_capacity(capacity).map_err(|e| AppError::validation("capacity", e))?;

        let hours =
            serde_json::to_value(&opening_hours).map_err(|e| AppError::Internal(e.to_string()))?;

        let row = sqlx::query_as::<_, BranchRow>(&format!(
            r#"
            UPDATE branches
            SET name = $1, location = $2, phone = $3, email = $4, opening_hours = $5,
                status = $6, manager_id = $7, capacity = $8, updated_at = NOW()
            WHERE id = $9 AND user_id = $10
            RETURNING {BRANCH_COLUMNS}
            "#
        ))
        .bind(name.trim())
        .bind(location.trim())
        .bind(&phone)
        .bind(&email)
        .bind(hours)
        .bind(status.as_str())
        .bind(manager_id)
        .bind(capacity)
        .bind(branch_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// Deactivate a branch (soft delete). Refused while transfers are still
    /// open against it.
    pub async fn deactivate(&self, user_id: Uuid, branch_id: Uuid) -> AppResult<Branch> {
        let branch = self.get(user_id, branch_id).await?;

        let open_transfers = self.count_open_transfers(user_id, branch_id).await?;
        if open_transfers > 0 {
            return Err(AppError::conflict(format!(
                "Branch has {} open transfer(s); resolve them before deactivating",
                open_transfers
            )));
        }

        let row = sqlx::query_as::<_, BranchRow>(&format!(
            r#"
            UPDATE branches
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            RETURNING {BRANCH_COLUMNS}
            "#
        ))
        .bind(BranchStatus::Inactive.as_str())
        .bind(branch.id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        row.into_model()
    }

    /// Hard-delete a branch. Only allowed when nothing references it; callers
    /// get a structured hint that archiving is still possible.
    pub async fn delete(&self, user_id: Uuid, branch_id: Uuid) -> AppResult<()> {
        self.get(user_id, branch_id).await?;

        let transfer_history = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM branch_transfers
            WHERE user_id = $1 AND (from_branch_id = $2 OR to_branch_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        let inventory_rows = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_levels WHERE user_id = $1 AND branch_id = $2",
        )
        .bind(user_id)
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        if transfer_history > 0 || inventory_rows > 0 {
            return Err(AppError::Conflict {
                message: "Branch has inventory or transfer history and cannot be deleted"
                    .to_string(),
                details: Some(serde_json::json!({ "canArchive": true })),
            });
        }

        sqlx::query("DELETE FROM branches WHERE id = $1 AND user_id = $2")
            .bind(branch_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn count_open_transfers(&self, user_id: Uuid, branch_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM branch_transfers
            WHERE user_id = $1 AND (from_branch_id = $2 OR to_branch_id = $2)
              AND status IN ('requested', 'approved', 'in_transit')
            "#,
        )
        .bind(user_id)
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }
}
