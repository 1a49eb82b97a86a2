//! Notification service for in-app and email notifications
//!
//! Dispatch is fire-and-forget: workflow services call [`dispatch`] after
//! their transaction commits, and delivery failures are logged, never
//! surfaced to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::EmailClient;

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    email: Option<EmailClient>,
}

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TransferRequested,
    TransferApproved,
    TransferReceived,
    PurchaseOrderSubmitted,
    PurchaseOrderReceived,
    LowStock,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TransferRequested => "transfer_requested",
            NotificationKind::TransferApproved => "transfer_approved",
            NotificationKind::TransferReceived => "transfer_received",
            NotificationKind::PurchaseOrderSubmitted => "purchase_order_submitted",
            NotificationKind::PurchaseOrderReceived => "purchase_order_received",
            NotificationKind::LowStock => "low_stock",
            NotificationKind::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transfer_requested" => Some(NotificationKind::TransferRequested),
            "transfer_approved" => Some(NotificationKind::TransferApproved),
            "transfer_received" => Some(NotificationKind::TransferReceived),
            "purchase_order_submitted" => Some(NotificationKind::PurchaseOrderSubmitted),
            "purchase_order_received" => Some(NotificationKind::PurchaseOrderReceived),
            "low_stock" => Some(NotificationKind::LowStock),
            "system" => Some(NotificationKind::System),
            _ => None,
        }
    }
}

/// In-app notification
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Per-user notification preferences
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub email_enabled: bool,
    pub transfer_events_enabled: bool,
    pub purchase_order_events_enabled: bool,
    pub low_stock_enabled: bool,
}

/// Input for updating notification preferences
#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesInput {
    pub email_enabled: Option<bool>,
    pub transfer_events_enabled: Option<bool>,
    pub purchase_order_events_enabled: Option<bool>,
    pub low_stock_enabled: Option<bool>,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, email: Option<EmailClient>) -> Self {
        Self { db, email }
    }

    /// Fire-and-forget dispatch: stores the in-app notification and, when
    /// enabled, sends an email. Failures are logged and swallowed so they
    /// can never block workflow completion.
    pub fn dispatch(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: String,
        message: String,
        entity: Option<(&str, Uuid)>,
    ) {
        let service = self.clone();
        let entity = entity.map(|(t, id)| (t.to_string(), id));
        tokio::spawn(async move {
            if let Err(e) = service
                .deliver(user_id, kind, &title, &message, entity)
                .await
            {
                tracing::warn!("Notification delivery failed: {}", e);
            }
        });
    }

    async fn deliver(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        entity: Option<(String, Uuid)>,
    ) -> AppResult<()> {
        let prefs = self.get_preferences(user_id).await?;
        if !kind_enabled(&prefs, kind) {
            return Ok(());
        }

        let (entity_type, entity_id) = match entity {
            Some((t, id)) => (Some(t), Some(id)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, entity_type, entity_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(title)
        .bind(message)
        .bind(&entity_type)
        .bind(entity_id)
        .execute(&self.db)
        .await?;

        if prefs.email_enabled {
            if let Some(email) = &self.email {
                let recipient =
                    sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
                        .bind(user_id)
                        .fetch_optional(&self.db)
                        .await?
                        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
                email.send(&recipient, title, message).await?;
            }
        }

        Ok(())
    }

    /// List notifications, newest first
    pub async fn list(&self, user_id: Uuid, unread_only: bool) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, kind, title, message, entity_type, entity_id,
                   is_read, is_dismissed, created_at, read_at
            FROM notifications
            WHERE user_id = $1 AND NOT is_dismissed AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            LIMIT 100
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    /// Count unread notifications
    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND is_read = false AND NOT is_dismissed
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    /// Mark one notification as read
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }
        Ok(())
    }

    /// Dismiss a notification
    pub async fn dismiss(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_dismissed = true
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }
        Ok(())
    }

    /// Mark every notification as read
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = NOW()
            WHERE user_id = $1 AND is_read = false
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Get preferences, creating the default row on first access
    pub async fn get_preferences(&self, user_id: Uuid) -> AppResult<NotificationPreferences> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            INSERT INTO notification_preferences (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, email_enabled, transfer_events_enabled,
                      purchase_order_events_enabled, low_stock_enabled
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(prefs)
    }

    /// Update preferences
    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        input: UpdatePreferencesInput,
    ) -> AppResult<NotificationPreferences> {
        let existing = self.get_preferences(user_id).await?;

        let prefs = sqlx::query_as::<_, NotificationPreferences>(
            r#"
            UPDATE notification_preferences
            SET email_enabled = $1, transfer_events_enabled = $2,
                purchase_order_events_enabled = $3, low_stock_enabled = $4
            WHERE user_id = $5
            RETURNING user_id, email_enabled, transfer_events_enabled,
                      purchase_order_events_enabled, low_stock_enabled
            "#,
        )
        .bind(input.email_enabled.unwrap_or(existing.email_enabled))
        .bind(
            input
                .transfer_events_enabled
                .unwrap_or(existing.transfer_events_enabled),
        )
        .bind(
            input
                .purchase_order_events_enabled
                .unwrap_or(existing.purchase_order_events_enabled),
        )
        .bind(input.low_stock_enabled.unwrap_or(existing.low_stock_enabled))
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(prefs)
    }
}

fn kind_enabled(prefs: &NotificationPreferences, kind: NotificationKind) -> bool {
    match kind {
        NotificationKind::TransferRequested
        | NotificationKind::TransferApproved
        | NotificationKind::TransferReceived => prefs.transfer_events_enabled,
        NotificationKind::PurchaseOrderSubmitted | NotificationKind::PurchaseOrderReceived => {
            prefs.purchase_order_events_enabled
        }
        NotificationKind::LowStock => prefs.low_stock_enabled,
        NotificationKind::System => true,
    }
}
