//! HTTP handlers for notification endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::notification::{
    Notification, NotificationPreferences, UpdatePreferencesInput,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// List notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let service = state.notifications();
    let notifications = service
        .list(current_user.0.user_id, query.unread_only)
        .await?;
    Ok(ApiResponse::new(notifications))
}

/// Count unread notifications
pub async fn unread_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let service = state.notifications();
    let unread = service.unread_count(current_user.0.user_id).await?;
    Ok(ApiResponse::new(UnreadCount { unread }))
}

/// Mark a notification as read
pub async fn mark_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let service = state.notifications();
    service
        .mark_read(current_user.0.user_id, notification_id)
        .await?;
    Ok(ApiResponse::new(()))
}

/// Dismiss a notification
pub async fn dismiss(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let service = state.notifications();
    service
        .dismiss(current_user.0.user_id, notification_id)
        .await?;
    Ok(ApiResponse::new(()))
}

/// Mark every notification as read
pub async fn mark_all_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<u64>>> {
    let service = state.notifications();
    let updated = service.mark_all_read(current_user.0.user_id).await?;
    Ok(ApiResponse::new(updated))
}

/// Get notification preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<NotificationPreferences>>> {
    let service = state.notifications();
    let prefs = service.get_preferences(current_user.0.user_id).await?;
    Ok(ApiResponse::new(prefs))
}

/// Update notification preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpdatePreferencesInput>,
) -> AppResult<Json<ApiResponse<NotificationPreferences>>> {
    let service = state.notifications();
    let prefs = service
        .update_preferences(current_user.0.user_id, input)
        .await?;
    Ok(ApiResponse::new(prefs))
}
