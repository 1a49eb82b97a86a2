//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    InventoryService, LowStockEntry, MovementFilter, RecordMovementInput, UpdateThresholdsInput,
};
use crate::services::notification::NotificationKind;
use crate::AppState;
use shared::models::{InventoryLevel, StockMovement};

/// Record a stock movement
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<Json<ApiResponse<StockMovement>>> {
    let user_id = current_user.0.user_id;
    let service = InventoryService::new(state.db.clone());
    let movement = service.record_movement(user_id, user_id, input).await?;

    // Alert when the movement pushed the level to its reorder point
    if let Ok(level) = service
        .get_level(user_id, movement.branch_id, movement.product_id)
        .await
    {
        if level.needs_reorder() {
            state.notifications().dispatch(
                user_id,
                NotificationKind::LowStock,
                "Stock below reorder point".to_string(),
                format!(
                    "Available stock is {} against a reorder point of {}",
                    level.available_stock, level.reorder_point
                ),
                None,
            );
        }
    }

    Ok(ApiResponse::new(movement))
}

/// List stock movements with optional filters
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<ApiResponse<Vec<StockMovement>>>> {
    let service = InventoryService::new(state.db);
    let movements = service.list_movements(current_user.0.user_id, filter).await?;
    Ok(ApiResponse::new(movements))
}

/// Export stock movements as CSV
pub async fn export_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<MovementFilter>,
) -> AppResult<impl IntoResponse> {
    let service = InventoryService::new(state.db);
    let csv = service
        .export_movements_csv(current_user.0.user_id, filter)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"stock-movements.csv\"",
            ),
        ],
        csv,
    ))
}

/// List inventory levels across branches
pub async fn list_levels(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<InventoryLevel>>>> {
    let service = InventoryService::new(state.db);
    let levels = service.list_levels(current_user.0.user_id, None).await?;
    Ok(ApiResponse::new(levels))
}

/// List inventory levels for one branch
pub async fn list_branch_levels(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<InventoryLevel>>>> {
    let service = InventoryService::new(state.db);
    let levels = service
        .list_levels(current_user.0.user_id, Some(branch_id))
        .await?;
    Ok(ApiResponse::new(levels))
}

/// Get the level for one (branch, product) pair
pub async fn get_level(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((branch_id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<InventoryLevel>>> {
    let service = InventoryService::new(state.db);
    let level = service
        .get_level(current_user.0.user_id, branch_id, product_id)
        .await?;
    Ok(ApiResponse::new(level))
}

/// Update min stock / reorder thresholds for a level
pub async fn update_thresholds(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((branch_id, product_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateThresholdsInput>,
) -> AppResult<Json<ApiResponse<InventoryLevel>>> {
    let service = InventoryService::new(state.db);
    let level = service
        .update_thresholds(current_user.0.user_id, branch_id, product_id, input)
        .await?;
    Ok(ApiResponse::new(level))
}

/// Levels at or below their reorder point
pub async fn low_stock_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<LowStockEntry>>>> {
    let service = InventoryService::new(state.db);
    let entries = service.low_stock_report(current_user.0.user_id).await?;
    Ok(ApiResponse::new(entries))
}
