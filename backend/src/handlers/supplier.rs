//! HTTP handlers for supplier endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::supplier::{
    CreateSupplierInput, SupplierPerformance, SupplierService, UpdateSupplierInput,
};
use crate::AppState;
use shared::models::Supplier;

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    let service = SupplierService::new(state.db);
    let supplier = service.create(current_user.0.user_id, input).await?;
    Ok(ApiResponse::new(supplier))
}

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Supplier>>>> {
    let service = SupplierService::new(state.db);
    let suppliers = service.list(current_user.0.user_id).await?;
    Ok(ApiResponse::new(suppliers))
}

/// Get a supplier by id
pub async fn get_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    let service = SupplierService::new(state.db);
    let supplier = service.get(current_user.0.user_id, supplier_id).await?;
    Ok(ApiResponse::new(supplier))
}

/// Update a supplier
pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    let service = SupplierService::new(state.db);
    let supplier = service
        .update(current_user.0.user_id, supplier_id, input)
        .await?;
    Ok(ApiResponse::new(supplier))
}

/// Delivery performance summary for a supplier
pub async fn get_supplier_performance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SupplierPerformance>>> {
    let service = SupplierService::new(state.db);
    let performance = service
        .performance(current_user.0.user_id, supplier_id)
        .await?;
    Ok(ApiResponse::new(performance))
}
