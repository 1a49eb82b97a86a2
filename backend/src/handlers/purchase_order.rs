//! HTTP handlers for purchase order endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PurchaseOrderFilter, PurchaseOrderService, ReasonInput,
    ReceiveOrderInput,
};
use crate::AppState;
use shared::models::PurchaseOrder;

fn service(state: AppState) -> PurchaseOrderService {
    let notifications = state.notifications();
    PurchaseOrderService::new(state.db, notifications)
}

/// Create a draft purchase order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .create(current_user.0.user_id, current_user.0.user_id, input)
        .await?;
    Ok(ApiResponse::new(order))
}

/// List purchase orders
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<PurchaseOrderFilter>,
) -> AppResult<Json<ApiResponse<Vec<PurchaseOrder>>>> {
    let orders = service(state).list(current_user.0.user_id, filter).await?;
    Ok(ApiResponse::new(orders))
}

/// Get a purchase order by id
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state).get(current_user.0.user_id, order_id).await?;
    Ok(ApiResponse::new(order))
}

/// Submit a draft for approval
pub async fn submit_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .submit(current_user.0.user_id, order_id)
        .await?;
    Ok(ApiResponse::new(order))
}

/// Approve a pending order
pub async fn approve_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .approve(current_user.0.user_id, current_user.0.user_id, order_id)
        .await?;
    Ok(ApiResponse::new(order))
}

/// Reject a pending order
pub async fn reject_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .reject(current_user.0.user_id, order_id, input)
        .await?;
    Ok(ApiResponse::new(order))
}

/// Send an approved order to the supplier
pub async fn send_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state).send(current_user.0.user_id, order_id).await?;
    Ok(ApiResponse::new(order))
}

/// Record the supplier's acknowledgement
pub async fn acknowledge_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .acknowledge(current_user.0.user_id, order_id)
        .await?;
    Ok(ApiResponse::new(order))
}

/// Receive goods against the order
pub async fn receive_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReceiveOrderInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .receive(
            current_user.0.user_id,
            current_user.0.user_id,
            order_id,
            input,
        )
        .await?;
    Ok(ApiResponse::new(order))
}

/// Cancel an order
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .cancel(current_user.0.user_id, order_id, input)
        .await?;
    Ok(ApiResponse::new(order))
}

/// Flag an overdue order as delayed
pub async fn mark_order_delayed(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrder>>> {
    let order = service(state)
        .mark_delayed(current_user.0.user_id, order_id)
        .await?;
    Ok(ApiResponse::new(order))
}
