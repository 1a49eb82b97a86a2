//! HTTP handlers for branch transfer endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::transfer::{
    ApproveTransferInput, CreateTransferInput, ReasonInput, ReceiveTransferInput,
    ShipTransferInput, TransferFilter, TransferService,
};
use crate::AppState;
use shared::models::BranchTransfer;

fn service(state: AppState) -> TransferService {
    let notifications = state.notifications();
    TransferService::new(state.db, notifications)
}

/// Create a transfer request
pub async fn create_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .create(current_user.0.user_id, current_user.0.user_id, input)
        .await?;
    Ok(ApiResponse::new(transfer))
}

/// List transfers
pub async fn list_transfers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<TransferFilter>,
) -> AppResult<Json<ApiResponse<Vec<BranchTransfer>>>> {
    let transfers = service(state).list(current_user.0.user_id, filter).await?;
    Ok(ApiResponse::new(transfers))
}

/// Get a transfer by id
pub async fn get_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .get(current_user.0.user_id, transfer_id)
        .await?;
    Ok(ApiResponse::new(transfer))
}

/// Approve a transfer, reserving stock at the source branch
pub async fn approve_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ApproveTransferInput>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .approve(
            current_user.0.user_id,
            current_user.0.user_id,
            transfer_id,
            input,
        )
        .await?;
    Ok(ApiResponse::new(transfer))
}

/// Reject a requested transfer
pub async fn reject_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .reject(current_user.0.user_id, transfer_id, input)
        .await?;
    Ok(ApiResponse::new(transfer))
}

/// Mark an approved transfer as shipped
pub async fn ship_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ShipTransferInput>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .ship(current_user.0.user_id, transfer_id, input)
        .await?;
    Ok(ApiResponse::new(transfer))
}

/// Receive transfer items at the destination branch
pub async fn receive_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ReceiveTransferInput>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .receive(
            current_user.0.user_id,
            current_user.0.user_id,
            transfer_id,
            input,
        )
        .await?;
    Ok(ApiResponse::new(transfer))
}

/// Cancel a requested or approved transfer
pub async fn cancel_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<ApiResponse<BranchTransfer>>> {
    let transfer = service(state)
        .cancel(current_user.0.user_id, transfer_id, input)
        .await?;
    Ok(ApiResponse::new(transfer))
}
