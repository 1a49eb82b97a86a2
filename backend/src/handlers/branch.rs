//! HTTP handlers for branch management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::branch::{BranchService, CreateBranchInput, UpdateBranchInput};
use crate::AppState;
use shared::models::Branch;

/// Create a branch
pub async fn create_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBranchInput>,
) -> AppResult<Json<ApiResponse<Branch>>> {
    let service = BranchService::new(state.db);
    let branch = service.create(current_user.0.user_id, input).await?;
    Ok(ApiResponse::new(branch))
}

/// List all branches
pub async fn list_branches(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Branch>>>> {
    let service = BranchService::new(state.db);
    let branches = service.list(current_user.0.user_id).await?;
    Ok(ApiResponse::new(branches))
}

/// Get a branch by id
pub async fn get_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Branch>>> {
    let service = BranchService::new(state.db);
    let branch = service.get(current_user.0.user_id, branch_id).await?;
    Ok(ApiResponse::new(branch))
}

/// Update a branch
pub async fn update_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    Json(input): Json<UpdateBranchInput>,
) -> AppResult<Json<ApiResponse<Branch>>> {
    let service = BranchService::new(state.db);
    let branch = service
        .update(current_user.0.user_id, branch_id, input)
        .await?;
    Ok(ApiResponse::new(branch))
}

/// Deactivate a branch (soft delete)
pub async fn deactivate_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Branch>>> {
    let service = BranchService::new(state.db);
    let branch = service
        .deactivate(current_user.0.user_id, branch_id)
        .await?;
    Ok(ApiResponse::new(branch))
}

/// Hard-delete a branch; refused with a structured hint when history exists
pub async fn delete_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let service = BranchService::new(state.db);
    service.delete(current_user.0.user_id, branch_id).await?;
    Ok(ApiResponse::new(()))
}
