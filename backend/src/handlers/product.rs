//! HTTP handlers for product catalog endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiResponse, AppResult};
use crate::middleware::CurrentUser;
use crate::services::product::{CreateProductInput, ProductService};
use crate::AppState;
use shared::models::Product;

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.db);
    let product = service.create(current_user.0.user_id, input).await?;
    Ok(ApiResponse::new(product))
}

/// List all products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let service = ProductService::new(state.db);
    let products = service.list(current_user.0.user_id).await?;
    Ok(ApiResponse::new(products))
}

/// Get a product by id
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let service = ProductService::new(state.db);
    let product = service.get(current_user.0.user_id, product_id).await?;
    Ok(ApiResponse::new(product))
}
