//! Route definitions for the FahamPesa API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/branches", branch_routes())
        .nest("/products", product_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/inventory", inventory_routes())
        .nest("/transfers", transfer_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/notifications", notification_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Branch registry routes (protected)
fn branch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_branches).post(handlers::create_branch))
        .route(
            "/:branch_id",
            get(handlers::get_branch)
                .put(handlers::update_branch)
                .delete(handlers::delete_branch),
        )
        .route("/:branch_id/deactivate", post(handlers::deactivate_branch))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/:product_id", get(handlers::get_product))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier).put(handlers::update_supplier),
        )
        .route(
            "/:supplier_id/performance",
            get(handlers::get_supplier_performance),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory ledger and level routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route("/movements/export", get(handlers::export_movements))
        .route("/levels", get(handlers::list_levels))
        .route("/levels/:branch_id", get(handlers::list_branch_levels))
        .route(
            "/levels/:branch_id/:product_id",
            get(handlers::get_level).put(handlers::update_thresholds),
        )
        .route("/low-stock", get(handlers::low_stock_report))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Branch transfer workflow routes (protected)
fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_transfers).post(handlers::create_transfer),
        )
        .route("/:transfer_id", get(handlers::get_transfer))
        .route("/:transfer_id/approve", post(handlers::approve_transfer))
        .route("/:transfer_id/reject", post(handlers::reject_transfer))
        .route("/:transfer_id/ship", post(handlers::ship_transfer))
        .route("/:transfer_id/receive", post(handlers::receive_transfer))
        .route("/:transfer_id/cancel", post(handlers::cancel_transfer))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Purchase order workflow routes (protected)
fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/submit", post(handlers::submit_order))
        .route("/:order_id/approve", post(handlers::approve_order))
        .route("/:order_id/reject", post(handlers::reject_order))
        .route("/:order_id/send", post(handlers::send_order))
        .route("/:order_id/acknowledge", post(handlers::acknowledge_order))
        .route("/:order_id/receive", post(handlers::receive_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
        .route("/:order_id/mark-delayed", post(handlers::mark_order_delayed))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Notification routes (protected)
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/unread-count", get(handlers::unread_count))
        .route("/mark-all-read", post(handlers::mark_all_read))
        .route("/:notification_id/read", post(handlers::mark_read))
        .route("/:notification_id/dismiss", post(handlers::dismiss))
        .route(
            "/preferences",
            get(handlers::get_preferences).put(handlers::update_preferences),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
