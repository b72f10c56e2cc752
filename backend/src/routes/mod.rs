//! Route definitions for the pantry ledger API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/inventory", inventory_routes(state.clone()))
        .nest("/batches", batch_routes(state.clone()))
        .nest("/petty-cash", petty_cash_routes(state))
}

/// Inventory item routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_inventory_items).post(handlers::create_inventory_item),
        )
        .route("/reconcile", get(handlers::reconcile_stock))
        .route(
            "/:id",
            get(handlers::get_inventory_item)
                .put(handlers::update_inventory_item)
                .delete(handlers::delete_inventory_item),
        )
        .route("/:id/batches", post(handlers::create_batch))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Batch routes (protected)
fn batch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            get(handlers::get_batch).delete(handlers::delete_batch),
        )
        .route("/:id/operations", post(handlers::apply_batch_operation))
        .route("/:id/movements", get(handlers::list_batch_movements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Petty cash routes (protected)
fn petty_cash_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/balance", get(handlers::get_current_balance))
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::apply_cash_operation),
        )
        .route("/summary", get(handlers::get_summary))
        .route("/audit", get(handlers::audit_ledger))
        .route("/export", get(handlers::export_csv))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
