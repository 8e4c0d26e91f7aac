//! Router configuration.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{items, orders};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Rental orders
        .route("/orders", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", put(orders::update_order_status))
        .route("/orders/:id", delete(orders::delete_order))
        // Rental items
        .route("/items", post(items::create_item))
        .route("/items/:id", get(items::get_item))
        .route("/items/:id/orders", get(items::list_item_orders));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
