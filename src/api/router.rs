use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_rental, create_reservation, get_inventory_item, get_rental_by_id,
    list_rentals,
};

/// Creates the API router with the rental endpoints
///
/// Command endpoints (Write operations):
/// - POST /rentals - Create a new rental (items become RENTED)
/// - POST /reservations - Create a new reservation (items become RESERVED)
///
/// Query endpoints (Read operations):
/// - GET /rentals/:id - Get rental details with line items
/// - GET /rentals - List rentals for a customer, optionally by status
/// - GET /inventory/:id - Get the current status of an inventory item
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Command endpoints (Write operations), list query on the same path
        .route("/rentals", post(create_rental).get(list_rentals))
        .route("/reservations", post(create_reservation))
        // Query endpoints (Read operations)
        .route("/rentals/:id", get(get_rental_by_id))
        .route("/inventory/:id", get(get_inventory_item))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
