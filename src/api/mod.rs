mod handlers;
pub(crate) mod responses;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete API router.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        // Status
        .route("/api/status", get(handlers::get_status))
        // Inventory
        .route("/api/inventory", get(handlers::get_inventory).put(handlers::replace_inventory))
        // Reservations
        .route(
            "/api/reservations",
            get(handlers::list_reservations).post(handlers::open_reservation),
        )
        .route("/api/reservations/{reservation_id}/release", post(handlers::release_reservation))
        // Placement
        .route("/api/placement", post(handlers::place_vm))
        .route("/api/requests/{request_id}", get(handlers::get_request))
        // Settings
        .route("/api/settings", get(handlers::get_settings).post(handlers::update_settings))
        // SSE events
        .route("/api/events", get(handlers::sse_events))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
