use crate::api::responses::{ApiResponse, StatusResponse};
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::warn;

pub(crate) async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(daemon_status(&state).await))
}

async fn daemon_status(state: &AppState) -> StatusResponse {
    // Read before the status lock; a placement holds the DB while it runs.
    let active_reservations = match state.db.list_active_reservations() {
        Ok(active) => Some(active.len()),
        Err(e) => {
            warn!("Could not count active reservations: {e:#}");
            None
        }
    };
    let status = state.status.read().await;
    StatusResponse {
        state: status.state,
        detail: status.detail.clone(),
        active_reservations,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
