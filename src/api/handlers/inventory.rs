use crate::api::responses::ApiResponse;
use crate::db::{InventoryCounts, InventorySnapshot};
use crate::events::Event;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn get_inventory(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.get_inventory() {
        Ok(inventory) => Json(ApiResponse::ok(inventory)),
        Err(e) => Json(ApiResponse::<InventorySnapshot>::err(format!("Failed to read inventory: {e}"))),
    }
}

/// Replace the stored inventory with a fresh provider snapshot.
pub(crate) async fn replace_inventory(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<InventorySnapshot>,
) -> impl IntoResponse {
    // Wait out any running placement so it never reads a half-swapped inventory.
    let _guard = state.placement_lock.lock().await;

    match state.db.replace_inventory(&snapshot) {
        Ok(counts) => {
            info!(
                clusters = counts.clusters,
                hosts = counts.hosts,
                storages = counts.storages,
                "Inventory replaced"
            );
            state.event_hub.publish(Event::InventoryReplaced {
                clusters: counts.clusters,
                hosts: counts.hosts,
                storages: counts.storages,
            });
            Json(ApiResponse::ok(counts))
        }
        Err(e) => Json(ApiResponse::<InventoryCounts>::err(format!("Failed to replace inventory: {e:#}"))),
    }
}
