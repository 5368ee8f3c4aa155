use crate::api::responses::{ApiResponse, SettingsUpdateRequest};
use crate::config::AppConfig;
use crate::placement::SortOrder;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.config.read().await.clone()))
}

/// Validate, persist, then apply settings. The next placement uses them.
pub(crate) async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SettingsUpdateRequest>,
) -> impl IntoResponse {
    let mut config = state.config.read().await.clone();

    if let Some(v) = req.storage_max_vms {
        config.storage_max_vms = v;
    }
    if let Some(v) = req.storage_max_pct_used {
        config.storage_max_pct_used = v;
    }
    if let Some(v) = req.host_sort_order {
        config.host_sort_order = SortOrder::parse_lenient(&v);
    }
    if let Some(v) = req.storage_sort_order {
        config.storage_sort_order = SortOrder::parse_lenient(&v);
    }

    if let Err(e) = config.validate() {
        return Json(ApiResponse::<AppConfig>::err(format!("Invalid settings: {e}")));
    }

    if let Err(e) = config.save() {
        return Json(ApiResponse::<AppConfig>::err(format!("Failed to save settings: {e}")));
    }

    info!(
        storage_max_vms = config.storage_max_vms,
        storage_max_pct_used = config.storage_max_pct_used,
        host_sort_order = %config.host_sort_order,
        storage_sort_order = %config.storage_sort_order,
        "Settings updated"
    );
    *state.config.write().await = config.clone();
    Json(ApiResponse::ok(config))
}
