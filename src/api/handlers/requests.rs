use crate::api::responses::ApiResponse;
use crate::db::ProvisioningRequestRecord;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

pub(crate) async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
) -> impl IntoResponse {
    match state.db.get_request(request_id) {
        Ok(Some(record)) => Json(ApiResponse::ok(record)),
        Ok(None) => Json(ApiResponse::<ProvisioningRequestRecord>::err("Request not found")),
        Err(e) => Json(ApiResponse::<ProvisioningRequestRecord>::err(format!("{e}"))),
    }
}
