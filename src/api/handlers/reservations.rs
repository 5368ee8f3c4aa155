use crate::api::responses::ApiResponse;
use crate::db::{NewReservation, Reservation};
use crate::events::Event;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn list_reservations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.list_active_reservations() {
        Ok(reservations) => Json(ApiResponse::ok(reservations)),
        Err(e) => Json(ApiResponse::<Vec<Reservation>>::err(format!(
            "Failed to list reservations: {e}"
        ))),
    }
}

/// Record an in-flight provisioning operation started outside of placement.
pub(crate) async fn open_reservation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewReservation>,
) -> impl IntoResponse {
    if req.host_id.is_none() && req.storage_id.is_none() {
        return Json(ApiResponse::<Reservation>::err("Reservation needs a host_id or storage_id"));
    }

    match state.db.open_reservation(&req) {
        Ok(reservation) => {
            info!(id = reservation.id, "Reservation opened");
            state.event_hub.publish(Event::ReservationOpened {
                reservation_id: reservation.id,
                host_id: reservation.host_id,
                storage_id: reservation.storage_id,
            });
            Json(ApiResponse::ok(reservation))
        }
        Err(e) => Json(ApiResponse::<Reservation>::err(format!("Failed to open reservation: {e}"))),
    }
}

/// Release a reservation once its VM shows up in inventory (or is abandoned).
pub(crate) async fn release_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<i64>,
) -> impl IntoResponse {
    match state.db.release_reservation(reservation_id) {
        Ok(Some(reservation)) => {
            info!(id = reservation_id, "Reservation released");
            state.event_hub.publish(Event::ReservationReleased { reservation_id });
            Json(ApiResponse::ok(reservation))
        }
        Ok(None) => Json(ApiResponse::<Reservation>::err("Reservation not found")),
        Err(e) => Json(ApiResponse::<Reservation>::err(format!("{e}"))),
    }
}
