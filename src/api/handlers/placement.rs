use crate::api::responses::{
    ApiResponse, PlacementApiRequest, PlacementFailure, PlacementResponse,
};
use crate::db::{Database, NewReservation, RequestSink, Reservation};
use crate::events::Event;
use crate::placement::{
    Destination, PlacementEngine, PlacementError, PlacementOutcome, PlacementRequest,
    PlacementResult, PlacementSettings,
};
use crate::{AppState, DaemonStatus};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Everything one placement attempt produced.
struct PlacementRun {
    request_id: i64,
    outcome: PlacementResult<PlacementOutcome>,
    reservation: Option<Reservation>,
}

pub(crate) async fn place_vm(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PlacementApiRequest>,
) -> impl IntoResponse {
    let _guard = state.placement_lock.lock().await;
    let settings = state.config.read().await.placement_settings();

    let template = body.request.template.as_ref().map_or("<none>", |t| t.name.as_str());
    *state.status.write().await = DaemonStatus::placing(format!("template {template}"));

    let result = run_placement(&state.db, settings, &body.request, body.reserve);

    *state.status.write().await = DaemonStatus::idle();

    let run = match result {
        Ok(run) => run,
        Err(e) => {
            error!("Placement bookkeeping failed: {e:#}");
            return Json(ApiResponse::<Value>::err(format!("Placement failed: {e}")));
        }
    };

    match run.outcome {
        Ok(outcome) => {
            state.event_hub.publish(Event::PlacementSelected {
                request_id: run.request_id,
                selection: outcome.selection.clone(),
                reservation_id: run.reservation.as_ref().map(|r| r.id),
            });
            if let Some(r) = &run.reservation {
                state.event_hub.publish(Event::ReservationOpened {
                    reservation_id: r.id,
                    host_id: r.host_id,
                    storage_id: r.storage_id,
                });
            }
            json_value(ApiResponse::ok(PlacementResponse {
                request_id: run.request_id,
                outcome,
                reservation: run.reservation,
            }))
        }
        Err(e) => {
            state.event_hub.publish(Event::PlacementFailed {
                request_id: run.request_id,
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
            json_value(ApiResponse::failed(
                PlacementFailure { request_id: run.request_id },
                e.kind(),
                e.to_string(),
            ))
        }
    }
}

/// Store the request, decide against one ledger snapshot, then record the
/// result. SQLite failures are the outer `Err`; placement errors, including a
/// reservation that could not be opened, stay in `outcome`.
fn run_placement(
    db: &Database,
    settings: PlacementSettings,
    request: &PlacementRequest,
    reserve: bool,
) -> anyhow::Result<PlacementRun> {
    let request_id = db.create_request(request)?;
    let ledger = db.ledger_snapshot()?;
    let engine = PlacementEngine::new(settings);

    let mut sink = RequestSink { db, request_id };
    let outcome = engine.place(request, db, &ledger, &mut sink);

    let (outcome, reservation) = match outcome {
        Ok(o) if reserve => match reserve_selection(db, request_id, request, &o) {
            Ok(reservation) => (Ok(o), Some(reservation)),
            Err(e) => {
                // The sink already marked the request placed.
                let err = PlacementError::WriteBack(e.context("opening reservation"));
                db.fail_request(request_id, err.kind(), &err.to_string())?;
                (Err(err), None)
            }
        },
        Ok(o) => (Ok(o), None),
        Err(e) => {
            db.fail_request(request_id, e.kind(), &e.to_string())?;
            (Err(e), None)
        }
    };

    if let Ok(o) = &outcome {
        info!(
            request_id,
            storage = %o.selection.storage.name,
            disqualified = o.disqualified.len(),
            reserved = reservation.is_some(),
            "Provisioning request placed"
        );
    }

    Ok(PlacementRun { request_id, outcome, reservation })
}

fn reserve_selection(
    db: &Database,
    request_id: i64,
    request: &PlacementRequest,
    outcome: &PlacementOutcome,
) -> anyhow::Result<Reservation> {
    let host_id = match &outcome.selection.destination {
        Destination::Host(host) => Some(host.id),
        // DRS picks the host later; only the storage is known.
        Destination::Cluster(_) => None,
    };
    db.open_reservation(&NewReservation {
        request_id: Some(request_id),
        host_id,
        storage_id: Some(outcome.selection.storage.id),
        memory: request.requested_memory,
        cpu: request.requested_cpu,
        storage_bytes: request.requested_storage_bytes,
        vm_ids: Vec::new(),
    })
}

/// Erase the payload type so both arms of the handler return the same type.
fn json_value<T: serde::Serialize>(response: ApiResponse<T>) -> Json<ApiResponse<Value>> {
    let data = match response.data.map(serde_json::to_value).transpose() {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to encode placement response: {e}");
            return Json(ApiResponse::err(format!("Failed to encode placement response: {e}")));
        }
    };
    Json(ApiResponse {
        success: response.success,
        data,
        error: response.error,
        error_kind: response.error_kind,
    })
}
