use crate::db::Reservation;
use crate::placement::{PlacementOutcome, PlacementRequest};
use serde::{Deserialize, Serialize};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error label, set for placement failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) const fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, error_kind: None }
    }

    pub(crate) fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()), error_kind: None }
    }

    /// A failure that still carries data, e.g. the id of the failed request.
    pub(crate) fn failed(data: T, kind: &'static str, msg: impl Into<String>) -> Self {
        Self { success: false, data: Some(data), error: Some(msg.into()), error_kind: Some(kind) }
    }
}

/// Request body for POST /api/placement.
#[derive(Debug, Deserialize)]
pub(crate) struct PlacementApiRequest {
    #[serde(flatten)]
    pub request: PlacementRequest,
    /// Open a reservation for the selection once it is written back.
    #[serde(default)]
    pub reserve: bool,
}

/// Successful POST /api/placement result.
#[derive(Debug, Serialize)]
pub(crate) struct PlacementResponse {
    pub request_id: i64,
    #[serde(flatten)]
    pub outcome: PlacementOutcome,
    pub reservation: Option<Reservation>,
}

/// Data attached to a failed placement.
#[derive(Debug, Serialize)]
pub(crate) struct PlacementFailure {
    pub request_id: i64,
}

/// Request body for POST /api/settings. Sort orders use the same
/// comma-separated form as the config file.
#[derive(Debug, Deserialize)]
pub(crate) struct SettingsUpdateRequest {
    pub storage_max_vms: Option<u32>,
    pub storage_max_pct_used: Option<u8>,
    pub host_sort_order: Option<String>,
    pub storage_sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    pub state: crate::DaemonState,
    pub detail: Option<String>,
    /// `None` when the reservation table could not be read.
    pub active_reservations: Option<usize>,
    pub version: String,
}
