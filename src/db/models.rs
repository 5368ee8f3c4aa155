use crate::placement::{ActiveReservation, Cluster, Host, ObjectRef, Storage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A storage together with the hosts that mount it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountedStorage {
    #[serde(flatten)]
    pub storage: Storage,
    #[serde(default)]
    pub host_ids: Vec<i64>,
}

/// Complete provider inventory, as pushed by a refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub storages: Vec<MountedStorage>,
}

/// Row counts written by an inventory replacement.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct InventoryCounts {
    pub clusters: usize,
    pub hosts: usize,
    pub storages: usize,
}

/// Lifecycle of a stored provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Placed,
    Failed,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Placed => "placed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "placed" => Ok(Self::Placed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid request status: {s}")),
        }
    }
}

/// A provisioning request row, including whatever placement wrote back.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningRequestRecord {
    pub id: i64,
    pub requester: Option<String>,
    pub template_id: Option<i64>,
    pub template_name: Option<String>,
    pub vendor: String,
    pub requested_storage_bytes: u64,
    pub requested_memory: u64,
    pub requested_cpu: u64,
    pub status: RequestStatus,
    pub cluster: Option<ObjectRef>,
    pub host: Option<ObjectRef>,
    pub storage: Option<ObjectRef>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Released,
}

impl ReservationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Released => "released",
        }
    }
}

impl TryFrom<&str> for ReservationStatus {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "active" => Ok(Self::Active),
            "released" => Ok(Self::Released),
            _ => Err(format!("invalid reservation status: {s}")),
        }
    }
}

/// Resources to hold for an in-flight provisioning operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReservation {
    #[serde(default)]
    pub request_id: Option<i64>,
    pub host_id: Option<i64>,
    pub storage_id: Option<i64>,
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub cpu: u64,
    #[serde(default)]
    pub storage_bytes: u64,
    #[serde(default)]
    pub vm_ids: Vec<String>,
}

/// A stored reservation.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub id: i64,
    pub request_id: Option<i64>,
    pub host_id: Option<i64>,
    pub storage_id: Option<i64>,
    pub memory: u64,
    pub cpu: u64,
    pub storage_bytes: u64,
    pub vm_ids: Vec<String>,
    pub status: ReservationStatus,
    pub created_at: String,
    pub released_at: Option<String>,
}

impl Reservation {
    /// The part of the reservation the placement ledger counts.
    pub fn to_active(&self) -> ActiveReservation {
        ActiveReservation {
            id: self.id,
            host_id: self.host_id,
            storage_id: self.storage_id,
            memory: self.memory,
            cpu: self.cpu,
            storage_bytes: self.storage_bytes,
            vm_ids: self.vm_ids.clone(),
        }
    }
}
