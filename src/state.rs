use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::AppConfig;
use crate::db::Database;
use crate::events::EventHub;

/// Shared application state passed to all API handlers via axum's State extractor.
pub struct AppState {
    pub db: Database,
    /// Live configuration; settings updates apply to the next placement.
    pub config: RwLock<AppConfig>,
    pub event_hub: EventHub,
    pub status: RwLock<DaemonStatus>,
    /// Serializes placements so each decision sees the reservations of the one before.
    pub placement_lock: Mutex<()>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, event_hub: EventHub) -> Self {
        Self {
            db,
            config: RwLock::new(config),
            event_hub,
            status: RwLock::new(DaemonStatus::idle()),
            placement_lock: Mutex::new(()),
        }
    }
}

/// The daemon's operating state, serialized to the API as a lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Idle,
    Placing,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub state: DaemonState,
    pub detail: Option<String>,
}

impl DaemonStatus {
    pub const fn idle() -> Self {
        Self { state: DaemonState::Idle, detail: None }
    }

    pub fn placing(detail: impl Into<String>) -> Self {
        Self { state: DaemonState::Placing, detail: Some(detail.into()) }
    }
}
