use super::defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_DB_PATH, DEFAULT_HOST_SORT_ORDER, DEFAULT_PORT,
    DEFAULT_STORAGE_MAX_PCT_USED, DEFAULT_STORAGE_MAX_VMS, DEFAULT_STORAGE_SORT_ORDER,
};
use crate::placement::{PlacementSettings, SortOrder, Thresholds};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub config_path: String,
    /// Max VMs per storage, in-flight included. 0 = unlimited.
    pub storage_max_vms: u32,
    /// Max used percentage per storage after placement. 100 = unlimited.
    pub storage_max_pct_used: u8,
    pub host_sort_order: SortOrder,
    pub storage_sort_order: SortOrder,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: DEFAULT_DB_PATH.to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            storage_max_vms: DEFAULT_STORAGE_MAX_VMS,
            storage_max_pct_used: DEFAULT_STORAGE_MAX_PCT_USED,
            host_sort_order: SortOrder::parse_lenient(DEFAULT_HOST_SORT_ORDER),
            storage_sort_order: SortOrder::parse_lenient(DEFAULT_STORAGE_SORT_ORDER),
        }
    }
}

impl AppConfig {
    /// Load configuration, merging defaults with env overrides and config file values.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("VP_CONFIG_PATH") {
            config.config_path = path;
        }
        if let Ok(path) = std::env::var("VP_DB_PATH") {
            config.db_path = path;
        }
        if let Ok(port) = std::env::var("VP_PORT") {
            config.port = port.parse().context("VP_PORT must be a valid port number")?;
        }

        let cfg_path = Path::new(&config.config_path);
        if cfg_path.exists() {
            let contents = fs::read_to_string(cfg_path)
                .with_context(|| format!("Failed to read config file: {}", config.config_path))?;
            config.parse_ini(&contents);
        }

        config.validate()?;
        Ok(config)
    }

    /// The slice of configuration the placement engine runs with.
    pub fn placement_settings(&self) -> PlacementSettings {
        PlacementSettings {
            thresholds: Thresholds {
                storage_max_vms: self.storage_max_vms,
                storage_max_pct_used: self.storage_max_pct_used,
            },
            host_sort_order: self.host_sort_order.clone(),
            storage_sort_order: self.storage_sort_order.clone(),
        }
    }
}
