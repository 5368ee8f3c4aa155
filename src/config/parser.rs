use super::settings::AppConfig;
use crate::placement::SortOrder;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl AppConfig {
    /// Apply a simple KEY="VALUE" config file on top of the current values.
    pub(crate) fn parse_ini(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "PORT" => {
                        if let Ok(v) = value.parse() {
                            self.port = v;
                        }
                    }
                    "STORAGE_MAX_VMS" => {
                        if let Ok(v) = value.parse() {
                            self.storage_max_vms = v;
                        }
                    }
                    "STORAGE_MAX_PCT_USED" => {
                        if let Ok(v) = value.parse() {
                            self.storage_max_pct_used = v;
                        }
                    }
                    "HOST_SORT_ORDER" => {
                        self.host_sort_order = SortOrder::parse_lenient(value);
                    }
                    "STORAGE_SORT_ORDER" => {
                        self.storage_sort_order = SortOrder::parse_lenient(value);
                    }
                    _ => {} // Ignore unknown keys
                }
            }
        }
    }

    /// Write the current settings back to the config file.
    pub fn save(&self) -> Result<()> {
        let contents = format!(
            r#"# vm-placement configuration
# Written by the daemon; edit through POST /api/settings
PORT="{}"
STORAGE_MAX_VMS="{}"
STORAGE_MAX_PCT_USED="{}"
HOST_SORT_ORDER="{}"
STORAGE_SORT_ORDER="{}"
"#,
            self.port,
            self.storage_max_vms,
            self.storage_max_pct_used,
            self.host_sort_order,
            self.storage_sort_order,
        );

        if let Some(parent) = Path::new(&self.config_path).parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write config to {}", self.config_path))?;

        Ok(())
    }
}
