/// Default path of the daemon's KEY="VALUE" config file.
pub(super) const DEFAULT_CONFIG_PATH: &str = "/etc/vm-placement/vm-placement.cfg";

/// Default path for the SQLite database.
pub(super) const DEFAULT_DB_PATH: &str = "/var/lib/vm-placement/placement.db";

/// Default port the daemon listens on (localhost only).
pub(super) const DEFAULT_PORT: u16 = 7190;

/// 0 disables the per-storage VM count limit.
pub(super) const DEFAULT_STORAGE_MAX_VMS: u32 = 0;

/// 100 disables the per-storage used-percentage limit.
pub(super) const DEFAULT_STORAGE_MAX_PCT_USED: u8 = 100;

pub(super) const DEFAULT_HOST_SORT_ORDER: &str = "active_memory,cpu_usage,memory_usage,random";

pub(super) const DEFAULT_STORAGE_SORT_ORDER: &str =
    "active_vm_count,free_space,free_space_percentage,random";
