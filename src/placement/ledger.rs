//! Resources reserved by provisioning operations that are still in flight.
//!
//! Provider statistics only reflect VMs that already exist. The ledger covers
//! the gap between a placement decision and the VM showing up in inventory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only view of in-flight reservations. Unknown ids report zero.
pub trait ActiveProvisioningLedger {
    fn active_memory(&self, host_id: i64) -> u64;
    fn active_cpu(&self, host_id: i64) -> u64;
    fn active_vm_count(&self, storage_id: i64) -> u32;
    fn active_storage_bytes(&self, storage_id: i64) -> u64;
}

/// Resources held by one in-flight provisioning operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveReservation {
    pub id: i64,
    pub host_id: Option<i64>,
    pub storage_id: Option<i64>,
    pub memory: u64,
    pub cpu: u64,
    pub storage_bytes: u64,
    pub vm_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HostTotals {
    memory: u64,
    cpu: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StorageTotals {
    vms: u32,
    bytes: u64,
}

/// Per-host and per-storage sums over a set of reservations, taken once per
/// decision and treated as consistent for its duration.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    hosts: HashMap<i64, HostTotals>,
    storages: HashMap<i64, StorageTotals>,
}

impl LedgerSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_reservations<'a>(reservations: impl IntoIterator<Item = &'a ActiveReservation>) -> Self {
        let mut snapshot = Self::default();
        for r in reservations {
            snapshot.add(r);
        }
        snapshot
    }

    pub fn add(&mut self, r: &ActiveReservation) {
        if let Some(host_id) = r.host_id {
            let totals = self.hosts.entry(host_id).or_default();
            totals.memory = totals.memory.saturating_add(r.memory);
            totals.cpu = totals.cpu.saturating_add(r.cpu);
        }
        if let Some(storage_id) = r.storage_id {
            let totals = self.storages.entry(storage_id).or_default();
            // A reservation without VM ids still stands for one VM being built.
            let vms = u32::try_from(r.vm_ids.len().max(1)).unwrap_or(u32::MAX);
            totals.vms = totals.vms.saturating_add(vms);
            totals.bytes = totals.bytes.saturating_add(r.storage_bytes);
        }
    }
}

impl ActiveProvisioningLedger for LedgerSnapshot {
    fn active_memory(&self, host_id: i64) -> u64 {
        self.hosts.get(&host_id).map_or(0, |t| t.memory)
    }

    fn active_cpu(&self, host_id: i64) -> u64 {
        self.hosts.get(&host_id).map_or(0, |t| t.cpu)
    }

    fn active_vm_count(&self, storage_id: i64) -> u32 {
        self.storages.get(&storage_id).map_or(0, |t| t.vms)
    }

    fn active_storage_bytes(&self, storage_id: i64) -> u64 {
        self.storages.get(&storage_id).map_or(0, |t| t.bytes)
    }
}
