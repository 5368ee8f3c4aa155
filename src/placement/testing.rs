//! Synthetic inventory and sink used by placement tests.

use super::ports::{HostScope, InventoryProvider, ProvisioningRequestSink};
use super::tags::TagFilterSet;
use super::types::{
    Cluster, Host, ObjectRef, PlacementRequest, PowerState, Storage, TagSet, TemplateRef, Vendor,
};
use anyhow::{bail, Result};

pub(crate) const GB: u64 = 1_000_000_000;

#[derive(Debug, Default)]
pub(crate) struct InMemoryInventory {
    clusters: Vec<Cluster>,
    hosts: Vec<Host>,
    storages: Vec<(Storage, Vec<i64>)>,
    unavailable: bool,
}

impl InMemoryInventory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.clusters.push(cluster);
        self
    }

    pub(crate) fn with_host(mut self, host: Host) -> Self {
        self.hosts.push(host);
        self
    }

    /// Add `storage`, mounted on each of `host_ids`.
    pub(crate) fn with_storage(mut self, storage: Storage, host_ids: &[i64]) -> Self {
        self.storages.push((storage, host_ids.to_vec()));
        self
    }

    /// Make every read fail, as if the provider were unreachable.
    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            bail!("inventory unavailable");
        }
        Ok(())
    }
}

impl InventoryProvider for InMemoryInventory {
    fn list_clusters(&self, ems_id: i64) -> Result<Vec<Cluster>> {
        self.check()?;
        Ok(self.clusters.iter().filter(|c| c.ems_id == ems_id).cloned().collect())
    }

    fn find_cluster(&self, cluster_id: i64) -> Result<Option<Cluster>> {
        self.check()?;
        Ok(self.clusters.iter().find(|c| c.id == cluster_id).cloned())
    }

    fn list_hosts(&self, scope: HostScope) -> Result<Vec<Host>> {
        self.check()?;
        Ok(self
            .hosts
            .iter()
            .filter(|h| match scope {
                HostScope::Ems(ems_id) => h.ems_id == ems_id,
                HostScope::Cluster(cluster_id) => h.cluster_id == Some(cluster_id),
            })
            .cloned()
            .collect())
    }

    fn list_storages(&self, host_id: i64) -> Result<Vec<Storage>> {
        self.check()?;
        Ok(self
            .storages
            .iter()
            .filter(|(_, hosts)| hosts.contains(&host_id))
            .map(|(s, _)| s.clone())
            .collect())
    }
}

/// Records every write-back call in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub calls: Vec<(&'static str, i64)>,
}

impl ProvisioningRequestSink for RecordingSink {
    fn set_cluster(&mut self, cluster: &ObjectRef) -> Result<()> {
        self.calls.push(("cluster", cluster.id));
        Ok(())
    }

    fn set_host(&mut self, host: &ObjectRef) -> Result<()> {
        self.calls.push(("host", host.id));
        Ok(())
    }

    fn set_storage(&mut self, storage: &ObjectRef) -> Result<()> {
        self.calls.push(("storage", storage.id));
        Ok(())
    }
}

pub(crate) fn cluster(id: i64, drs_enabled: bool) -> Cluster {
    Cluster { id, name: format!("cluster{id}"), ems_id: 1, drs_enabled, tags: TagSet::new() }
}

pub(crate) fn host(id: i64, cluster_id: Option<i64>) -> Host {
    Host {
        id,
        name: format!("host{id}"),
        ems_id: 1,
        cluster_id,
        power_state: PowerState::On,
        maintenance: false,
        current_memory_usage: 0,
        current_memory_headroom: 0,
        current_cpu_usage: 0,
        tags: TagSet::new(),
    }
}

pub(crate) fn storage(id: i64, free: u64, total: u64) -> Storage {
    Storage {
        id,
        name: format!("ds{id}"),
        free_space: free,
        total_space: total,
        vm_count: 0,
        multi_host_access: true,
        tags: TagSet::new(),
    }
}

/// 10 GB request from template 100, which lives in `template_cluster` of provider 1.
pub(crate) fn request(vendor: Vendor, template_cluster: i64) -> PlacementRequest {
    PlacementRequest {
        template: Some(TemplateRef {
            id: 100,
            name: "rhel9-template".to_string(),
            ems_id: Some(1),
            ems_cluster_id: Some(template_cluster),
        }),
        ems_id: None,
        requester: Some("admin".to_string()),
        vendor,
        requested_storage_bytes: 10 * GB,
        requested_memory: 4 * GB,
        requested_cpu: 2,
        tag_filters: TagFilterSet::new(),
    }
}

impl Cluster {
    pub(crate) fn tagged(mut self, category: &str, value: &str) -> Self {
        self.tags.insert(category, value);
        self
    }
}

impl Host {
    pub(crate) fn tagged(mut self, category: &str, value: &str) -> Self {
        self.tags.insert(category, value);
        self
    }

    pub(crate) fn with_cpu_usage(mut self, usage: u64) -> Self {
        self.current_cpu_usage = usage;
        self
    }
}

impl Storage {
    pub(crate) fn tagged(mut self, category: &str, value: &str) -> Self {
        self.tags.insert(category, value);
        self
    }

    pub(crate) fn single_host(mut self) -> Self {
        self.multi_host_access = false;
        self
    }
}
