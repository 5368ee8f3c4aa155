//! Collaborator interfaces the placement core consumes.

use super::types::{Cluster, Host, ObjectRef, Storage};
use anyhow::Result;

/// Which hosts to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostScope {
    /// Every host of a provider.
    Ems(i64),
    /// Members of one cluster.
    Cluster(i64),
}

/// Read-only access to the provider inventory.
pub trait InventoryProvider {
    fn list_clusters(&self, ems_id: i64) -> Result<Vec<Cluster>>;
    fn find_cluster(&self, cluster_id: i64) -> Result<Option<Cluster>>;
    fn list_hosts(&self, scope: HostScope) -> Result<Vec<Host>>;
    fn list_storages(&self, host_id: i64) -> Result<Vec<Storage>>;
}

/// Where the final assignment is written back.
pub trait ProvisioningRequestSink {
    fn set_cluster(&mut self, cluster: &ObjectRef) -> Result<()>;
    fn set_host(&mut self, host: &ObjectRef) -> Result<()>;
    fn set_storage(&mut self, storage: &ObjectRef) -> Result<()>;
}
