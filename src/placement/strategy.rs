//! Vendor-specific narrowing of the candidate cluster and hosts.
//!
//! - RHV: the template's cluster is fixed; its eligible hosts are ranked and
//!   the VM is pinned to a host.
//! - VMware with DRS: a random eligible DRS cluster is the destination. One
//!   random powered-on member host is only used to discover storages.
//! - VMware without an eligible DRS cluster: eligible hosts of the provider
//!   are ranked and the VM is pinned to a host.

use super::error::{PlacementError, PlacementResult};
use super::ledger::ActiveProvisioningLedger;
use super::ports::{HostScope, InventoryProvider};
use super::ranking::{rank, SortOrder};
use super::report::{Disqualification, Findings, SkipReason};
use super::tags::TagFilterSet;
use super::types::{Cluster, Host, PlacementRequest, TemplateRef, Vendor};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

/// Candidate scope produced by a strategy.
#[derive(Debug, Clone)]
pub struct Candidates {
    /// Destination cluster for DRS, or the pinned cluster for RHV.
    pub cluster: Option<Cluster>,
    /// Hosts whose storages are searched, in preference order.
    pub hosts: Vec<Host>,
    /// Whether the VM is assigned to a host rather than a cluster.
    pub need_specific_host: bool,
    /// Storages must be reachable from every host of the cluster.
    pub require_shared_storage: bool,
}

#[derive(Debug, Clone)]
pub enum VendorPlacementStrategy {
    Rhv { cluster: Cluster },
    VMwareDrs { ems_id: i64, clusters: Vec<Cluster> },
    VMwareHost { ems_id: i64 },
}

/// Everything a strategy reads while producing candidates.
pub struct StrategyInputs<'a> {
    pub request: &'a PlacementRequest,
    pub inventory: &'a dyn InventoryProvider,
    pub ledger: &'a dyn ActiveProvisioningLedger,
    pub host_sort_order: &'a SortOrder,
}

impl VendorPlacementStrategy {
    /// Pick the strategy for `request.vendor`.
    pub fn resolve(
        request: &PlacementRequest,
        template: &TemplateRef,
        ems_id: i64,
        inventory: &dyn InventoryProvider,
        findings: &mut Findings,
    ) -> PlacementResult<Self> {
        match request.vendor {
            Vendor::Rhv => {
                let cluster_id = template.ems_cluster_id.ok_or_else(|| {
                    PlacementError::Configuration(format!(
                        "template '{}' is not in a cluster",
                        template.name
                    ))
                })?;
                let cluster = inventory.find_cluster(cluster_id)?.ok_or_else(|| {
                    PlacementError::Configuration(format!(
                        "cluster {cluster_id} of template '{}' not found in inventory",
                        template.name
                    ))
                })?;
                Ok(Self::Rhv { cluster })
            }
            Vendor::VMware => {
                let clusters = inventory.list_clusters(ems_id)?;
                let drs: Vec<Cluster> = eligible_clusters(clusters, &request.tag_filters, findings)
                    .into_iter()
                    .filter(|c| c.drs_enabled)
                    .collect();

                if drs.is_empty() {
                    debug!(ems_id, "No eligible DRS cluster, falling back to host placement");
                    Ok(Self::VMwareHost { ems_id })
                } else {
                    Ok(Self::VMwareDrs { ems_id, clusters: drs })
                }
            }
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rhv { .. } => "rhv",
            Self::VMwareDrs { .. } => "vmware_drs",
            Self::VMwareHost { .. } => "vmware_host",
        }
    }

    /// Narrow the inventory to the cluster and ordered hosts to search.
    pub fn candidates<R: Rng>(
        &self,
        inputs: &StrategyInputs<'_>,
        findings: &mut Findings,
        rng: &mut R,
    ) -> PlacementResult<Candidates> {
        match self {
            Self::Rhv { cluster } => {
                let members = inputs.inventory.list_hosts(HostScope::Cluster(cluster.id))?;
                let hosts = eligible_hosts(members, &inputs.request.tag_filters, findings);
                if hosts.is_empty() {
                    return Err(PlacementError::Eligibility(format!(
                        "no eligible host in cluster '{}'",
                        cluster.name
                    )));
                }
                Ok(Candidates {
                    cluster: Some(cluster.clone()),
                    hosts: rank(hosts, inputs.host_sort_order, inputs.ledger, rng),
                    need_specific_host: true,
                    require_shared_storage: false,
                })
            }
            Self::VMwareDrs { ems_id, clusters } => {
                if let Some(candidates) = sample_drs_cluster(clusters, inputs, findings, rng)? {
                    return Ok(candidates);
                }
                host_candidates(*ems_id, inputs, findings, rng)
            }
            Self::VMwareHost { ems_id } => host_candidates(*ems_id, inputs, findings, rng),
        }
    }
}

/// Random DRS cluster with at least one powered-on host, if any.
fn sample_drs_cluster<R: Rng>(
    clusters: &[Cluster],
    inputs: &StrategyInputs<'_>,
    findings: &mut Findings,
    rng: &mut R,
) -> PlacementResult<Option<Candidates>> {
    let mut order: Vec<&Cluster> = clusters.iter().collect();
    order.shuffle(rng);

    for cluster in order {
        let members = inputs.inventory.list_hosts(HostScope::Cluster(cluster.id))?;
        let powered_on: Vec<&Host> = members.iter().filter(|h| h.is_powered_on()).collect();

        let Some(&sampled) = powered_on.choose(rng) else {
            findings.record(Disqualification::cluster(cluster, SkipReason::NoPoweredOnHosts));
            continue;
        };

        info!(
            cluster = %cluster.name,
            sampled_host = %sampled.name,
            hosts = members.len(),
            "Selected DRS cluster"
        );
        return Ok(Some(Candidates {
            cluster: Some(cluster.clone()),
            hosts: vec![sampled.clone()],
            need_specific_host: false,
            require_shared_storage: members.len() > 1,
        }));
    }

    Ok(None)
}

fn host_candidates<R: Rng>(
    ems_id: i64,
    inputs: &StrategyInputs<'_>,
    findings: &mut Findings,
    rng: &mut R,
) -> PlacementResult<Candidates> {
    let all = inputs.inventory.list_hosts(HostScope::Ems(ems_id))?;
    let hosts = eligible_hosts(all, &inputs.request.tag_filters, findings);
    if hosts.is_empty() {
        return Err(PlacementError::Eligibility(format!(
            "no eligible cluster or host for provider {ems_id}"
        )));
    }

    Ok(Candidates {
        cluster: None,
        hosts: rank(hosts, inputs.host_sort_order, inputs.ledger, rng),
        need_specific_host: true,
        require_shared_storage: false,
    })
}

fn eligible_clusters(
    clusters: Vec<Cluster>,
    filters: &TagFilterSet,
    findings: &mut Findings,
) -> Vec<Cluster> {
    clusters
        .into_iter()
        .filter(|c| match filters.first_mismatch(c) {
            None => true,
            Some(category) => {
                let reason = SkipReason::TagMismatch { category: category.to_string() };
                findings.record(Disqualification::cluster(c, reason));
                false
            }
        })
        .collect()
}

/// Powered-on, out-of-maintenance hosts that pass the tag filters.
fn eligible_hosts(hosts: Vec<Host>, filters: &TagFilterSet, findings: &mut Findings) -> Vec<Host> {
    hosts
        .into_iter()
        .filter(|h| {
            let reason = if !h.is_powered_on() {
                SkipReason::PoweredOff
            } else if h.maintenance {
                SkipReason::InMaintenance
            } else if let Some(category) = filters.first_mismatch(h) {
                SkipReason::TagMismatch { category: category.to_string() }
            } else {
                return true;
            };
            findings.record(Disqualification::host(h, reason));
            false
        })
        .collect()
}
