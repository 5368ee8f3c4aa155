//! Placement orchestration: resolve scope, filter, rank, select, report.
//!
//! The search reads the inventory and one ledger snapshot and has no side
//! effects. Only a successful decision is written to the request sink.

use super::capacity;
use super::error::{PlacementError, PlacementResult};
use super::ledger::ActiveProvisioningLedger;
use super::ports::{InventoryProvider, ProvisioningRequestSink};
use super::ranking::{rank, SortOrder};
use super::report::{Disqualification, Findings, PlacementOutcome, SkipReason};
use super::strategy::{Candidates, StrategyInputs, VendorPlacementStrategy};
use super::types::{
    Destination, Host, ObjectRef, PlacementRequest, PlacementSelection, Storage, TemplateRef,
    Thresholds,
};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Engine configuration, supplied once at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSettings {
    pub thresholds: Thresholds,
    pub host_sort_order: SortOrder,
    pub storage_sort_order: SortOrder,
}

#[derive(Debug, Clone)]
pub struct PlacementEngine {
    settings: PlacementSettings,
}

impl PlacementEngine {
    pub const fn new(settings: PlacementSettings) -> Self {
        Self { settings }
    }

    /// Search and, on success, write the assignment to `sink`.
    pub fn place(
        &self,
        request: &PlacementRequest,
        inventory: &dyn InventoryProvider,
        ledger: &dyn ActiveProvisioningLedger,
        sink: &mut dyn ProvisioningRequestSink,
    ) -> PlacementResult<PlacementOutcome> {
        self.place_with_rng(request, inventory, ledger, sink, &mut rand::thread_rng())
    }

    pub fn place_with_rng<R: Rng>(
        &self,
        request: &PlacementRequest,
        inventory: &dyn InventoryProvider,
        ledger: &dyn ActiveProvisioningLedger,
        sink: &mut dyn ProvisioningRequestSink,
        rng: &mut R,
    ) -> PlacementResult<PlacementOutcome> {
        let outcome = self.select(request, inventory, ledger, rng)?;
        write_back(sink, &outcome.selection)?;
        Ok(outcome)
    }

    /// Side-effect-free search for a destination and storage.
    pub fn select<R: Rng>(
        &self,
        request: &PlacementRequest,
        inventory: &dyn InventoryProvider,
        ledger: &dyn ActiveProvisioningLedger,
        rng: &mut R,
    ) -> PlacementResult<PlacementOutcome> {
        let (template, ems_id) = validate(request)?;
        let mut findings = Findings::default();

        let strategy =
            VendorPlacementStrategy::resolve(request, template, ems_id, inventory, &mut findings)?;
        let inputs = StrategyInputs {
            request,
            inventory,
            ledger,
            host_sort_order: &self.settings.host_sort_order,
        };
        let candidates = strategy.candidates(&inputs, &mut findings, rng)?;
        debug!(
            strategy = strategy.name(),
            hosts = candidates.hosts.len(),
            need_specific_host = candidates.need_specific_host,
            "Candidate scope resolved"
        );

        for host in &candidates.hosts {
            let Some(storage) =
                self.best_storage(host, &candidates, request, inventory, ledger, &mut findings, rng)?
            else {
                continue;
            };

            let destination = match (&candidates.cluster, candidates.need_specific_host) {
                (Some(cluster), false) => Destination::Cluster(ObjectRef::from(cluster)),
                _ => Destination::Host(ObjectRef::from(host)),
            };
            let selection = PlacementSelection {
                destination,
                storage: ObjectRef::from(&storage),
                need_specific_host: candidates.need_specific_host,
            };
            info!(
                strategy = strategy.name(),
                destination = ?selection.destination,
                storage = %storage.name,
                "Placement selected"
            );
            return Ok(PlacementOutcome {
                selection,
                disqualified: findings.into_vec(),
                decided_at: Utc::now(),
            });
        }

        let err = if findings.has_capacity_failure() {
            PlacementError::Capacity(format!(
                "every eligible storage on {} candidate host(s) fails capacity thresholds",
                candidates.hosts.len()
            ))
        } else {
            PlacementError::Eligibility(format!(
                "no eligible storage on {} candidate host(s)",
                candidates.hosts.len()
            ))
        };
        warn!(strategy = strategy.name(), "Placement failed: {err}");
        Err(err)
    }

    /// Top-ranked storage of `host` that passes every filter, if any.
    #[allow(clippy::too_many_arguments)]
    fn best_storage<R: Rng>(
        &self,
        host: &Host,
        candidates: &Candidates,
        request: &PlacementRequest,
        inventory: &dyn InventoryProvider,
        ledger: &dyn ActiveProvisioningLedger,
        findings: &mut Findings,
        rng: &mut R,
    ) -> PlacementResult<Option<Storage>> {
        let storages = inventory.list_storages(host.id)?;
        let survivors: Vec<Storage> = storages
            .into_iter()
            .filter(|s| match self.storage_skip_reason(s, candidates, request, ledger) {
                None => true,
                Some(reason) => {
                    findings.record(Disqualification::storage(s, reason));
                    false
                }
            })
            .collect();

        if survivors.is_empty() {
            debug!(host = %host.name, "No usable storage on host");
            return Ok(None);
        }

        let ranked = rank(survivors, &self.settings.storage_sort_order, ledger, rng);
        Ok(ranked.into_iter().next())
    }

    fn storage_skip_reason(
        &self,
        storage: &Storage,
        candidates: &Candidates,
        request: &PlacementRequest,
        ledger: &dyn ActiveProvisioningLedger,
    ) -> Option<SkipReason> {
        if let Some(category) = request.tag_filters.first_mismatch(storage) {
            return Some(SkipReason::TagMismatch { category: category.to_string() });
        }
        if candidates.require_shared_storage && !storage.multi_host_access {
            return Some(SkipReason::SingleHostStorage);
        }
        capacity::check(storage, request, ledger, &self.settings.thresholds).err()
    }
}

/// Required inputs: template, provider and requester.
fn validate(request: &PlacementRequest) -> PlacementResult<(&TemplateRef, i64)> {
    let template = request
        .template
        .as_ref()
        .ok_or_else(|| PlacementError::Configuration("no template given".to_string()))?;
    let ems_id = request.resolved_ems_id().ok_or_else(|| {
        PlacementError::Configuration(format!("no provider for template '{}'", template.name))
    })?;
    if request.requester.as_deref().map_or(true, |r| r.trim().is_empty()) {
        return Err(PlacementError::Configuration("no requester given".to_string()));
    }
    Ok((template, ems_id))
}

fn write_back(
    sink: &mut dyn ProvisioningRequestSink,
    selection: &PlacementSelection,
) -> PlacementResult<()> {
    match &selection.destination {
        Destination::Cluster(cluster) => sink.set_cluster(cluster),
        Destination::Host(host) => sink.set_host(host),
    }
    .map_err(PlacementError::WriteBack)?;
    sink.set_storage(&selection.storage).map_err(PlacementError::WriteBack)
}
