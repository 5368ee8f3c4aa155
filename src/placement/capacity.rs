//! Storage admission against observed usage plus in-flight reservations.
//!
//! Checks run in a fixed order (space, VM count, percent used) and stop at
//! the first failure, so the reported reason is always the earliest one.

use super::ledger::ActiveProvisioningLedger;
use super::report::SkipReason;
use super::types::{PlacementRequest, Storage, Thresholds};

/// `free_space` must strictly exceed the request plus bytes already reserved.
pub fn enough_space(
    storage: &Storage,
    request: &PlacementRequest,
    ledger: &dyn ActiveProvisioningLedger,
) -> Result<(), SkipReason> {
    let needed =
        request.requested_storage_bytes.saturating_add(ledger.active_storage_bytes(storage.id));
    if storage.free_space > needed {
        Ok(())
    } else {
        Err(SkipReason::InsufficientSpace { free: storage.free_space, needed })
    }
}

pub fn under_vm_count(
    storage: &Storage,
    ledger: &dyn ActiveProvisioningLedger,
    thresholds: &Thresholds,
) -> Result<(), SkipReason> {
    if thresholds.storage_max_vms == 0 {
        return Ok(());
    }
    let count = storage.vm_count.saturating_add(ledger.active_vm_count(storage.id));
    if count < thresholds.storage_max_vms {
        Ok(())
    } else {
        Err(SkipReason::TooManyVms { count, max: thresholds.storage_max_vms })
    }
}

pub fn under_pct_used(
    storage: &Storage,
    request: &PlacementRequest,
    ledger: &dyn ActiveProvisioningLedger,
    thresholds: &Thresholds,
) -> Result<(), SkipReason> {
    if thresholds.storage_max_pct_used >= 100 {
        return Ok(());
    }
    let used = u128::from(storage.total_space.saturating_sub(storage.free_space))
        + u128::from(ledger.active_storage_bytes(storage.id))
        + u128::from(request.requested_storage_bytes);
    let max = thresholds.storage_max_pct_used;
    // used / total < max / 100, cross-multiplied so exact limits stay exact.
    if used * 100 < u128::from(max) * u128::from(storage.total_space) {
        Ok(())
    } else {
        let pct = storage.used_pct()
            + active_pct(storage, ledger)
            + storage.pct_of_total(request.requested_storage_bytes);
        Err(SkipReason::OverPercentUsed { pct, max })
    }
}

/// Share of `storage` held by in-flight reservations, in percent.
pub fn active_pct(storage: &Storage, ledger: &dyn ActiveProvisioningLedger) -> f64 {
    storage.pct_of_total(ledger.active_storage_bytes(storage.id))
}

/// All three checks, short-circuiting on the first failure.
pub fn check(
    storage: &Storage,
    request: &PlacementRequest,
    ledger: &dyn ActiveProvisioningLedger,
    thresholds: &Thresholds,
) -> Result<(), SkipReason> {
    enough_space(storage, request, ledger)?;
    under_vm_count(storage, ledger, thresholds)?;
    under_pct_used(storage, request, ledger, thresholds)
}

pub fn usable(
    storage: &Storage,
    request: &PlacementRequest,
    ledger: &dyn ActiveProvisioningLedger,
    thresholds: &Thresholds,
) -> bool {
    check(storage, request, ledger, thresholds).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::ledger::{ActiveReservation, LedgerSnapshot};
    use crate::placement::tags::TagFilterSet;
    use crate::placement::types::{TagSet, Vendor};

    const GB: u64 = 1_000_000_000;

    fn storage(free: u64, total: u64, vm_count: u32) -> Storage {
        Storage {
            id: 10,
            name: "ds10".to_string(),
            free_space: free,
            total_space: total,
            vm_count,
            multi_host_access: true,
            tags: TagSet::new(),
        }
    }

    fn request(bytes: u64) -> PlacementRequest {
        PlacementRequest {
            template: None,
            ems_id: None,
            requester: None,
            vendor: Vendor::VMware,
            requested_storage_bytes: bytes,
            requested_memory: 0,
            requested_cpu: 0,
            tag_filters: TagFilterSet::new(),
        }
    }

    fn ledger_with(storage_id: i64, bytes: u64, vms: usize) -> LedgerSnapshot {
        LedgerSnapshot::from_reservations(&[ActiveReservation {
            id: 1,
            host_id: None,
            storage_id: Some(storage_id),
            memory: 0,
            cpu: 0,
            storage_bytes: bytes,
            vm_ids: (0..vms).map(|i| format!("vm-{i}")).collect(),
        }])
    }

    fn unlimited() -> Thresholds {
        Thresholds { storage_max_vms: 0, storage_max_pct_used: 100 }
    }

    #[test]
    fn free_space_must_strictly_exceed_need() {
        let ds = storage(100 * GB, 1000 * GB, 0);
        let ledger = LedgerSnapshot::empty();
        assert!(!usable(&ds, &request(100 * GB), &ledger, &unlimited()));
        assert!(usable(&ds, &request(100 * GB - 1), &ledger, &unlimited()));
    }

    #[test]
    fn in_flight_bytes_count_against_free_space() {
        let ds = storage(300 * GB, 1000 * GB, 0);
        let ledger = ledger_with(10, 250 * GB, 1);
        let err = check(&ds, &request(100 * GB), &ledger, &unlimited()).unwrap_err();
        assert_eq!(err, SkipReason::InsufficientSpace { free: 300 * GB, needed: 350 * GB });
    }

    #[test]
    fn vm_count_includes_in_flight_vms() {
        let ds = storage(500 * GB, 1000 * GB, 8);
        let thresholds = Thresholds { storage_max_vms: 10, storage_max_pct_used: 100 };

        assert!(usable(&ds, &request(GB), &LedgerSnapshot::empty(), &thresholds));
        assert!(usable(&ds, &request(GB), &ledger_with(10, 0, 1), &thresholds));

        let err = check(&ds, &request(GB), &ledger_with(10, 0, 2), &thresholds).unwrap_err();
        assert_eq!(err, SkipReason::TooManyVms { count: 10, max: 10 });
    }

    #[test]
    fn zero_max_vms_disables_vm_check() {
        let ds = storage(500 * GB, 1000 * GB, 10_000);
        assert!(under_vm_count(&ds, &ledger_with(10, 0, 500), &unlimited()).is_ok());
    }

    #[test]
    fn hundred_pct_disables_pct_check() {
        let ds = storage(2 * GB, 1000 * GB, 0);
        assert!(under_pct_used(&ds, &request(GB), &LedgerSnapshot::empty(), &unlimited()).is_ok());
    }

    #[test]
    fn space_failure_is_reported_before_vm_count() {
        let ds = storage(GB, 1000 * GB, 50);
        let thresholds = Thresholds { storage_max_vms: 10, storage_max_pct_used: 50 };
        let err = check(&ds, &request(2 * GB), &LedgerSnapshot::empty(), &thresholds).unwrap_err();
        assert!(matches!(err, SkipReason::InsufficientSpace { .. }));
    }

    #[test]
    fn more_in_flight_bytes_never_makes_storage_usable() {
        let ds = storage(400 * GB, 1000 * GB, 0);
        let thresholds = Thresholds { storage_max_vms: 0, storage_max_pct_used: 80 };
        let req = request(50 * GB);

        let mut was_usable = true;
        for active in (0..=400).step_by(25) {
            let now_usable = usable(&ds, &req, &ledger_with(10, active * GB, 1), &thresholds);
            assert!(was_usable || !now_usable, "became usable again at {active} GB in flight");
            was_usable = now_usable;
        }
        assert!(!was_usable);
    }

    #[test]
    fn escape_values_leave_only_space_check() {
        // 1 TB total, 40% used.
        let ds = storage(600 * GB, 1000 * GB, 0);
        assert!((ds.used_pct() - 40.0).abs() < 1e-9);
        assert!(usable(&ds, &request(100 * GB), &LedgerSnapshot::empty(), &unlimited()));
    }

    #[test]
    fn pct_limit_is_exclusive() {
        let ds = storage(600 * GB, 1000 * GB, 0);
        let thresholds = Thresholds { storage_max_vms: 0, storage_max_pct_used: 50 };
        let err = check(&ds, &request(100 * GB), &LedgerSnapshot::empty(), &thresholds).unwrap_err();
        match err {
            SkipReason::OverPercentUsed { pct, max } => {
                assert!((pct - 50.0).abs() < 1e-9);
                assert_eq!(max, 50);
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn pct_limit_is_exact_where_float_sums_round_down() {
        // 3 GB used of 12, 5 GB in flight, 1 GB requested: exactly 75%.
        let ds = storage(9 * GB, 12 * GB, 0);
        let ledger = ledger_with(10, 5 * GB, 1);
        let at_limit = Thresholds { storage_max_vms: 0, storage_max_pct_used: 75 };
        let err = check(&ds, &request(GB), &ledger, &at_limit).unwrap_err();
        assert!(matches!(err, SkipReason::OverPercentUsed { max: 75, .. }));

        let above = Thresholds { storage_max_vms: 0, storage_max_pct_used: 76 };
        assert!(usable(&ds, &request(GB), &ledger, &above));
    }

    #[test]
    fn zero_total_storage_never_passes_pct_limit() {
        let ds = storage(0, 0, 0);
        let thresholds = Thresholds { storage_max_vms: 0, storage_max_pct_used: 90 };
        assert!(under_pct_used(&ds, &request(0), &LedgerSnapshot::empty(), &thresholds).is_err());
    }
}
