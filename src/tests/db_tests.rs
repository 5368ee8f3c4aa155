use crate::db::{Database, InventorySnapshot, MountedStorage, NewReservation, RequestStatus, ReservationStatus};
use crate::placement::testing::{cluster, host, request, storage, GB};
use crate::placement::{
    ActiveProvisioningLedger, HostScope, InventoryProvider, ObjectRef, PowerState,
    ProvisioningRequestSink, Vendor,
};

fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.run_migrations().unwrap();
    db
}

fn sample_inventory() -> InventorySnapshot {
    let mut off = host(12, Some(1));
    off.power_state = PowerState::Off;
    InventorySnapshot {
        clusters: vec![cluster(1, true).tagged("prov_scope", "all"), cluster(2, false)],
        hosts: vec![host(10, Some(1)).tagged("prov_scope", "all"), host(11, Some(1)), off, host(20, None)],
        storages: vec![
            MountedStorage {
                storage: storage(100, 50 * GB, 100 * GB).tagged("prov_scope", "all"),
                host_ids: vec![10, 11],
            },
            MountedStorage { storage: storage(101, 10 * GB, 100 * GB).single_host(), host_ids: vec![20] },
        ],
    }
}

#[test]
fn test_open_and_migrate() {
    let db = test_db();
    let conn = db.conn();
    for table in ["clusters", "hosts", "storages", "host_storages", "tags", "reservations", "provisioning_requests"] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "missing table {table}");
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let db = test_db();
    db.run_migrations().unwrap();
}

#[test]
fn test_inventory_provider_reads_back_tags_and_mounts() {
    let db = test_db();
    let counts = db.replace_inventory(&sample_inventory()).unwrap();
    assert_eq!((counts.clusters, counts.hosts, counts.storages), (2, 4, 2));

    let clusters = db.list_clusters(1).unwrap();
    assert_eq!(clusters.len(), 2);
    assert!(clusters[0].drs_enabled);
    assert!(clusters[0].tags.contains("prov_scope", "all"));
    assert!(!clusters[1].tags.contains("prov_scope", "all"));

    let members = db.list_hosts(HostScope::Cluster(1)).unwrap();
    assert_eq!(members.iter().map(|h| h.id).collect::<Vec<_>>(), vec![10, 11, 12]);
    assert_eq!(members[2].power_state, PowerState::Off);

    let all = db.list_hosts(HostScope::Ems(1)).unwrap();
    assert_eq!(all.len(), 4);

    let storages = db.list_storages(11).unwrap();
    assert_eq!(storages.len(), 1);
    assert_eq!(storages[0].id, 100);
    assert!(storages[0].multi_host_access);
    assert!(storages[0].tags.contains("prov_scope", "all"));

    assert!(db.list_storages(12).unwrap().is_empty());
    assert!(!db.list_storages(20).unwrap()[0].multi_host_access);

    assert_eq!(db.find_cluster(2).unwrap().map(|c| c.name), Some("cluster2".to_string()));
    assert!(db.find_cluster(99).unwrap().is_none());
}

#[test]
fn test_replace_inventory_drops_previous_snapshot() {
    let db = test_db();
    db.replace_inventory(&sample_inventory()).unwrap();
    db.replace_inventory(&InventorySnapshot {
        clusters: vec![],
        hosts: vec![host(30, None)],
        storages: vec![],
    })
    .unwrap();

    let inventory = db.get_inventory().unwrap();
    assert!(inventory.clusters.is_empty());
    assert_eq!(inventory.hosts.len(), 1);
    assert!(inventory.storages.is_empty());
    let conn = db.conn();
    let tags: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0)).unwrap();
    assert_eq!(tags, 0);
}

#[test]
fn test_replace_inventory_rejects_mount_on_unknown_host() {
    let db = test_db();
    db.replace_inventory(&sample_inventory()).unwrap();
    let bad = InventorySnapshot {
        clusters: vec![],
        hosts: vec![],
        storages: vec![MountedStorage { storage: storage(1, GB, GB), host_ids: vec![404] }],
    };
    assert!(db.replace_inventory(&bad).is_err());

    // The failed swap left the previous inventory in place.
    assert_eq!(db.get_inventory().unwrap().hosts.len(), 4);
}

#[test]
fn test_get_inventory_lists_mounts() {
    let db = test_db();
    db.replace_inventory(&sample_inventory()).unwrap();
    let inventory = db.get_inventory().unwrap();
    assert_eq!(inventory.storages[0].host_ids, vec![10, 11]);
    assert_eq!(inventory.storages[1].host_ids, vec![20]);
    assert!(inventory.hosts[0].tags.contains("prov_scope", "all"));
}

#[test]
fn test_ledger_snapshot_counts_only_active_reservations() {
    let db = test_db();
    let first = db
        .open_reservation(&NewReservation {
            host_id: Some(10),
            storage_id: Some(100),
            memory: 4 * GB,
            cpu: 2,
            storage_bytes: 20 * GB,
            vm_ids: vec!["vm-1".into(), "vm-2".into()],
            ..NewReservation::default()
        })
        .unwrap();
    db.open_reservation(&NewReservation {
        host_id: Some(10),
        storage_id: Some(100),
        memory: GB,
        storage_bytes: 5 * GB,
        ..NewReservation::default()
    })
    .unwrap();

    let ledger = db.ledger_snapshot().unwrap();
    assert_eq!(ledger.active_memory(10), 5 * GB);
    assert_eq!(ledger.active_cpu(10), 2);
    assert_eq!(ledger.active_vm_count(100), 3);
    assert_eq!(ledger.active_storage_bytes(100), 25 * GB);

    let released = db.release_reservation(first.id).unwrap().unwrap();
    assert_eq!(released.status, ReservationStatus::Released);
    assert!(released.released_at.is_some());

    let ledger = db.ledger_snapshot().unwrap();
    assert_eq!(ledger.active_memory(10), GB);
    assert_eq!(ledger.active_vm_count(100), 1);
    assert_eq!(db.list_active_reservations().unwrap().len(), 1);
}

#[test]
fn test_release_unknown_reservation() {
    let db = test_db();
    assert!(db.release_reservation(42).unwrap().is_none());
}

#[test]
fn test_request_sink_writes_assignment() {
    let db = test_db();
    let id = db.create_request(&request(Vendor::VMware, 1)).unwrap();

    let pending = db.get_request(id).unwrap().unwrap();
    assert_eq!(pending.status, RequestStatus::Pending);
    assert_eq!(pending.template_name.as_deref(), Some("rhel9-template"));
    assert_eq!(pending.vendor, "vmware");

    let mut sink = crate::db::RequestSink { db: &db, request_id: id };
    sink.set_cluster(&ObjectRef { id: 1, name: "cluster1".into() }).unwrap();
    sink.set_storage(&ObjectRef { id: 100, name: "ds100".into() }).unwrap();

    let placed = db.get_request(id).unwrap().unwrap();
    assert_eq!(placed.status, RequestStatus::Placed);
    assert_eq!(placed.cluster.map(|c| c.name), Some("cluster1".to_string()));
    assert!(placed.host.is_none());
    assert_eq!(placed.storage.map(|s| s.id), Some(100));
}

#[test]
fn test_request_sink_fails_for_missing_request() {
    let db = test_db();
    let mut sink = crate::db::RequestSink { db: &db, request_id: 77 };
    assert!(sink.set_host(&ObjectRef { id: 1, name: "host1".into() }).is_err());
}
