use super::models::{InventoryCounts, InventorySnapshot, MountedStorage};
use super::optional_ext::OptionalExt;
use super::Database;
use crate::placement::{Cluster, Host, HostScope, InventoryProvider, PowerState, Storage, TagSet};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;

const CLUSTER_COLUMNS: &str = "id, name, ems_id, drs_enabled";

const HOST_COLUMNS: &str = "id, name, ems_id, cluster_id, power_state, maintenance, \
     current_memory_usage, current_memory_headroom, current_cpu_usage";

const STORAGE_COLUMNS: &str =
    "s.id, s.name, s.free_space, s.total_space, s.vm_count, s.multi_host_access";

fn map_cluster_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cluster> {
    Ok(Cluster {
        id: row.get(0)?,
        name: row.get(1)?,
        ems_id: row.get(2)?,
        drs_enabled: row.get::<_, i64>(3)? != 0,
        tags: TagSet::new(),
    })
}

fn map_host_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Host> {
    let power_str: String = row.get(4)?;
    let power_state = PowerState::try_from(power_str.as_str()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::from(e))
    })?;
    Ok(Host {
        id: row.get(0)?,
        name: row.get(1)?,
        ems_id: row.get(2)?,
        cluster_id: row.get(3)?,
        power_state,
        maintenance: row.get::<_, i64>(5)? != 0,
        current_memory_usage: row.get::<_, i64>(6)? as u64,
        current_memory_headroom: row.get::<_, i64>(7)? as u64,
        current_cpu_usage: row.get::<_, i64>(8)? as u64,
        tags: TagSet::new(),
    })
}

fn map_storage_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Storage> {
    Ok(Storage {
        id: row.get(0)?,
        name: row.get(1)?,
        free_space: row.get::<_, i64>(2)? as u64,
        total_space: row.get::<_, i64>(3)? as u64,
        vm_count: row.get::<_, i64>(4)? as u32,
        multi_host_access: row.get::<_, i64>(5)? != 0,
        tags: TagSet::new(),
    })
}

/// All tags of one object kind, keyed by object id.
fn load_tags(conn: &Connection, kind: &str) -> Result<HashMap<i64, TagSet>> {
    let mut stmt = conn.prepare_cached(
        "SELECT object_id, category, value FROM tags WHERE object_kind = ?1 \
         ORDER BY object_id, category, value",
    )?;
    let mut tags: HashMap<i64, TagSet> = HashMap::new();
    let rows = stmt.query_map(params![kind], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
    })?;
    for row in rows {
        let (id, category, value) = row?;
        tags.entry(id).or_default().insert(category, value);
    }
    Ok(tags)
}

fn insert_tags(tx: &Connection, kind: &str, id: i64, tags: &TagSet) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO tags (object_kind, object_id, category, value) \
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (category, value) in tags.iter() {
        stmt.execute(params![kind, id, category, value])?;
    }
    Ok(())
}

impl Database {
    /// Swap the stored inventory for `snapshot` in one transaction.
    pub fn replace_inventory(&self, snapshot: &InventorySnapshot) -> Result<InventoryCounts> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(
            "DELETE FROM tags;
             DELETE FROM host_storages;
             DELETE FROM storages;
             DELETE FROM hosts;
             DELETE FROM clusters;",
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO clusters (id, name, ems_id, drs_enabled) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for c in &snapshot.clusters {
                stmt.execute(params![c.id, c.name, c.ems_id, c.drs_enabled])
                    .with_context(|| format!("Failed to insert cluster {}", c.id))?;
                insert_tags(&tx, "cluster", c.id, &c.tags)?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO hosts (id, name, ems_id, cluster_id, power_state, maintenance, \
                 current_memory_usage, current_memory_headroom, current_cpu_usage)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for h in &snapshot.hosts {
                stmt.execute(params![
                    h.id,
                    h.name,
                    h.ems_id,
                    h.cluster_id,
                    h.power_state.as_str(),
                    h.maintenance,
                    h.current_memory_usage as i64,
                    h.current_memory_headroom as i64,
                    h.current_cpu_usage as i64,
                ])
                .with_context(|| format!("Failed to insert host {}", h.id))?;
                insert_tags(&tx, "host", h.id, &h.tags)?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO storages (id, name, free_space, total_space, vm_count, \
                 multi_host_access)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut mount = tx.prepare_cached(
                "INSERT OR IGNORE INTO host_storages (host_id, storage_id) VALUES (?1, ?2)",
            )?;
            for MountedStorage { storage: s, host_ids } in &snapshot.storages {
                stmt.execute(params![
                    s.id,
                    s.name,
                    s.free_space as i64,
                    s.total_space as i64,
                    s.vm_count,
                    s.multi_host_access,
                ])
                .with_context(|| format!("Failed to insert storage {}", s.id))?;
                for host_id in host_ids {
                    mount.execute(params![host_id, s.id]).with_context(|| {
                        format!("Storage {} mounted on unknown host {host_id}", s.id)
                    })?;
                }
                insert_tags(&tx, "storage", s.id, &s.tags)?;
            }
        }

        tx.commit()?;

        Ok(InventoryCounts {
            clusters: snapshot.clusters.len(),
            hosts: snapshot.hosts.len(),
            storages: snapshot.storages.len(),
        })
    }

    /// Read back the whole stored inventory.
    pub fn get_inventory(&self) -> Result<InventorySnapshot> {
        let conn = self.conn();

        let mut cluster_tags = load_tags(&conn, "cluster")?;
        let mut stmt = conn.prepare(&format!("SELECT {CLUSTER_COLUMNS} FROM clusters ORDER BY id"))?;
        let mut clusters = stmt.query_map([], map_cluster_row)?.collect::<Result<Vec<_>, _>>()?;
        for c in &mut clusters {
            c.tags = cluster_tags.remove(&c.id).unwrap_or_default();
        }

        let mut host_tags = load_tags(&conn, "host")?;
        let mut stmt = conn.prepare(&format!("SELECT {HOST_COLUMNS} FROM hosts ORDER BY id"))?;
        let mut hosts = stmt.query_map([], map_host_row)?.collect::<Result<Vec<_>, _>>()?;
        for h in &mut hosts {
            h.tags = host_tags.remove(&h.id).unwrap_or_default();
        }

        let mut storage_tags = load_tags(&conn, "storage")?;
        let mut mounts: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut stmt =
            conn.prepare("SELECT storage_id, host_id FROM host_storages ORDER BY storage_id, host_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (storage_id, host_id) = row?;
            mounts.entry(storage_id).or_default().push(host_id);
        }

        let mut stmt =
            conn.prepare(&format!("SELECT {STORAGE_COLUMNS} FROM storages s ORDER BY s.id"))?;
        let storages = stmt
            .query_map([], map_storage_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|mut s| {
                s.tags = storage_tags.remove(&s.id).unwrap_or_default();
                let host_ids = mounts.remove(&s.id).unwrap_or_default();
                MountedStorage { storage: s, host_ids }
            })
            .collect();

        Ok(InventorySnapshot { clusters, hosts, storages })
    }
}

impl InventoryProvider for Database {
    fn list_clusters(&self, ems_id: i64) -> Result<Vec<Cluster>> {
        let conn = self.conn();
        let mut tags = load_tags(&conn, "cluster")?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {CLUSTER_COLUMNS} FROM clusters WHERE ems_id = ?1 ORDER BY id"
        ))?;
        let mut clusters =
            stmt.query_map(params![ems_id], map_cluster_row)?.collect::<Result<Vec<_>, _>>()?;
        for c in &mut clusters {
            c.tags = tags.remove(&c.id).unwrap_or_default();
        }
        Ok(clusters)
    }

    fn find_cluster(&self, cluster_id: i64) -> Result<Option<Cluster>> {
        let conn = self.conn();
        let cluster = conn
            .query_row(
                &format!("SELECT {CLUSTER_COLUMNS} FROM clusters WHERE id = ?1"),
                params![cluster_id],
                map_cluster_row,
            )
            .optional()?;
        let Some(mut cluster) = cluster else {
            return Ok(None);
        };
        cluster.tags = load_tags(&conn, "cluster")?.remove(&cluster.id).unwrap_or_default();
        Ok(Some(cluster))
    }

    fn list_hosts(&self, scope: HostScope) -> Result<Vec<Host>> {
        let conn = self.conn();
        let mut tags = load_tags(&conn, "host")?;
        let (filter, id) = match scope {
            HostScope::Ems(ems_id) => ("ems_id", ems_id),
            HostScope::Cluster(cluster_id) => ("cluster_id", cluster_id),
        };
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts WHERE {filter} = ?1 ORDER BY id"
        ))?;
        let mut hosts = stmt.query_map(params![id], map_host_row)?.collect::<Result<Vec<_>, _>>()?;
        for h in &mut hosts {
            h.tags = tags.remove(&h.id).unwrap_or_default();
        }
        Ok(hosts)
    }

    fn list_storages(&self, host_id: i64) -> Result<Vec<Storage>> {
        let conn = self.conn();
        let mut tags = load_tags(&conn, "storage")?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {STORAGE_COLUMNS} FROM storages s
             JOIN host_storages hs ON hs.storage_id = s.id
             WHERE hs.host_id = ?1
             ORDER BY s.id"
        ))?;
        let mut storages =
            stmt.query_map(params![host_id], map_storage_row)?.collect::<Result<Vec<_>, _>>()?;
        for s in &mut storages {
            s.tags = tags.remove(&s.id).unwrap_or_default();
        }
        Ok(storages)
    }
}
