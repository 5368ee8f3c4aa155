use super::models::{ProvisioningRequestRecord, RequestStatus};
use super::optional_ext::OptionalExt;
use super::Database;
use crate::placement::{ObjectRef, PlacementRequest, ProvisioningRequestSink};
use anyhow::{bail, Result};
use rusqlite::params;

const REQUEST_COLUMNS: &str = "id, requester, template_id, template_name, vendor, \
     requested_storage_bytes, requested_memory, requested_cpu, status, \
     cluster_id, cluster_name, host_id, host_name, storage_id, storage_name, \
     error_kind, error_message, created_at, updated_at";

fn object_ref(id: Option<i64>, name: Option<String>) -> Option<ObjectRef> {
    id.map(|id| ObjectRef { id, name: name.unwrap_or_default() })
}

fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProvisioningRequestRecord> {
    let status_str: String = row.get(8)?;
    let status = RequestStatus::try_from(status_str.as_str()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::from(e))
    })?;
    Ok(ProvisioningRequestRecord {
        id: row.get(0)?,
        requester: row.get(1)?,
        template_id: row.get(2)?,
        template_name: row.get(3)?,
        vendor: row.get(4)?,
        requested_storage_bytes: row.get::<_, i64>(5)? as u64,
        requested_memory: row.get::<_, i64>(6)? as u64,
        requested_cpu: row.get::<_, i64>(7)? as u64,
        status,
        cluster: object_ref(row.get(9)?, row.get(10)?),
        host: object_ref(row.get(11)?, row.get(12)?),
        storage: object_ref(row.get(13)?, row.get(14)?),
        error_kind: row.get(15)?,
        error_message: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

impl Database {
    /// Store a new pending provisioning request and return its id.
    pub fn create_request(&self, request: &PlacementRequest) -> Result<i64> {
        let conn = self.conn();
        let (template_id, template_name) = request
            .template
            .as_ref()
            .map_or((None, None), |t| (Some(t.id), Some(t.name.as_str())));
        conn.execute(
            "INSERT INTO provisioning_requests \
             (requester, template_id, template_name, vendor, requested_storage_bytes, \
             requested_memory, requested_cpu)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                request.requester,
                template_id,
                template_name,
                request.vendor.to_string(),
                request.requested_storage_bytes as i64,
                request.requested_memory as i64,
                request.requested_cpu as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_request(&self, id: i64) -> Result<Option<ProvisioningRequestRecord>> {
        let conn = self.conn();
        let record = conn
            .query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM provisioning_requests WHERE id = ?1"),
                params![id],
                map_request_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Record why placement failed for a request.
    pub fn fail_request(&self, id: i64, kind: &str, message: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE provisioning_requests \
             SET status = ?1, error_kind = ?2, error_message = ?3, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') \
             WHERE id = ?4",
            params![RequestStatus::Failed.as_str(), kind, message, id],
        )?;
        Ok(())
    }

    /// Run one assignment update, failing if the request row is gone.
    fn assign(&self, id: i64, sql: &str, object: &ObjectRef) -> Result<()> {
        let conn = self.conn();
        let updated = conn.execute(sql, params![object.id, object.name, id])?;
        if updated == 0 {
            bail!("provisioning request {id} not found");
        }
        Ok(())
    }
}

/// Writes placement results into one stored provisioning request.
pub(crate) struct RequestSink<'a> {
    pub db: &'a Database,
    pub request_id: i64,
}

impl ProvisioningRequestSink for RequestSink<'_> {
    fn set_cluster(&mut self, cluster: &ObjectRef) -> Result<()> {
        self.db.assign(
            self.request_id,
            "UPDATE provisioning_requests SET cluster_id = ?1, cluster_name = ?2, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE id = ?3",
            cluster,
        )
    }

    fn set_host(&mut self, host: &ObjectRef) -> Result<()> {
        self.db.assign(
            self.request_id,
            "UPDATE provisioning_requests SET host_id = ?1, host_name = ?2, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE id = ?3",
            host,
        )
    }

    /// Storage is written last, so it also marks the request placed.
    fn set_storage(&mut self, storage: &ObjectRef) -> Result<()> {
        self.db.assign(
            self.request_id,
            "UPDATE provisioning_requests SET storage_id = ?1, storage_name = ?2, \
             status = 'placed', updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE id = ?3",
            storage,
        )
    }
}
