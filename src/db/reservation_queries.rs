use super::models::{NewReservation, Reservation, ReservationStatus};
use super::optional_ext::OptionalExt;
use super::Database;
use crate::placement::LedgerSnapshot;
use anyhow::{Context, Result};
use rusqlite::params;

const RESERVATION_COLUMNS: &str = "id, request_id, host_id, storage_id, memory, cpu, \
     storage_bytes, vm_ids, status, created_at, released_at";

fn map_reservation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reservation> {
    let vm_ids_json: String = row.get(7)?;
    let vm_ids: Vec<String> = serde_json::from_str(&vm_ids_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status_str: String = row.get(8)?;
    let status = ReservationStatus::try_from(status_str.as_str()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::from(e))
    })?;
    Ok(Reservation {
        id: row.get(0)?,
        request_id: row.get(1)?,
        host_id: row.get(2)?,
        storage_id: row.get(3)?,
        memory: row.get::<_, i64>(4)? as u64,
        cpu: row.get::<_, i64>(5)? as u64,
        storage_bytes: row.get::<_, i64>(6)? as u64,
        vm_ids,
        status,
        created_at: row.get(9)?,
        released_at: row.get(10)?,
    })
}

impl Database {
    /// Record resources held by a provisioning operation that has not finished yet.
    pub fn open_reservation(&self, new: &NewReservation) -> Result<Reservation> {
        let vm_ids = serde_json::to_string(&new.vm_ids).context("Failed to encode VM ids")?;
        let conn = self.conn();
        let reservation = conn.query_row(
            &format!(
                "INSERT INTO reservations \
                 (request_id, host_id, storage_id, memory, cpu, storage_bytes, vm_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {RESERVATION_COLUMNS}"
            ),
            params![
                new.request_id,
                new.host_id,
                new.storage_id,
                new.memory as i64,
                new.cpu as i64,
                new.storage_bytes as i64,
                vm_ids,
            ],
            map_reservation_row,
        )?;
        Ok(reservation)
    }

    /// Mark a reservation released. Returns `None` if it does not exist;
    /// releasing twice keeps the first release time.
    pub fn release_reservation(&self, id: i64) -> Result<Option<Reservation>> {
        let conn = self.conn();
        conn.execute(
            "UPDATE reservations \
             SET status = 'released', released_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') \
             WHERE id = ?1 AND status = 'active'",
            params![id],
        )?;
        let reservation = conn
            .query_row(
                &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1"),
                params![id],
                map_reservation_row,
            )
            .optional()?;
        Ok(reservation)
    }

    pub fn list_active_reservations(&self) -> Result<Vec<Reservation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE status = ?1 ORDER BY id"
        ))?;
        let reservations = stmt
            .query_map(params![ReservationStatus::Active.as_str()], map_reservation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reservations)
    }

    /// Aggregate every active reservation. One read per placement decision.
    pub fn ledger_snapshot(&self) -> Result<LedgerSnapshot> {
        let mut snapshot = LedgerSnapshot::empty();
        for r in self.list_active_reservations()? {
            snapshot.add(&r.to_active());
        }
        Ok(snapshot)
    }
}
