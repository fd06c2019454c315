//! SQLite persistence for dataset versions.
//!
//! RULE: Only store.rs talks to the database.
//! The ingestion pipeline never persists anything itself; hosts hand a
//! finished DatasetVersion to the store.

use crate::{
    dataset::{DatasetVersion, VersionSummary},
    error::IngestResult,
    event::{EventLogEntry, IngestEvent},
    record::DeveloperRecord,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct VersionStore {
    conn: Connection,
}

impl VersionStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> IngestResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only applies to real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> IngestResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> IngestResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_datasets.sql"))?;
        Ok(())
    }

    // ── Versions ───────────────────────────────────────────────

    pub fn insert_version(&self, version: &DatasetVersion) -> IngestResult<()> {
        let records_json = serde_json::to_string(&version.data)?;
        self.conn.execute(
            "INSERT INTO dataset_version (version_id, file_name, uploaded_at, record_count, records_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                version.id,
                version.file_name,
                version.upload_date.to_rfc3339(),
                version.record_count as i64,
                records_json,
            ],
        )?;
        Ok(())
    }

    pub fn load_version(&self, version_id: &str) -> IngestResult<Option<DatasetVersion>> {
        let row = self
            .conn
            .query_row(
                "SELECT version_id, file_name, uploaded_at, record_count, records_json
                 FROM dataset_version WHERE version_id = ?1",
                params![version_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, file_name, uploaded_at, record_count, records_json)) = row else {
            return Ok(None);
        };
        let data: Vec<DeveloperRecord> = serde_json::from_str(&records_json)?;
        Ok(Some(DatasetVersion {
            id,
            file_name,
            upload_date: parse_stamp(&uploaded_at)?,
            record_count: record_count as usize,
            data,
        }))
    }

    /// Version metadata, newest upload first.
    pub fn list_versions(&self) -> IngestResult<Vec<VersionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT version_id, file_name, uploaded_at, record_count
             FROM dataset_version ORDER BY uploaded_at DESC, version_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, file_name, uploaded_at, record_count)| {
                Ok(VersionSummary {
                    id,
                    file_name,
                    upload_date: parse_stamp(&uploaded_at)?,
                    record_count: record_count as usize,
                })
            })
            .collect()
    }

    /// Returns true when a version was removed. Its events go with it.
    pub fn delete_version(&self, version_id: &str) -> IngestResult<bool> {
        self.conn.execute(
            "DELETE FROM event_log WHERE version_id = ?1",
            params![version_id],
        )?;
        let removed = self.conn.execute(
            "DELETE FROM dataset_version WHERE version_id = ?1",
            params![version_id],
        )?;
        Ok(removed > 0)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, version_id: &str, event: &IngestEvent) -> IngestResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (version_id, event_type, payload) VALUES (?1, ?2, ?3)",
            params![version_id, event.type_name(), serde_json::to_string(event)?],
        )?;
        Ok(())
    }

    pub fn events_for_version(&self, version_id: &str) -> IngestResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, version_id, event_type, payload
             FROM event_log WHERE version_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![version_id], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    version_id: row.get(1)?,
                    event_type: row.get(2)?,
                    payload: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, version_id: &str) -> IngestResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE version_id = ?1",
            params![version_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_stamp(s: &str) -> IngestResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow::anyhow!("Bad upload timestamp '{s}': {e}").into())
}
