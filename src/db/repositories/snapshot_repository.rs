use std::convert::TryFrom;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::snapshot::{RawTable, SnapshotKind, StoredSnapshot};

#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: String,
    pub kind: String,
    pub source_name: Option<String>,
    pub fingerprint: String,
    pub rows_json: String,
    pub row_count: i64,
    pub fetched_at: String,
}

impl SnapshotRow {
    pub fn into_stored(self) -> AppResult<StoredSnapshot> {
        let kind = SnapshotKind::from_str(&self.kind).map_err(AppError::validation)?;
        let rows: RawTable = serde_json::from_str(&self.rows_json)?;
        let fetched_at = DateTime::parse_from_rfc3339(&self.fetched_at)
            .map_err(|err| AppError::validation(format!("invalid fetched_at: {err}")))?
            .with_timezone(&Utc);

        Ok(StoredSnapshot {
            id: self.id,
            kind,
            source_name: self.source_name,
            fingerprint: self.fingerprint,
            rows,
            fetched_at,
        })
    }
}

impl TryFrom<&Row<'_>> for SnapshotRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            source_name: row.get("source_name")?,
            fingerprint: row.get("fingerprint")?,
            rows_json: row.get("rows_json")?,
            row_count: row.get("row_count")?,
            fetched_at: row.get("fetched_at")?,
        })
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct SnapshotRepository;

impl SnapshotRepository {
    pub fn insert(
        conn: &Connection,
        kind: SnapshotKind,
        source_name: &str,
        fingerprint: &str,
        rows: &RawTable,
        fetched_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let rows_json = serde_json::to_string(rows)?;

        conn.execute(
            r#"
                INSERT INTO raw_snapshots (
                    id,
                    kind,
                    source_name,
                    fingerprint,
                    rows_json,
                    row_count,
                    fetched_at
                ) VALUES (
                    :id,
                    :kind,
                    :source_name,
                    :fingerprint,
                    :rows_json,
                    :row_count,
                    :fetched_at
                )
            "#,
            named_params! {
                ":id": &id,
                ":kind": kind.as_str(),
                ":source_name": source_name,
                ":fingerprint": fingerprint,
                ":rows_json": &rows_json,
                ":row_count": rows.len() as i64,
                ":fetched_at": timestamp(fetched_at),
            },
        )?;

        debug!(
            target: "app::db",
            id = %id,
            kind = kind.as_str(),
            rows = rows.len(),
            "raw snapshot stored"
        );
        Ok(id)
    }

    /// Most recently fetched snapshot of `kind`, if any.
    pub fn latest(conn: &Connection, kind: SnapshotKind) -> AppResult<Option<StoredSnapshot>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, kind, source_name, fingerprint, rows_json, row_count, fetched_at
                FROM raw_snapshots
                WHERE kind = :kind
                ORDER BY fetched_at DESC, rowid DESC
                LIMIT 1
            "#,
        )?;

        let row = stmt
            .query_row(named_params! { ":kind": kind.as_str() }, |row| {
                SnapshotRow::try_from(row)
            })
            .optional()?;

        row.map(SnapshotRow::into_stored).transpose()
    }

    pub fn latest_fingerprint(conn: &Connection, kind: SnapshotKind) -> AppResult<Option<String>> {
        let fingerprint = conn
            .query_row(
                r#"
                    SELECT fingerprint FROM raw_snapshots
                    WHERE kind = :kind
                    ORDER BY fetched_at DESC, rowid DESC
                    LIMIT 1
                "#,
                named_params! { ":kind": kind.as_str() },
                |row| row.get(0),
            )
            .optional()?;
        Ok(fingerprint)
    }

    /// Deletes snapshots fetched before `cutoff`. The newest snapshot of each
    /// kind is always kept.
    pub fn prune_before(conn: &Connection, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let removed = conn.execute(
            r#"
                DELETE FROM raw_snapshots
                WHERE fetched_at < :cutoff
                  AND id NOT IN (
                      SELECT (
                          SELECT newest.id FROM raw_snapshots AS newest
                          WHERE newest.kind = kinds.kind
                          ORDER BY newest.fetched_at DESC, newest.rowid DESC
                          LIMIT 1
                      )
                      FROM (SELECT DISTINCT kind FROM raw_snapshots) AS kinds
                  )
            "#,
            named_params! { ":cutoff": timestamp(cutoff) },
        )?;

        if removed > 0 {
            debug!(target: "app::db", removed, "pruned raw snapshots");
        }
        Ok(removed)
    }

    pub fn count(conn: &Connection, kind: SnapshotKind) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM raw_snapshots WHERE kind = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
