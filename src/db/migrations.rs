//! Ordered schema steps tracked by `PRAGMA user_version`.
//!
//! Each step runs in its own transaction together with its history row, so
//! a failed step leaves the previous version intact.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::error::{AppError, AppResult};

const SCHEMA_SQL: &str = include_str!("schema.sql");

struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Create raw snapshot store",
    sql: SCHEMA_SQL,
}];

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: i32,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

pub fn latest_version() -> i32 {
    MIGRATIONS.last().map(|migration| migration.version).unwrap_or(0)
}

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current > latest_version() {
        return Err(AppError::database(format!(
            "database schema v{current} is newer than supported v{}",
            latest_version()
        )));
    }

    for migration in MIGRATIONS.iter().filter(|migration| migration.version > current) {
        info!(
            target: "app::db",
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT OR REPLACE INTO migration_history (version, description, applied_at) VALUES (?1, ?2, ?3)",
            (migration.version, migration.description, Utc::now().to_rfc3339()),
        )?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
    }

    Ok(())
}

pub fn get_migration_history(conn: &Connection) -> AppResult<Vec<MigrationInfo>> {
    let mut stmt =
        conn.prepare("SELECT version, description, applied_at FROM migration_history ORDER BY version")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (version, description, applied_at) = row?;
        let applied_at = DateTime::parse_from_rfc3339(&applied_at)
            .map_err(|err| AppError::database(format!("invalid applied_at for v{version}: {err}")))?
            .with_timezone(&Utc);
        history.push(MigrationInfo {
            version,
            description,
            applied_at,
        });
    }
    Ok(history)
}
