use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::AppResult;

pub mod migrations;

pub mod repositories;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Hands out short-lived connections to the local snapshot store.
///
/// The schema is migrated once when the pool is created; later connections
/// only get their per-connection pragmas.
#[derive(Clone, Debug)]
pub struct DbPool {
    path: PathBuf,
}

impl DbPool {
    pub fn new<P: Into<PathBuf>>(path: P) -> AppResult<Self> {
        let path = path.into();
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)?,
            _ => {}
        }

        let pool = Self { path };
        let conn = pool.get_connection()?;
        migrations::run(&conn)?;
        info!(
            target: "app::db",
            db_path = %pool.path.display(),
            schema_version = migrations::latest_version(),
            "snapshot store ready"
        );
        Ok(pool)
    }

    pub fn get_connection(&self) -> AppResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", 1)?;
        debug!(target: "app::db", db_path = %self.path.display(), "connection opened");
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, callback: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        callback(&self.get_connection()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
