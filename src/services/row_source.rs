use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::snapshot::RawTable;

/// Supplier of raw sheet rows. Fetching, retries and transport live behind it.
pub trait RowSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_kpi_rows(&self) -> AppResult<RawTable>;

    fn fetch_key_result_rows(&self) -> AppResult<RawTable>;
}

/// In-memory tables, swappable to simulate an upstream refresh.
#[derive(Debug, Default)]
pub struct StaticRowSource {
    tables: RwLock<(RawTable, RawTable)>,
}

impl StaticRowSource {
    pub fn new(kpi_rows: RawTable, key_result_rows: RawTable) -> Self {
        Self {
            tables: RwLock::new((kpi_rows, key_result_rows)),
        }
    }

    pub fn replace(&self, kpi_rows: RawTable, key_result_rows: RawTable) -> AppResult<()> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| AppError::other("static row source lock poisoned"))?;
        *guard = (kpi_rows, key_result_rows);
        Ok(())
    }
}

impl RowSource for StaticRowSource {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch_kpi_rows(&self) -> AppResult<RawTable> {
        self.tables
            .read()
            .map(|guard| guard.0.clone())
            .map_err(|_| AppError::other("static row source lock poisoned"))
    }

    fn fetch_key_result_rows(&self) -> AppResult<RawTable> {
        self.tables
            .read()
            .map(|guard| guard.1.clone())
            .map_err(|_| AppError::other("static row source lock poisoned"))
    }
}

/// Two JSON files, each an array of row arrays as exported from the sheets.
#[derive(Debug, Clone)]
pub struct JsonFileRowSource {
    kpi_path: PathBuf,
    key_result_path: PathBuf,
}

impl JsonFileRowSource {
    pub fn new(kpi_path: impl Into<PathBuf>, key_result_path: impl Into<PathBuf>) -> Self {
        Self {
            kpi_path: kpi_path.into(),
            key_result_path: key_result_path.into(),
        }
    }

    fn read_table(&self, path: &Path) -> AppResult<RawTable> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::source_unavailable(self.name(), format!("{}: {err}", path.display()))
        })?;
        let table: RawTable = serde_json::from_str(&raw)?;
        debug!(
            target: "app::reporting",
            path = %path.display(),
            rows = table.len(),
            "raw table loaded from file"
        );
        Ok(table)
    }
}

impl RowSource for JsonFileRowSource {
    fn name(&self) -> &str {
        "json-file"
    }

    fn fetch_kpi_rows(&self) -> AppResult<RawTable> {
        self.read_table(&self.kpi_path)
    }

    fn fetch_key_result_rows(&self) -> AppResult<RawTable> {
        self.read_table(&self.key_result_path)
    }
}
