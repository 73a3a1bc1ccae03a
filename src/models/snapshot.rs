use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::key_result::KeyResultRecord;
use crate::models::kpi::KpiRecord;
use crate::models::period::Period;

/// Untyped spreadsheet rows; the first row holds the headers.
pub type RawTable = Vec<Vec<JsonValue>>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Kpi,
    KeyResult,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Kpi => "kpi",
            SnapshotKind::KeyResult => "key_result",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, String> {
        match value {
            "kpi" => Ok(SnapshotKind::Kpi),
            "key_result" => Ok(SnapshotKind::KeyResult),
            other => Err(format!("invalid snapshot kind: {other}")),
        }
    }
}

/// Typed output of one normalization pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSnapshot {
    pub kpi_records: Vec<KpiRecord>,
    pub key_result_records: Vec<KeyResultRecord>,
    /// Distinct key-result months, most recent first.
    pub available_periods: Vec<Period>,
}

impl NormalizedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.kpi_records.is_empty() && self.key_result_records.is_empty()
    }
}

/// Raw table persisted by the snapshot store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub id: String,
    pub kind: SnapshotKind,
    pub source_name: Option<String>,
    pub fingerprint: String,
    pub rows: RawTable,
    pub fetched_at: DateTime<Utc>,
}
