use std::collections::{BTreeSet, HashMap};

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::models::key_result::KeyResultRecord;
use crate::models::kpi::{KpiRecord, KpiStatus, UnitKind};
use crate::models::period::Period;
use crate::models::settings::{KeyResultColumns, KpiColumns, ReportingConfig};
use crate::models::snapshot::NormalizedSnapshot;
use crate::services::value_interpreter::{
    cell_number, cell_text, parse_attainment, parse_date, parse_percent, parse_period, parse_year, scaled_value,
};

static NULL_CELL: JsonValue = JsonValue::Null;

/// Trimmed header name to column position; the first occurrence wins.
#[derive(Debug, Default)]
struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn from_row(headers: &[JsonValue]) -> Self {
        let mut positions = HashMap::new();
        for (index, cell) in headers.iter().enumerate() {
            let name = cell_text(cell);
            if !name.is_empty() {
                positions.entry(name).or_insert(index);
            }
        }
        Self { positions }
    }

    fn column(&self, header: &str) -> Option<usize> {
        let column = self.positions.get(header.trim()).copied();
        if column.is_none() {
            debug!(target: "app::normalizer", header, "column not found; field will default");
        }
        column
    }
}

fn cell(row: &[JsonValue], column: Option<usize>) -> &JsonValue {
    column.and_then(|index| row.get(index)).unwrap_or(&NULL_CELL)
}

struct KpiColumnIndex {
    period: Option<usize>,
    organization: Option<usize>,
    team: Option<usize>,
    indicator: Option<usize>,
    target: Option<usize>,
    result: Option<usize>,
    attainment: Option<usize>,
    status: Option<usize>,
    unit: Option<usize>,
    year: Option<usize>,
}

impl KpiColumnIndex {
    fn resolve(headers: &HeaderIndex, columns: &KpiColumns) -> Self {
        Self {
            period: headers.column(&columns.period),
            organization: headers.column(&columns.organization),
            team: headers.column(&columns.team),
            indicator: headers.column(&columns.indicator),
            target: headers.column(&columns.target),
            result: headers.column(&columns.result),
            attainment: headers.column(&columns.attainment),
            status: headers.column(&columns.status),
            unit: headers.column(&columns.unit),
            year: headers.column(&columns.year),
        }
    }
}

struct KeyResultColumnIndex {
    date: Option<usize>,
    team: Option<usize>,
    key: Option<usize>,
    objective: Option<usize>,
    key_result: Option<usize>,
    target: Option<usize>,
    result: Option<usize>,
    attainment: Option<usize>,
}

impl KeyResultColumnIndex {
    fn resolve(headers: &HeaderIndex, columns: &KeyResultColumns) -> Self {
        Self {
            date: headers.column(&columns.date),
            team: headers.column(&columns.team),
            key: headers.column(&columns.key),
            objective: headers.column(&columns.objective),
            key_result: headers.column(&columns.key_result),
            target: headers.column(&columns.target),
            result: headers.column(&columns.result),
            attainment: headers.column(&columns.attainment),
        }
    }
}

/// Turns raw sheet rows into typed records. Invalid rows are dropped, never reported.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    kpi_columns: KpiColumns,
    key_result_columns: KeyResultColumns,
    allowed_organizations: Vec<String>,
}

impl RecordNormalizer {
    pub fn new(config: &ReportingConfig) -> Self {
        Self {
            kpi_columns: config.kpi_columns.clone(),
            key_result_columns: config.key_result_columns.clone(),
            allowed_organizations: config
                .allowed_organizations
                .iter()
                .map(|org| org.trim().to_lowercase())
                .filter(|org| !org.is_empty())
                .collect(),
        }
    }

    pub fn normalize(
        &self,
        raw_kpi_rows: &[Vec<JsonValue>],
        raw_key_result_rows: &[Vec<JsonValue>],
    ) -> NormalizedSnapshot {
        let kpi_records = self.normalize_kpi(raw_kpi_rows);
        let key_result_records = self.normalize_key_results(raw_key_result_rows);
        let available_periods = available_periods(&key_result_records);

        debug!(
            target: "app::normalizer",
            kpi_records = kpi_records.len(),
            key_result_records = key_result_records.len(),
            periods = available_periods.len(),
            "normalization pass complete"
        );

        NormalizedSnapshot {
            kpi_records,
            key_result_records,
            available_periods,
        }
    }

    pub fn normalize_kpi(&self, rows: &[Vec<JsonValue>]) -> Vec<KpiRecord> {
        let Some((headers, body)) = rows.split_first() else {
            return Vec::new();
        };
        let columns = KpiColumnIndex::resolve(&HeaderIndex::from_row(headers), &self.kpi_columns);

        let records: Vec<KpiRecord> = body
            .iter()
            .filter_map(|row| self.kpi_from_row(row, &columns))
            .collect();

        let dropped = body.len() - records.len();
        if dropped > 0 {
            debug!(target: "app::normalizer", dropped, "kpi rows dropped by validity filter");
        }
        records
    }

    pub fn normalize_key_results(&self, rows: &[Vec<JsonValue>]) -> Vec<KeyResultRecord> {
        let Some((headers, body)) = rows.split_first() else {
            return Vec::new();
        };
        let columns = KeyResultColumnIndex::resolve(
            &HeaderIndex::from_row(headers),
            &self.key_result_columns,
        );

        let records: Vec<KeyResultRecord> = body
            .iter()
            .filter_map(|row| key_result_from_row(row, &columns))
            .collect();

        let dropped = body.len() - records.len();
        if dropped > 0 {
            debug!(target: "app::normalizer", dropped, "key-result rows dropped by validity filter");
        }
        records
    }

    fn kpi_from_row(&self, row: &[JsonValue], columns: &KpiColumnIndex) -> Option<KpiRecord> {
        let organization = cell_text(cell(row, columns.organization));
        if !self.is_allowed_organization(&organization) {
            return None;
        }
        let team = cell_text(cell(row, columns.team));
        if team.is_empty() {
            return None;
        }
        let year = parse_year(cell(row, columns.year))?;

        let unit_kind = UnitKind::from_label(&cell_text(cell(row, columns.unit)));

        Some(KpiRecord {
            period: parse_period(cell(row, columns.period)),
            organization,
            team,
            indicator_name: cell_text(cell(row, columns.indicator)),
            target_value: scaled_value(cell(row, columns.target), unit_kind),
            result_value: scaled_value(cell(row, columns.result), unit_kind),
            attainment_ratio: parse_attainment(cell(row, columns.attainment)),
            status: KpiStatus::from_label(&cell_text(cell(row, columns.status))),
            unit_kind,
            year: Some(year),
        })
    }

    fn is_allowed_organization(&self, organization: &str) -> bool {
        let organization = organization.trim().to_lowercase();
        !organization.is_empty() && self.allowed_organizations.contains(&organization)
    }
}

fn key_result_from_row(row: &[JsonValue], columns: &KeyResultColumnIndex) -> Option<KeyResultRecord> {
    let date = parse_date(cell(row, columns.date))?;
    let team = cell_text(cell(row, columns.team));
    if team.is_empty() {
        return None;
    }

    let objective = cell_text(cell(row, columns.objective));
    let key_result = cell_text(cell(row, columns.key_result));
    let unique_key =
        KeyResultRecord::compose_key(&cell_text(cell(row, columns.key)), &objective, &key_result);

    Some(KeyResultRecord {
        date,
        team,
        unique_key,
        objective,
        key_result,
        target_value: cell_number(cell(row, columns.target)),
        result_value: cell_number(cell(row, columns.result)),
        attainment_percent: parse_percent(cell(row, columns.attainment)),
    })
}

fn available_periods(records: &[KeyResultRecord]) -> Vec<Period> {
    let periods: BTreeSet<Period> = records.iter().map(KeyResultRecord::period).collect();
    periods.into_iter().rev().collect()
}
