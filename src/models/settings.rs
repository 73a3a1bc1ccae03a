use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};

const DEFAULT_SNAPSHOT_TTL_SECONDS: i64 = 300;
const DEFAULT_RESULT_CACHE_CAPACITY: usize = 32;
const DEFAULT_SNAPSHOT_RETENTION_DAYS: i64 = 30;
const MAX_SNAPSHOT_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const MAX_SNAPSHOT_RETENTION_DAYS: i64 = 10 * 366;
const DEFAULT_EXCLUDED_TEAM: &str = "Diretoria";
const DEFAULT_ORGANIZATIONS: [&str; 2] = ["Franqueadora", "Franquias"];

/// Target of one key-result team in the KPI taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TeamTargets {
    One(String),
    Many(Vec<String>),
}

impl TeamTargets {
    pub fn names(&self) -> Vec<&str> {
        match self {
            TeamTargets::One(name) => vec![name.as_str()],
            TeamTargets::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct KpiColumns {
    pub period: String,
    pub organization: String,
    pub team: String,
    pub indicator: String,
    pub target: String,
    pub result: String,
    pub attainment: String,
    pub status: String,
    pub unit: String,
    pub year: String,
}

impl Default for KpiColumns {
    fn default() -> Self {
        Self {
            period: "Período".to_string(),
            organization: "Organização".to_string(),
            team: "Equipe".to_string(),
            indicator: "Indicador".to_string(),
            target: "Meta".to_string(),
            result: "Realizado".to_string(),
            attainment: "Atingimento".to_string(),
            status: "Status".to_string(),
            unit: "Tipo".to_string(),
            year: "Data".to_string(),
        }
    }
}

impl KpiColumns {
    fn headers(&self) -> [(&'static str, &str); 10] {
        [
            ("period", self.period.as_str()),
            ("organization", self.organization.as_str()),
            ("team", self.team.as_str()),
            ("indicator", self.indicator.as_str()),
            ("target", self.target.as_str()),
            ("result", self.result.as_str()),
            ("attainment", self.attainment.as_str()),
            ("status", self.status.as_str()),
            ("unit", self.unit.as_str()),
            ("year", self.year.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct KeyResultColumns {
    pub date: String,
    pub team: String,
    pub key: String,
    pub objective: String,
    pub key_result: String,
    pub target: String,
    pub result: String,
    pub attainment: String,
}

impl Default for KeyResultColumns {
    fn default() -> Self {
        Self {
            date: "Data".to_string(),
            team: "Equipe".to_string(),
            key: "Chave".to_string(),
            objective: "Objetivo".to_string(),
            key_result: "Resultado-Chave".to_string(),
            target: "Meta".to_string(),
            result: "Realizado".to_string(),
            attainment: "Atingimento".to_string(),
        }
    }
}

impl KeyResultColumns {
    fn headers(&self) -> [(&'static str, &str); 8] {
        [
            ("date", self.date.as_str()),
            ("team", self.team.as_str()),
            ("key", self.key.as_str()),
            ("objective", self.objective.as_str()),
            ("key_result", self.key_result.as_str()),
            ("target", self.target.as_str()),
            ("result", self.result.as_str()),
            ("attainment", self.attainment.as_str()),
        ]
    }
}

/// Injected configuration for the reporting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct ReportingConfig {
    pub allowed_organizations: Vec<String>,
    pub excluded_team: Option<String>,
    /// Key-result team name to KPI team name(s); `null` excludes the team.
    pub team_mapping: BTreeMap<String, Option<TeamTargets>>,
    pub kpi_columns: KpiColumns,
    pub key_result_columns: KeyResultColumns,
    pub snapshot_ttl_seconds: i64,
    pub result_cache_capacity: usize,
    pub snapshot_retention_days: i64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            allowed_organizations: DEFAULT_ORGANIZATIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            excluded_team: Some(DEFAULT_EXCLUDED_TEAM.to_string()),
            team_mapping: BTreeMap::new(),
            kpi_columns: KpiColumns::default(),
            key_result_columns: KeyResultColumns::default(),
            snapshot_ttl_seconds: DEFAULT_SNAPSHOT_TTL_SECONDS,
            result_cache_capacity: DEFAULT_RESULT_CACHE_CAPACITY,
            snapshot_retention_days: DEFAULT_SNAPSHOT_RETENTION_DAYS,
        }
    }
}

impl ReportingConfig {
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        let config: ReportingConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&raw)?;
        info!(
            target: "app::config",
            path = %path.display(),
            mapped_teams = config.team_mapping.len(),
            "reporting configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.allowed_organizations.iter().all(|org| org.trim().is_empty()) {
            return Err(AppError::config("allowed_organizations must not be empty"));
        }
        if !(1..=MAX_SNAPSHOT_TTL_SECONDS).contains(&self.snapshot_ttl_seconds) {
            return Err(AppError::config(format!(
                "snapshot_ttl_seconds must be between 1 and {MAX_SNAPSHOT_TTL_SECONDS}"
            )));
        }
        if self.result_cache_capacity == 0 {
            return Err(AppError::config("result_cache_capacity must be positive"));
        }
        if !(1..=MAX_SNAPSHOT_RETENTION_DAYS).contains(&self.snapshot_retention_days) {
            return Err(AppError::config(format!(
                "snapshot_retention_days must be between 1 and {MAX_SNAPSHOT_RETENTION_DAYS}"
            )));
        }

        let blank_kpi = self
            .kpi_columns
            .headers()
            .into_iter()
            .filter(|(_, header)| header.trim().is_empty())
            .map(|(field, _)| field);
        let blank_kr = self
            .key_result_columns
            .headers()
            .into_iter()
            .filter(|(_, header)| header.trim().is_empty())
            .map(|(field, _)| field);
        let blank: Vec<&str> = blank_kpi.chain(blank_kr).collect();
        if !blank.is_empty() {
            return Err(AppError::validation_with_details(
                "column headers must not be blank",
                serde_json::json!({ "fields": blank }),
            ));
        }

        Ok(())
    }
}
