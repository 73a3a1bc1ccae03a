use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::period::Period;

/// One dated observation of a key result for one team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyResultRecord {
    pub date: NaiveDate,
    pub team: String,
    /// Explicit key column, or `objective::key_result` when that column is blank.
    pub unique_key: String,
    pub objective: String,
    pub key_result: String,
    pub target_value: f64,
    pub result_value: f64,
    /// 0–100 scale.
    pub attainment_percent: f64,
}

impl KeyResultRecord {
    pub fn period(&self) -> Period {
        Period::from_date(self.date)
    }

    pub fn compose_key(explicit: &str, objective: &str, key_result: &str) -> String {
        let explicit = explicit.trim();
        if explicit.is_empty() {
            format!("{}::{}", objective.trim(), key_result.trim())
        } else {
            explicit.to_string()
        }
    }
}
