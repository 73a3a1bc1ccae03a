use serde::{Deserialize, Serialize};

use crate::models::period::Period;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamPerformanceSummary {
    pub team: String,
    pub mean_kpi_attainment: Option<f64>,
    pub mean_key_result_attainment: Option<f64>,
    /// Mean over the union of KPI and key-result contributions.
    pub mean_overall_attainment: f64,
    pub indicator_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnualAggregate {
    pub year: i32,
    pub target_sum: f64,
    pub result_sum: f64,
    pub ratio: f64,
}

impl AnnualAggregate {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            target_sum: 0.0,
            result_sum: 0.0,
            ratio: 0.0,
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.ratio = if self.target_sum > 0.0 {
            self.result_sum / self.target_sum
        } else {
            0.0
        };
        self
    }
}

/// Resolved value of one indicator for a team's indicator table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResolution {
    pub indicator_name: String,
    pub value: Option<f64>,
    pub source_period: Option<Period>,
    pub is_fallback: bool,
}
