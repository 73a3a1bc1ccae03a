use serde::{Deserialize, Serialize};

use crate::models::period::Period;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Finalized,
    Pending,
    Other,
}

impl KpiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KpiStatus::Finalized => "finalized",
            KpiStatus::Pending => "pending",
            KpiStatus::Other => "other",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "finalizado" | "finalizada" | "finalized" | "concluído" | "concluido" => {
                KpiStatus::Finalized
            }
            "pendente" | "pending" | "em andamento" => KpiStatus::Pending,
            _ => KpiStatus::Other,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, KpiStatus::Finalized)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Currency,
    Percentage,
    Integer,
    Decimal,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Currency => "currency",
            UnitKind::Percentage => "percentage",
            UnitKind::Integer => "integer",
            UnitKind::Decimal => "decimal",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "moeda" | "currency" | "r$" | "monetário" | "monetario" => UnitKind::Currency,
            "%" | "percentual" | "percentage" | "porcentagem" => UnitKind::Percentage,
            "inteiro" | "integer" | "quantidade" | "número" | "numero" => UnitKind::Integer,
            _ => UnitKind::Decimal,
        }
    }

    /// Brings a parsed target/result value into fraction space.
    pub fn apply_scale(&self, value: f64) -> f64 {
        match self {
            UnitKind::Percentage => value / 100.0,
            _ => value,
        }
    }
}

impl Default for UnitKind {
    fn default() -> Self {
        UnitKind::Decimal
    }
}

/// One observation of one indicator for one team in one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    pub period: Option<Period>,
    pub organization: String,
    pub team: String,
    pub indicator_name: String,
    pub target_value: f64,
    pub result_value: f64,
    /// `None` means not measured yet; `Some(0.0)` is a measured zero.
    pub attainment_ratio: Option<f64>,
    pub status: KpiStatus,
    pub unit_kind: UnitKind,
    pub year: Option<i32>,
}

impl KpiRecord {
    pub fn is_finalized(&self) -> bool {
        self.status.is_finalized()
    }
}
