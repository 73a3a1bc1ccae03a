use tracing::trace;

use crate::models::kpi::KpiRecord;
use crate::models::performance::IndicatorResolution;
use crate::models::period::Period;

/// Point-in-time lookup of KPI attainment with nearest-prior-period fallback.
pub struct TemporalResolver<'a> {
    records: &'a [KpiRecord],
}

struct Resolved<'a> {
    record: &'a KpiRecord,
    period: Period,
    exact: bool,
}

impl<'a> TemporalResolver<'a> {
    pub fn new(records: &'a [KpiRecord]) -> Self {
        Self { records }
    }

    /// Attainment for `team` + `indicator` at `target`.
    ///
    /// An exact-period record always wins, even when its attainment is `None`.
    /// Otherwise the most recent period before `target` is used. When two
    /// finalized records share a period the later one in input order wins.
    pub fn resolve_value(&self, team: &str, indicator: &str, target: Period) -> Option<f64> {
        self.resolve(team, indicator, target)
            .and_then(|resolved| resolved.record.attainment_ratio)
    }

    /// One resolution per distinct indicator of `team`, in encounter order.
    pub fn resolve_team_indicators(&self, team: &str, target: Period) -> Vec<IndicatorResolution> {
        let mut indicators: Vec<&str> = Vec::new();
        for record in self.records.iter().filter(|record| record.team == team) {
            if !indicators.contains(&record.indicator_name.as_str()) {
                indicators.push(record.indicator_name.as_str());
            }
        }

        indicators
            .into_iter()
            .map(|indicator| match self.resolve(team, indicator, target) {
                Some(resolved) => IndicatorResolution {
                    indicator_name: indicator.to_string(),
                    value: resolved.record.attainment_ratio,
                    source_period: Some(resolved.period),
                    is_fallback: !resolved.exact,
                },
                None => IndicatorResolution {
                    indicator_name: indicator.to_string(),
                    value: None,
                    source_period: None,
                    is_fallback: false,
                },
            })
            .collect()
    }

    fn resolve(&self, team: &str, indicator: &str, target: Period) -> Option<Resolved<'a>> {
        let mut exact: Option<&KpiRecord> = None;
        let mut prior: Option<(Period, &KpiRecord)> = None;

        let records: &'a [KpiRecord] = self.records;
        let candidates = records.iter().filter(|record| {
            record.is_finalized() && record.team == team && record.indicator_name == indicator
        });

        for record in candidates {
            let Some(period) = record.period else {
                continue;
            };
            if period == target {
                exact = Some(record);
            } else if period < target {
                match prior {
                    Some((best, _)) if period < best => {}
                    _ => prior = Some((period, record)),
                }
            }
        }

        if let Some(record) = exact {
            return Some(Resolved {
                record,
                period: target,
                exact: true,
            });
        }

        prior.map(|(period, record)| {
            trace!(
                target: "app::performance",
                team,
                indicator,
                requested = %target,
                resolved = %period,
                "falling back to prior period"
            );
            Resolved {
                record,
                period,
                exact: false,
            }
        })
    }
}
