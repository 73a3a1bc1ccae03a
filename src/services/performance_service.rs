use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::models::key_result::KeyResultRecord;
use crate::models::kpi::KpiRecord;
use crate::models::performance::{AnnualAggregate, IndicatorResolution, TeamPerformanceSummary};
use crate::models::period::Period;
use crate::models::settings::ReportingConfig;
use crate::services::key_result_dedup::{deduplicate_key_results, TeamContributions};
use crate::services::team_taxonomy::TeamTaxonomy;
use crate::services::temporal_resolver::TemporalResolver;

/// Per-team ranking and annual roll-ups over one normalized snapshot.
#[derive(Debug, Clone, Default)]
pub struct PerformanceService {
    taxonomy: TeamTaxonomy,
}

impl PerformanceService {
    pub fn new(taxonomy: TeamTaxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn from_config(config: &ReportingConfig) -> Self {
        Self::new(TeamTaxonomy::from_config(config))
    }

    pub fn taxonomy(&self) -> &TeamTaxonomy {
        &self.taxonomy
    }

    pub fn compute_team_performance(
        &self,
        kpi_records: &[KpiRecord],
        key_result_records: &[KeyResultRecord],
        period: Period,
    ) -> Vec<TeamPerformanceSummary> {
        let kpi = kpi_contributions(kpi_records, period, &self.taxonomy);
        let key_results = deduplicate_key_results(key_result_records, period, &self.taxonomy);

        let mut summaries = aggregate(kpi, key_results);
        summaries.retain(|summary| !self.taxonomy.is_excluded(&summary.team));

        debug!(
            target: "app::performance",
            period = %period,
            teams = summaries.len(),
            "team performance computed"
        );
        summaries
    }

    pub fn team_indicators(
        &self,
        kpi_records: &[KpiRecord],
        team: &str,
        period: Period,
    ) -> Vec<IndicatorResolution> {
        if self.taxonomy.is_excluded(team) {
            return Vec::new();
        }
        TemporalResolver::new(kpi_records).resolve_team_indicators(team.trim(), period)
    }
}

/// KPI attainments usable for ranking at exactly `period`.
///
/// Every team with a finalized record in the period is listed, but only
/// measured attainments strictly above zero are contributed.
pub fn kpi_contributions(
    records: &[KpiRecord],
    period: Period,
    taxonomy: &TeamTaxonomy,
) -> Vec<TeamContributions> {
    let mut contributions: Vec<TeamContributions> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    let eligible = records.iter().filter(|record| {
        record.is_finalized()
            && record.period == Some(period)
            && !taxonomy.is_excluded(&record.team)
    });

    for record in eligible {
        let slot = *index.entry(record.team.as_str()).or_insert_with(|| {
            contributions.push(TeamContributions {
                team: record.team.clone(),
                values: Vec::new(),
            });
            contributions.len() - 1
        });
        if let Some(value) = record.attainment_ratio.filter(|value| *value > 0.0) {
            contributions[slot].values.push(value);
        }
    }

    contributions
}

/// Merges both contribution sets into ranked summaries.
///
/// The overall mean is taken over the union of values, not over the two
/// per-source means. Teams keep KPI-first encounter order before the stable
/// descending sort.
pub fn aggregate(
    kpi_contributions: Vec<TeamContributions>,
    key_result_contributions: Vec<TeamContributions>,
) -> Vec<TeamPerformanceSummary> {
    let mut teams: Vec<(String, Vec<f64>, Vec<f64>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for contribution in kpi_contributions {
        let slot = team_slot(&mut teams, &mut index, &contribution.team);
        teams[slot].1.extend(contribution.values);
    }
    for contribution in key_result_contributions {
        let slot = team_slot(&mut teams, &mut index, &contribution.team);
        teams[slot].2.extend(contribution.values);
    }

    let summaries = teams
        .into_iter()
        .map(|(team, kpi, key_results)| {
            let union: Vec<f64> = kpi.iter().chain(key_results.iter()).copied().collect();
            TeamPerformanceSummary {
                team,
                mean_kpi_attainment: mean(&kpi),
                mean_key_result_attainment: mean(&key_results),
                mean_overall_attainment: mean(&union).unwrap_or(0.0),
                indicator_count: union.len(),
            }
        })
        .collect();

    rank(summaries)
}

/// Stable sort, highest overall attainment first.
pub fn rank(mut summaries: Vec<TeamPerformanceSummary>) -> Vec<TeamPerformanceSummary> {
    summaries.sort_by(|left, right| {
        right
            .mean_overall_attainment
            .partial_cmp(&left.mean_overall_attainment)
            .unwrap_or(Ordering::Equal)
    });
    summaries
}

/// Yearly target/result totals for one indicator.
///
/// Targets are summed for every record of the indicator; results only for
/// finalized records.
pub fn compute_annual_aggregate(
    records: &[KpiRecord],
    indicator_name: &str,
) -> BTreeMap<i32, AnnualAggregate> {
    let indicator_name = indicator_name.trim();
    let mut totals: BTreeMap<i32, AnnualAggregate> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|record| record.indicator_name == indicator_name)
    {
        let Some(year) = record.year else {
            continue;
        };
        let entry = totals
            .entry(year)
            .or_insert_with(|| AnnualAggregate::empty(year));
        entry.target_sum += record.target_value;
        if record.is_finalized() {
            entry.result_sum += record.result_value;
        }
    }

    totals
        .into_iter()
        .map(|(year, aggregate)| (year, aggregate.finish()))
        .collect()
}

fn team_slot(
    teams: &mut Vec<(String, Vec<f64>, Vec<f64>)>,
    index: &mut HashMap<String, usize>,
    team: &str,
) -> usize {
    *index.entry(team.to_string()).or_insert_with(|| {
        teams.push((team.to_string(), Vec::new(), Vec::new()));
        teams.len() - 1
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
