//! Collapses repeated key-result observations within a reporting quarter.
//!
//! A `0` in the latest month usually means the sheet was not updated yet, so
//! the representative value is the most recent *informative* observation in
//! the quarter-to-date window.

use std::collections::HashMap;

use tracing::debug;

use crate::models::key_result::KeyResultRecord;
use crate::models::period::Period;
use crate::services::team_taxonomy::TeamTaxonomy;

/// Normalized key-result attainments (fractions) for one KPI team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamContributions {
    pub team: String,
    pub values: Vec<f64>,
}

struct KeyGroup<'a> {
    team: String,
    unique_key: &'a str,
    observations: Vec<&'a KeyResultRecord>,
}

/// One contribution per (mapped team, key result) for `period`, teams in
/// first-encounter order.
pub fn deduplicate_key_results(
    records: &[KeyResultRecord],
    period: Period,
    taxonomy: &TeamTaxonomy,
) -> Vec<TeamContributions> {
    let mut groups: Vec<KeyGroup<'_>> = Vec::new();
    let mut group_index: HashMap<(String, &str), usize> = HashMap::new();

    let in_window = records
        .iter()
        .filter(|record| period.quarter_to_date_contains(record.date));

    for record in in_window {
        let mapped = taxonomy.map_team(&record.team);
        for team in mapped.teams() {
            let key = (team.clone(), record.unique_key.as_str());
            let slot = *group_index.entry(key).or_insert_with(|| {
                groups.push(KeyGroup {
                    team: team.clone(),
                    unique_key: record.unique_key.as_str(),
                    observations: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].observations.push(record);
        }
    }

    let mut contributions: Vec<TeamContributions> = Vec::new();
    let mut team_index: HashMap<String, usize> = HashMap::new();

    for mut group in groups {
        group
            .observations
            .sort_by(|left, right| right.date.cmp(&left.date));
        let value = representative_percent(&group.observations);
        if group.observations.first().map(|latest| latest.attainment_percent) == Some(0.0)
            && value != 0.0
        {
            debug!(
                target: "app::dedup",
                team = %group.team,
                key = group.unique_key,
                value,
                "latest observation is zero; using most recent informative value"
            );
        }

        let slot = *team_index.entry(group.team.clone()).or_insert_with(|| {
            contributions.push(TeamContributions {
                team: group.team.clone(),
                values: Vec::new(),
            });
            contributions.len() - 1
        });
        contributions[slot].values.push(value / 100.0);
    }

    contributions
}

/// `observations` must be sorted most recent first.
pub fn representative_percent(observations: &[&KeyResultRecord]) -> f64 {
    let Some(latest) = observations.first() else {
        return 0.0;
    };
    if latest.attainment_percent != 0.0 {
        return latest.attainment_percent;
    }
    observations
        .iter()
        .map(|record| record.attainment_percent)
        .find(|value| *value > 0.0)
        .unwrap_or(0.0)
}
