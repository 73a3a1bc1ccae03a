use std::collections::HashMap;

use tracing::trace;

use crate::models::settings::{ReportingConfig, TeamTargets};

/// Result of mapping one key-result team name onto the KPI taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedTeams {
    /// The team takes no part in aggregation.
    Excluded,
    /// One or more KPI teams; each receives the full contribution.
    Teams(Vec<String>),
}

impl MappedTeams {
    pub fn teams(&self) -> &[String] {
        match self {
            MappedTeams::Excluded => &[],
            MappedTeams::Teams(teams) => teams,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, MappedTeams::Excluded)
    }
}

/// Reconciles key-result team names with KPI team names.
#[derive(Debug, Clone, Default)]
pub struct TeamTaxonomy {
    table: HashMap<String, Option<Vec<String>>>,
    excluded_team: Option<String>,
}

impl TeamTaxonomy {
    pub fn new(
        table: impl IntoIterator<Item = (String, Option<TeamTargets>)>,
        excluded_team: Option<String>,
    ) -> Self {
        let excluded_team = excluded_team
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let table = table
            .into_iter()
            .map(|(source, targets)| {
                let targets = targets.map(|targets| {
                    targets
                        .names()
                        .into_iter()
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty())
                        .collect()
                });
                (source.trim().to_string(), targets)
            })
            .collect();
        Self {
            table,
            excluded_team,
        }
    }

    pub fn from_config(config: &ReportingConfig) -> Self {
        Self::new(config.team_mapping.clone(), config.excluded_team.clone())
    }

    pub fn excluded_team(&self) -> Option<&str> {
        self.excluded_team.as_deref()
    }

    pub fn is_excluded(&self, team: &str) -> bool {
        self.excluded_team
            .as_deref()
            .map(|excluded| excluded == team.trim())
            .unwrap_or(false)
    }

    pub fn map_team(&self, key_result_team: &str) -> MappedTeams {
        let name = key_result_team.trim();
        if name.is_empty() || self.is_excluded(name) {
            return MappedTeams::Excluded;
        }

        let targets: Vec<String> = match self.table.get(name) {
            Some(None) => return MappedTeams::Excluded,
            Some(Some(targets)) => targets
                .iter()
                .filter(|target| !self.is_excluded(target))
                .cloned()
                .collect(),
            None => vec![name.to_string()],
        };

        if targets.is_empty() {
            trace!(target: "app::taxonomy", team = name, "mapping left no eligible team");
            return MappedTeams::Excluded;
        }
        if targets.len() > 1 {
            trace!(target: "app::taxonomy", team = name, targets = ?targets, "fan-out mapping");
        }
        MappedTeams::Teams(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> TeamTaxonomy {
        TeamTaxonomy::new(
            vec![
                ("Comercial".to_string(), Some(TeamTargets::One("Vendas".into()))),
                (
                    "Marketing Digital".to_string(),
                    Some(TeamTargets::Many(vec!["Marketing".into(), " Growth ".into()])),
                ),
                ("Jurídico".to_string(), None),
                (
                    "Institucional".to_string(),
                    Some(TeamTargets::Many(vec!["Diretoria".into(), "Expansão".into()])),
                ),
                ("Diretoria".to_string(), Some(TeamTargets::One("Vendas".into()))),
            ],
            Some("Diretoria".into()),
        )
    }

    #[test]
    fn table_entries_map_single_and_fan_out_targets() {
        let taxonomy = taxonomy();
        assert_eq!(
            taxonomy.map_team("Comercial"),
            MappedTeams::Teams(vec!["Vendas".into()])
        );
        assert_eq!(
            taxonomy.map_team(" Marketing Digital "),
            MappedTeams::Teams(vec!["Marketing".into(), "Growth".into()])
        );
    }

    #[test]
    fn unknown_teams_pass_through_and_null_entries_exclude() {
        let taxonomy = taxonomy();
        assert_eq!(
            taxonomy.map_team("Operações"),
            MappedTeams::Teams(vec!["Operações".into()])
        );
        assert!(taxonomy.map_team("Jurídico").is_excluded());
        assert!(taxonomy.map_team("").is_excluded());
    }

    #[test]
    fn excluded_team_is_skipped_regardless_of_table() {
        let taxonomy = taxonomy();
        assert!(taxonomy.map_team("Diretoria").is_excluded());
        assert_eq!(
            taxonomy.map_team("Institucional"),
            MappedTeams::Teams(vec!["Expansão".into()])
        );
    }
}
