// End-to-end reporting flow over in-memory and file-backed row sources

use std::fs;

use franchise_metrics::models::period::Period;
use franchise_metrics::models::settings::ReportingConfig;
use franchise_metrics::models::snapshot::RawTable;
use franchise_metrics::services::reporting_service::ReportingService;
use franchise_metrics::services::row_source::{JsonFileRowSource, RowSource, StaticRowSource};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn kpi_rows(period: &str, attainment: &str) -> RawTable {
    vec![
        vec![
            json!("Período"),
            json!("Organização"),
            json!("Equipe"),
            json!("Indicador"),
            json!("Meta"),
            json!("Realizado"),
            json!("Atingimento"),
            json!("Status"),
            json!("Tipo"),
            json!("Data"),
        ],
        vec![
            json!(period),
            json!("Franqueadora"),
            json!("Vendas"),
            json!("Receita"),
            json!("R$ 1.000,00"),
            json!("R$ 800,00"),
            json!(attainment),
            json!("Finalizado"),
            json!("Moeda"),
            json!("2024"),
        ],
    ]
}

fn key_result_rows() -> RawTable {
    vec![
        vec![
            json!("Data"),
            json!("Equipe"),
            json!("Chave"),
            json!("Objetivo"),
            json!("Resultado-Chave"),
            json!("Atingimento"),
        ],
        vec![
            json!("05/04/2024"),
            json!("Vendas"),
            json!("KR-1"),
            json!("Crescer"),
            json!("Contratos"),
            json!("70%"),
        ],
        vec![
            json!("20/03/2024"),
            json!("Suporte"),
            json!("KR-2"),
            json!("Qualidade"),
            json!("NPS"),
            json!("90%"),
        ],
    ]
}

/// Forwards to a shared static source so the test can swap tables.
struct SharedSource(Arc<StaticRowSource>);

impl RowSource for SharedSource {
    fn name(&self) -> &str {
        "shared"
    }

    fn fetch_kpi_rows(&self) -> franchise_metrics::AppResult<RawTable> {
        self.0.fetch_kpi_rows()
    }

    fn fetch_key_result_rows(&self) -> franchise_metrics::AppResult<RawTable> {
        self.0.fetch_key_result_rows()
    }
}

#[test]
fn test_team_performance_from_static_source() {
    let source = StaticRowSource::new(kpi_rows("04/2024", "80%"), key_result_rows());
    let service =
        ReportingService::new(&ReportingConfig::default(), Box::new(source)).expect("service");

    let periods = service.available_periods().expect("periods");
    assert_eq!(
        periods,
        vec![Period::new(2024, 4).unwrap(), Period::new(2024, 3).unwrap()]
    );

    let summaries = service.team_performance("04/2024").expect("performance");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].team, "Vendas");
    assert!((summaries[0].mean_overall_attainment - 0.75).abs() < 1e-9);
    assert_eq!(summaries[0].indicator_count, 2);

    let march = service.team_performance("2024-03").expect("performance");
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].team, "Suporte");
}

#[test]
fn test_cached_snapshot_until_refresh() {
    let shared = Arc::new(StaticRowSource::new(kpi_rows("04/2024", "80%"), key_result_rows()));
    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(SharedSource(Arc::clone(&shared))),
    )
    .expect("service");

    let before = service.team_performance("04/2024").expect("performance");
    shared
        .replace(kpi_rows("04/2024", "100%"), key_result_rows())
        .expect("replace");

    let cached = service.team_performance("04/2024").expect("performance");
    assert_eq!(before, cached);

    service.refresh().expect("refresh");
    let fresh = service.team_performance("04/2024").expect("performance");
    assert!((fresh[0].mean_overall_attainment - 0.85).abs() < 1e-9);

    shared
        .replace(kpi_rows("04/2024", "60%"), key_result_rows())
        .expect("replace");
    service.invalidate();
    let after_invalidate = service.team_performance("04/2024").expect("performance");
    assert!((after_invalidate[0].mean_overall_attainment - 0.65).abs() < 1e-9);
}

#[test]
fn test_indicators_and_annual_aggregate() {
    let source = StaticRowSource::new(kpi_rows("02/2024", "80%"), key_result_rows());
    let service =
        ReportingService::new(&ReportingConfig::default(), Box::new(source)).expect("service");

    let indicators = service.team_indicators("Vendas", "04/2024").expect("indicators");
    assert_eq!(indicators.len(), 1);
    assert_eq!(indicators[0].value, Some(0.8));
    assert_eq!(indicators[0].source_period, Period::new(2024, 2));
    assert!(indicators[0].is_fallback);

    let totals = service.annual_aggregate("Receita").expect("aggregate");
    assert_eq!(totals[&2024].target_sum, 1000.0);
    assert_eq!(totals[&2024].result_sum, 800.0);
    assert_eq!(totals[&2024].ratio, 0.8);
}

#[test]
fn test_json_file_source_with_yaml_config() {
    let dir = tempdir().expect("temp dir");
    let kpi_path = dir.path().join("kpi.json");
    let kr_path = dir.path().join("okr.json");
    let config_path = dir.path().join("reporting.yaml");

    fs::write(&kpi_path, serde_json::to_string(&kpi_rows("04/2024", "80%")).unwrap()).unwrap();
    fs::write(&kr_path, serde_json::to_string(&key_result_rows()).unwrap()).unwrap();
    fs::write(
        &config_path,
        r#"
excluded_team: Diretoria
team_mapping:
  Suporte: Vendas
snapshot_ttl_seconds: 60
"#,
    )
    .unwrap();

    let config = ReportingConfig::load(&config_path).expect("config");
    let service = ReportingService::new(&config, Box::new(JsonFileRowSource::new(&kpi_path, &kr_path)))
        .expect("service");

    let march = service.team_performance("03/2024").expect("performance");
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].team, "Vendas");
    assert!((march[0].mean_overall_attainment - 0.9).abs() < 1e-9);
}
